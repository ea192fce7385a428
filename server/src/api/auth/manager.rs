//! Authentication manager
//!
//! Validates bearer tokens carried on the realtime upgrade. Token issuance,
//! credential hashing, and the REST surface that would mint these tokens are
//! external collaborators' concern; this crate only ever verifies what it is
//! handed.

use anyhow::Result;

use super::jwt::{JwtError, SessionClaims, decode_session_token};
use crate::core::config::JwtConfig;
use crate::data::secrets::SecretManager;

/// Verifies session bearer tokens against the configured signing key.
#[derive(Debug)]
pub struct AuthManager {
    signing_key: Vec<u8>,
}

impl AuthManager {
    /// Resolve the signing key: an explicit `jwt.secret_key` config override
    /// takes precedence over the secret manager's stored/auto-generated key.
    pub async fn init(secrets: &SecretManager, jwt: &JwtConfig) -> Result<Self> {
        let signing_key = match &jwt.secret_key {
            Some(key) => key.clone().into_bytes(),
            None => secrets.get_jwt_signing_key().await?,
        };
        Ok(Self { signing_key })
    }

    /// Decode and verify a bearer token's signature, type, and expiry.
    pub fn validate_session(&self, token: &str) -> Result<SessionClaims, JwtError> {
        decode_session_token(token, &self.signing_key)
    }

    #[cfg(test)]
    pub(crate) fn signing_key(&self) -> &[u8] {
        &self.signing_key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::auth::jwt::encode_session_token;

    fn manager() -> AuthManager {
        AuthManager {
            signing_key: vec![3u8; 32],
        }
    }

    #[test]
    fn test_validate_session_round_trip() {
        let mgr = manager();
        let token = encode_session_token(mgr.signing_key(), "u1", "alice", "jti-1", 60);
        let claims = mgr.validate_session(&token).unwrap();
        assert_eq!(claims.user_id, "u1");
        assert_eq!(claims.username, "alice");
    }

    #[test]
    fn test_validate_session_rejects_bad_signature() {
        let mgr = manager();
        let token = encode_session_token(&vec![5u8; 32], "u1", "alice", "jti-1", 60);
        assert!(mgr.validate_session(&token).is_err());
    }
}
