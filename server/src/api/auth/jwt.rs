//! Bearer session token decoding
//!
//! Token issuance is an external collaborator's concern (see module docs on
//! `AuthManager`); this module only ever decodes and verifies tokens minted
//! upstream.

use std::fmt;

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

/// Bearer token validation error
#[derive(Debug)]
pub enum JwtError {
    /// Token signature has expired
    Expired,
    /// Token signature is invalid
    InvalidSignature,
    /// Malformed token, wrong algorithm, or missing claim
    Invalid(String),
}

impl fmt::Display for JwtError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Expired => write!(f, "session token has expired"),
            Self::InvalidSignature => write!(f, "invalid session token signature"),
            Self::Invalid(msg) => write!(f, "invalid session token: {}", msg),
        }
    }
}

impl std::error::Error for JwtError {}

/// Claims carried by a realtime session's bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub user_id: String,
    pub username: String,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

/// Decode and verify a bearer token carried in the `/ws?token=` query string.
///
/// Validates signature and expiry; any decode, signature, or type error
/// surfaces as a `JwtError` so the caller can close the upgrade with a
/// policy-violation code.
pub fn decode_session_token(token: &str, signing_key: &[u8]) -> Result<SessionClaims, JwtError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    validation.set_required_spec_claims(&["exp"]);

    decode::<SessionClaims>(token, &DecodingKey::from_secret(signing_key), &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
            jsonwebtoken::errors::ErrorKind::InvalidSignature => JwtError::InvalidSignature,
            _ => JwtError::Invalid(e.to_string()),
        })
}

#[cfg(test)]
pub(crate) fn encode_session_token(
    signing_key: &[u8],
    user_id: &str,
    username: &str,
    jti: &str,
    ttl_minutes: i64,
) -> String {
    use chrono::{Duration, Utc};
    use jsonwebtoken::{EncodingKey, Header, encode};

    let now = Utc::now();
    let claims = SessionClaims {
        user_id: user_id.to_string(),
        username: username.to_string(),
        jti: jti.to_string(),
        iat: now.timestamp(),
        exp: (now + Duration::minutes(ttl_minutes)).timestamp(),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )
    .expect("encoding a well-formed test token cannot fail")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> Vec<u8> {
        vec![7u8; 32]
    }

    #[test]
    fn test_decode_valid_token() {
        let key = test_key();
        let token = encode_session_token(&key, "u1", "alice", "jti-1", 60);
        let claims = decode_session_token(&token, &key).unwrap();
        assert_eq!(claims.user_id, "u1");
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.jti, "jti-1");
    }

    #[test]
    fn test_decode_rejects_wrong_key() {
        let token = encode_session_token(&test_key(), "u1", "alice", "jti-1", 60);
        let result = decode_session_token(&token, &vec![9u8; 32]);
        assert!(matches!(result, Err(JwtError::InvalidSignature)));
    }

    #[test]
    fn test_decode_rejects_expired_token() {
        let key = test_key();
        let token = encode_session_token(&key, "u1", "alice", "jti-1", -1);
        let result = decode_session_token(&token, &key);
        assert!(matches!(result, Err(JwtError::Expired)));
    }

    #[test]
    fn test_decode_rejects_malformed_token() {
        let result = decode_session_token("not-a-jwt", &test_key());
        assert!(matches!(result, Err(JwtError::Invalid(_))));
    }
}
