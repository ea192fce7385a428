//! Session-scoped error type, mapped to WebSocket close codes at the edge.

use thiserror::Error;

/// Errors that end a session outright (as opposed to a recoverable `error`
/// frame, which the session handler sends directly without raising one of
/// these). See spec §12 for the kind-to-close-code mapping this mirrors.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Token missing, malformed, expired, or signature mismatch.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Anything unexpected: attach failure, a durable-store error on a path
    /// with no good recovery, a panic boundary caught by the caller.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SessionError {
    /// WebSocket close code for this error kind.
    pub fn close_code(&self) -> u16 {
        match self {
            Self::Auth(_) => 1008,
            Self::Internal(_) => 1011,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_codes() {
        assert_eq!(SessionError::Auth("bad token".into()).close_code(), 1008);
        assert_eq!(SessionError::Internal("boom".into()).close_code(), 1011);
    }
}
