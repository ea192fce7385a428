//! Type-safe cache key builder with versioning

use crate::core::constants::CACHE_KEY_VERSION;

/// Type-safe cache key builder
///
/// All keys are prefixed with a version (e.g., "v1:") to allow
/// invalidating all cached data on schema changes.
///
/// Presence and typing keys are not built here: those are raw, unversioned
/// keys defined alongside their TTL constants in `core::constants` and used
/// directly by the connection manager and session handler.
pub struct CacheKey;

impl CacheKey {
    // =========================================================================
    // Users
    // =========================================================================

    /// Cache key for user by ID
    pub fn user(id: &str) -> String {
        format!("{}:user:{}", CACHE_KEY_VERSION, id)
    }

    /// Cache key for negative user lookup by ID (not found)
    pub fn user_negative(id: &str) -> String {
        format!("{}:user:neg:{}", CACHE_KEY_VERSION, id)
    }

    // =========================================================================
    // Channels
    // =========================================================================

    /// Cache key for channel by ID
    pub fn channel(id: &str) -> String {
        format!("{}:channel:{}", CACHE_KEY_VERSION, id)
    }

    /// Cache key for negative channel lookup by ID (not found)
    pub fn channel_negative(id: &str) -> String {
        format!("{}:channel:neg:{}", CACHE_KEY_VERSION, id)
    }

    // =========================================================================
    // Channel membership
    // =========================================================================

    /// Cache key for a user's membership role in a channel (used by the
    /// membership-gating check on `channel.subscribe`/`message.send`).
    pub fn channel_member(channel_id: &str, user_id: &str) -> String {
        format!(
            "{}:member:{}:{}",
            CACHE_KEY_VERSION, channel_id, user_id
        )
    }

    /// Cache key for negative channel-membership lookup (not a member)
    pub fn channel_member_negative(channel_id: &str, user_id: &str) -> String {
        format!(
            "{}:member:neg:{}:{}",
            CACHE_KEY_VERSION, channel_id, user_id
        )
    }

    // =========================================================================
    // Session tokens
    // =========================================================================

    /// Cache key for a session token's revocation record by `jti`
    pub fn session_token(jti: &str) -> String {
        format!("{}:session_token:{}", CACHE_KEY_VERSION, jti)
    }

    // =========================================================================
    // Rate Limiting
    // =========================================================================

    /// Cache key for rate limit counter
    ///
    /// Note: Rate limit keys are NOT versioned (counter semantics don't change)
    ///
    /// The identifier is used directly without escaping. Callers should ensure
    /// identifiers don't contain characters that could cause key collisions
    /// (e.g., bucket names shouldn't contain `:` and identifiers are typically
    /// IP addresses or user IDs which are safe).
    pub fn rate_limit(bucket: &str, identifier: &str) -> String {
        format!("rl:{}:{}", bucket, identifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_keys() {
        assert_eq!(CacheKey::user("u123"), "v1:user:u123");
        assert_eq!(CacheKey::user_negative("u123"), "v1:user:neg:u123");
    }

    #[test]
    fn test_channel_keys() {
        assert_eq!(CacheKey::channel("c1"), "v1:channel:c1");
        assert_eq!(CacheKey::channel_negative("c1"), "v1:channel:neg:c1");
    }

    #[test]
    fn test_channel_member_keys() {
        assert_eq!(
            CacheKey::channel_member("c1", "u1"),
            "v1:member:c1:u1"
        );
        assert_eq!(
            CacheKey::channel_member_negative("c1", "u1"),
            "v1:member:neg:c1:u1"
        );
    }

    #[test]
    fn test_session_token_key() {
        assert_eq!(
            CacheKey::session_token("jti-abc"),
            "v1:session_token:jti-abc"
        );
    }

    #[test]
    fn test_rate_limit_key() {
        // Rate limit keys are NOT versioned
        assert_eq!(
            CacheKey::rate_limit("api", "192.168.1.1"),
            "rl:api:192.168.1.1"
        );
    }
}
