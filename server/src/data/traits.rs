//! Repository trait for database backends
//!
//! This module defines the trait that provides a unified interface for
//! durable-store operations across multiple backends. Each backend (SQLite,
//! PostgreSQL) implements this trait with its own specific logic.

use async_trait::async_trait;

use crate::data::cache::CacheService;
use crate::data::error::DataError;
use crate::data::types::{
    ChannelMemberRow, ChannelMetricsRow, ChannelRow, MessageMetricsRow, MessageRow,
    SessionTokenRow, UserMetricsRow, UserRow,
};

// ============================================================================
// Transactional Repository Trait
// ============================================================================

/// Repository trait for the durable transactional store: users, channels,
/// channel membership, messages, the metrics rollups the aggregator flushes,
/// and issued session tokens.
///
/// Implemented by the SQLite and PostgreSQL backends.
#[async_trait]
pub trait TransactionalRepository: Send + Sync {
    // ==================== User Operations ====================

    /// Create a user row on first sight of a validated token, or return the
    /// existing row unchanged if one already exists for this id.
    async fn create_user(
        &self,
        cache: Option<&CacheService>,
        id: &str,
        username: &str,
    ) -> Result<UserRow, DataError>;

    /// Get a user by ID
    async fn get_user(
        &self,
        cache: Option<&CacheService>,
        id: &str,
    ) -> Result<Option<UserRow>, DataError>;

    // ==================== Channel Operations ====================

    /// Create a channel, or return the existing row unchanged if one already
    /// exists for this id.
    async fn create_channel(
        &self,
        cache: Option<&CacheService>,
        id: &str,
        name: &str,
    ) -> Result<ChannelRow, DataError>;

    /// Get a channel by ID
    async fn get_channel(
        &self,
        cache: Option<&CacheService>,
        id: &str,
    ) -> Result<Option<ChannelRow>, DataError>;

    // ==================== Channel Membership Operations ====================

    /// Get a user's membership role in a channel, if any.
    async fn get_channel_member(
        &self,
        cache: Option<&CacheService>,
        channel_id: &str,
        user_id: &str,
    ) -> Result<Option<ChannelMemberRow>, DataError>;

    /// Add (or update the role of) a channel member.
    async fn add_channel_member(
        &self,
        cache: Option<&CacheService>,
        channel_id: &str,
        user_id: &str,
        role: &str,
    ) -> Result<ChannelMemberRow, DataError>;

    /// Remove a channel member.
    async fn remove_channel_member(
        &self,
        cache: Option<&CacheService>,
        channel_id: &str,
        user_id: &str,
    ) -> Result<bool, DataError>;

    /// List all members of a channel.
    async fn list_channel_members(
        &self,
        channel_id: &str,
    ) -> Result<Vec<ChannelMemberRow>, DataError>;

    // ==================== Message Operations ====================

    /// Insert a newly sent message.
    #[allow(clippy::too_many_arguments)]
    async fn insert_message(
        &self,
        id: &str,
        channel_id: &str,
        user_id: &str,
        content: &str,
        message_type: &str,
        metadata: Option<&str>,
    ) -> Result<MessageRow, DataError>;

    /// Get a message by ID.
    async fn get_message(&self, id: &str) -> Result<Option<MessageRow>, DataError>;

    /// Edit a message's content. Returns `None` if the message does not
    /// exist or `user_id` is not its author.
    async fn edit_message(
        &self,
        id: &str,
        user_id: &str,
        content: &str,
    ) -> Result<Option<MessageRow>, DataError>;

    /// Soft-delete a message (content is retained, `is_deleted` is set).
    /// Returns `false` if the message does not exist or `user_id` is not its
    /// author.
    async fn soft_delete_message(&self, id: &str, user_id: &str) -> Result<bool, DataError>;

    /// List messages for a channel, most recent first, paginated by an
    /// exclusive `created_at` cursor. Kept REST-queryable (indexed) even
    /// though this crate serves no history endpoint of its own.
    async fn list_messages_for_channel(
        &self,
        channel_id: &str,
        before: Option<i64>,
        limit: u32,
    ) -> Result<Vec<MessageRow>, DataError>;

    // ==================== Metrics Operations ====================

    /// Flush one window's worth of global message metrics.
    async fn insert_message_metrics(&self, row: MessageMetricsRow) -> Result<(), DataError>;

    /// Flush one window's worth of per-channel metrics.
    async fn insert_channel_metrics(&self, row: ChannelMetricsRow) -> Result<(), DataError>;

    /// Flush one window's worth of per-user metrics.
    async fn insert_user_metrics(&self, row: UserMetricsRow) -> Result<(), DataError>;

    // ==================== Session Token Operations ====================

    /// Look up an issued token's revocation record by `jti`. Absence means
    /// the token was never recorded as issued (and so is neither revoked
    /// nor trusted beyond signature/expiry checks already performed).
    async fn get_session_token(&self, jti: &str) -> Result<Option<SessionTokenRow>, DataError>;
}

// ============================================================================
// Helper function (not part of trait, but shared utility)
// ============================================================================

/// Check if user has minimum role level (pure function, same for all backends)
pub fn has_min_role_level(role: &str, min_role: &str) -> bool {
    // Role hierarchy: owner > admin > member
    let role_level = match role {
        "owner" => 3,
        "admin" => 2,
        "member" => 1,
        _ => 0,
    };
    let min_level = match min_role {
        "owner" => 3,
        "admin" => 2,
        "member" => 1,
        _ => 0,
    };
    role_level >= min_level
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_min_role_level_hierarchy() {
        assert!(has_min_role_level("owner", "admin"));
        assert!(has_min_role_level("admin", "member"));
        assert!(!has_min_role_level("member", "admin"));
        assert!(has_min_role_level("member", "member"));
    }

    #[test]
    fn test_has_min_role_level_unknown_role() {
        assert!(!has_min_role_level("bogus", "member"));
    }
}
