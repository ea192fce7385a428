//! Shared transactional row types for all database backends (SQLite, PostgreSQL)
//!
//! These types mirror the durable schema: users, channels, channel
//! membership, messages, and the per-window metrics rollups written by the
//! metrics aggregator.

use serde::{Deserialize, Serialize};

// ============================================================================
// User types
// ============================================================================

/// User row from database.
///
/// Identity itself is established upstream (the JWT carries `user_id` and
/// `username`); this row exists so messages can be joined back to a display
/// name without re-deriving it from claims on every read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRow {
    pub id: String,
    pub username: String,
    pub created_at: i64,
    pub updated_at: i64,
}

// ============================================================================
// Channel types
// ============================================================================

/// Channel row from database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelRow {
    pub id: String,
    pub name: String,
    pub created_at: i64,
    pub updated_at: i64,
}

// ============================================================================
// Channel membership types
// ============================================================================

/// Channel membership row, associating a user with a role in a channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelMemberRow {
    pub channel_id: String,
    pub user_id: String,
    pub role: String,
    pub created_at: i64,
}

// ============================================================================
// Message types
// ============================================================================

/// Message row from database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRow {
    pub id: String,
    pub channel_id: String,
    pub user_id: String,
    pub content: String,
    pub message_type: String,
    /// Opaque JSON blob (attachments, client metadata); not interpreted server-side.
    pub metadata: Option<String>,
    pub is_edited: bool,
    pub is_deleted: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

// ============================================================================
// Session token types
// ============================================================================

/// A record of an issued bearer token's `jti`, kept so validation can reject
/// a token that was revoked before its expiry. Issuance itself happens
/// upstream; this crate only ever reads this table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionTokenRow {
    pub jti: String,
    pub user_id: String,
    pub expires_at: i64,
    pub revoked_at: Option<i64>,
    pub created_at: i64,
}

// ============================================================================
// Metrics rollup types
// ============================================================================

/// One row per tumbling window, aggregating message lifecycle events
/// globally for that window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageMetricsRow {
    pub window_start: i64,
    pub messages_sent: i64,
    pub messages_edited: i64,
    pub messages_deleted: i64,
    /// `messages_sent` averaged over the window length, in messages/second.
    pub messages_per_second: f64,
}

/// One row per (channel, window), aggregating channel-level activity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelMetricsRow {
    pub channel_id: String,
    pub window_start: i64,
    pub message_count: i64,
    pub active_users: i64,
}

/// One row per (user, window), aggregating per-user activity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserMetricsRow {
    pub user_id: String,
    pub window_start: i64,
    pub messages_sent: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_row_roundtrip() {
        let row = MessageRow {
            id: "msg_1".to_string(),
            channel_id: "chan_1".to_string(),
            user_id: "user_1".to_string(),
            content: "hello".to_string(),
            message_type: "text".to_string(),
            metadata: None,
            is_edited: false,
            is_deleted: false,
            created_at: 1000,
            updated_at: 1000,
        };
        let json = serde_json::to_string(&row).unwrap();
        let back: MessageRow = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, row.id);
        assert_eq!(back.content, row.content);
    }

    #[test]
    fn test_channel_metrics_row_roundtrip() {
        let row = ChannelMetricsRow {
            channel_id: "chan_1".to_string(),
            window_start: 60,
            message_count: 10,
            active_users: 3,
        };
        let json = serde_json::to_string(&row).unwrap();
        let back: ChannelMetricsRow = serde_json::from_str(&json).unwrap();
        assert_eq!(back.message_count, 10);
        assert_eq!(back.active_users, 3);
    }
}
