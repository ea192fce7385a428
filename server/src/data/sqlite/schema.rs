//! SQLite schema definitions
//!
//! Initial schema with all tables. No migrations needed for first version.

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Complete schema SQL
pub const SCHEMA: &str = r#"
-- =============================================================================
-- Infrastructure: Schema version tracking
-- =============================================================================
CREATE TABLE IF NOT EXISTS schema_version (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    version INTEGER NOT NULL,
    applied_at INTEGER NOT NULL,
    description TEXT
);

CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at INTEGER NOT NULL,
    checksum TEXT NOT NULL,
    execution_time_ms INTEGER,
    success INTEGER NOT NULL DEFAULT 1
);

-- =============================================================================
-- 1. Users
--
-- Identity is established upstream by the token issuer; a row here is
-- created lazily on first sight of a validated token so messages can join
-- back to a display name without re-deriving it from claims on every read.
-- =============================================================================
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    username TEXT NOT NULL CHECK(length(username) >= 1 AND length(username) <= 100),
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

-- =============================================================================
-- 2. Channels
-- =============================================================================
CREATE TABLE IF NOT EXISTS channels (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL CHECK(length(name) >= 1 AND length(name) <= 100),
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

-- =============================================================================
-- 3. Channel Members (references channels + users)
-- =============================================================================
CREATE TABLE IF NOT EXISTS channel_members (
    channel_id TEXT NOT NULL REFERENCES channels(id) ON DELETE CASCADE,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    role TEXT NOT NULL DEFAULT 'member' CHECK(role IN ('member', 'admin', 'owner')),
    created_at INTEGER NOT NULL,
    PRIMARY KEY (channel_id, user_id)
);

CREATE INDEX IF NOT EXISTS idx_channel_members_user ON channel_members(user_id);
CREATE INDEX IF NOT EXISTS idx_channel_members_role ON channel_members(channel_id, role);

-- =============================================================================
-- 4. Messages (references channels + users)
-- =============================================================================
CREATE TABLE IF NOT EXISTS messages (
    id TEXT PRIMARY KEY,
    channel_id TEXT NOT NULL REFERENCES channels(id) ON DELETE CASCADE,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    content TEXT NOT NULL,
    message_type TEXT NOT NULL DEFAULT 'text' CHECK(message_type IN ('text', 'image', 'file', 'system')),
    metadata TEXT,
    is_edited INTEGER NOT NULL DEFAULT 0,
    is_deleted INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

-- Reconnection/catch-up history is a REST concern served against this same
-- table, hence the descending cursor index on (channel_id, created_at).
CREATE INDEX IF NOT EXISTS idx_messages_channel_created ON messages(channel_id, created_at DESC);
CREATE INDEX IF NOT EXISTS idx_messages_user ON messages(user_id);

-- =============================================================================
-- 5. Message metrics (global, one row per window)
-- =============================================================================
CREATE TABLE IF NOT EXISTS message_metrics (
    window_start INTEGER PRIMARY KEY,
    messages_sent INTEGER NOT NULL DEFAULT 0,
    messages_edited INTEGER NOT NULL DEFAULT 0,
    messages_deleted INTEGER NOT NULL DEFAULT 0,
    messages_per_second REAL NOT NULL DEFAULT 0
);

-- =============================================================================
-- 6. Channel metrics (one row per channel per window)
-- =============================================================================
CREATE TABLE IF NOT EXISTS channel_metrics (
    channel_id TEXT NOT NULL,
    window_start INTEGER NOT NULL,
    message_count INTEGER NOT NULL DEFAULT 0,
    active_users INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (channel_id, window_start)
);

CREATE INDEX IF NOT EXISTS idx_channel_metrics_window ON channel_metrics(window_start);

-- =============================================================================
-- 7. User metrics (one row per user per window)
-- =============================================================================
CREATE TABLE IF NOT EXISTS user_metrics (
    user_id TEXT NOT NULL,
    window_start INTEGER NOT NULL,
    messages_sent INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (user_id, window_start)
);

CREATE INDEX IF NOT EXISTS idx_user_metrics_window ON user_metrics(window_start);

-- =============================================================================
-- 8. Session tokens
--
-- Issuance happens upstream; this crate only reads this table, to reject a
-- token whose jti was revoked before its natural expiry.
-- =============================================================================
CREATE TABLE IF NOT EXISTS session_tokens (
    jti TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    expires_at INTEGER NOT NULL,
    revoked_at INTEGER,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_session_tokens_user ON session_tokens(user_id);

-- =============================================================================
-- Default Data (inserted in dependency order)
-- =============================================================================

-- 1. Default user
INSERT OR IGNORE INTO users (id, username, created_at, updated_at)
VALUES ('local', 'local', strftime('%s', 'now'), strftime('%s', 'now'));

-- 2. Default channel
INSERT OR IGNORE INTO channels (id, name, created_at, updated_at)
VALUES ('general', 'general', strftime('%s', 'now'), strftime('%s', 'now'));

-- 3. Default membership (local user owns the default channel)
INSERT OR IGNORE INTO channel_members (channel_id, user_id, role, created_at)
VALUES ('general', 'local', 'owner', strftime('%s', 'now'));
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[allow(clippy::assertions_on_constants)]
    fn test_schema_version_is_positive() {
        assert!(SCHEMA_VERSION > 0);
    }

    #[test]
    #[allow(clippy::const_is_empty)]
    fn test_schema_is_not_empty() {
        assert!(!SCHEMA.is_empty());
    }

    #[test]
    fn test_schema_contains_required_tables() {
        let required_tables = [
            "schema_version",
            "schema_migrations",
            "users",
            "channels",
            "channel_members",
            "messages",
            "message_metrics",
            "channel_metrics",
            "user_metrics",
            "session_tokens",
        ];

        for table in required_tables {
            assert!(
                SCHEMA.contains(&format!("CREATE TABLE IF NOT EXISTS {}", table)),
                "Schema missing table: {}",
                table
            );
        }
    }

    #[test]
    fn test_schema_contains_default_data() {
        assert!(
            SCHEMA.contains("INSERT OR IGNORE INTO users"),
            "Schema missing default user"
        );
        assert!(
            SCHEMA.contains("INSERT OR IGNORE INTO channels"),
            "Schema missing default channel"
        );
        assert!(
            SCHEMA.contains("INSERT OR IGNORE INTO channel_members"),
            "Schema missing default membership"
        );
    }
}
