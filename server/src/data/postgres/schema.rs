//! PostgreSQL schema definitions
//!
//! Initial schema with all tables. Compatible with SQLite schema structure.

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Complete schema SQL for PostgreSQL
pub const SCHEMA: &str = r#"
-- =============================================================================
-- Infrastructure: Schema version tracking
-- =============================================================================
CREATE TABLE IF NOT EXISTS schema_version (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    version INTEGER NOT NULL,
    applied_at BIGINT NOT NULL,
    description TEXT
);

CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at BIGINT NOT NULL,
    checksum TEXT NOT NULL,
    execution_time_ms INTEGER,
    success BOOLEAN NOT NULL DEFAULT TRUE
);

-- =============================================================================
-- 1. Users
-- =============================================================================
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    username TEXT NOT NULL CHECK(length(username) >= 1 AND length(username) <= 100),
    created_at BIGINT NOT NULL,
    updated_at BIGINT NOT NULL
);

-- =============================================================================
-- 2. Channels
-- =============================================================================
CREATE TABLE IF NOT EXISTS channels (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL CHECK(length(name) >= 1 AND length(name) <= 100),
    created_at BIGINT NOT NULL,
    updated_at BIGINT NOT NULL
);

-- =============================================================================
-- 3. Channel Members (references channels + users)
-- =============================================================================
CREATE TABLE IF NOT EXISTS channel_members (
    channel_id TEXT NOT NULL REFERENCES channels(id) ON DELETE CASCADE,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    role TEXT NOT NULL DEFAULT 'member' CHECK(role IN ('member', 'admin', 'owner')),
    created_at BIGINT NOT NULL,
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
    is_edited BOOLEAN NOT NULL DEFAULT FALSE,
    is_deleted BOOLEAN NOT NULL DEFAULT FALSE,
    created_at BIGINT NOT NULL,
    updated_at BIGINT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_messages_channel_created ON messages(channel_id, created_at DESC);
CREATE INDEX IF NOT EXISTS idx_messages_user ON messages(user_id);

-- =============================================================================
-- 5. Message metrics (global, one row per window)
-- =============================================================================
CREATE TABLE IF NOT EXISTS message_metrics (
    window_start BIGINT PRIMARY KEY,
    messages_sent BIGINT NOT NULL DEFAULT 0,
    messages_edited BIGINT NOT NULL DEFAULT 0,
    messages_deleted BIGINT NOT NULL DEFAULT 0,
    messages_per_second DOUBLE PRECISION NOT NULL DEFAULT 0
);

-- =============================================================================
-- 6. Channel metrics (one row per channel per window)
-- =============================================================================
CREATE TABLE IF NOT EXISTS channel_metrics (
    channel_id TEXT NOT NULL,
    window_start BIGINT NOT NULL,
    message_count BIGINT NOT NULL DEFAULT 0,
    active_users BIGINT NOT NULL DEFAULT 0,
    PRIMARY KEY (channel_id, window_start)
);

CREATE INDEX IF NOT EXISTS idx_channel_metrics_window ON channel_metrics(window_start);

-- =============================================================================
-- 7. User metrics (one row per user per window)
-- =============================================================================
CREATE TABLE IF NOT EXISTS user_metrics (
    user_id TEXT NOT NULL,
    window_start BIGINT NOT NULL,
    messages_sent BIGINT NOT NULL DEFAULT 0,
    PRIMARY KEY (user_id, window_start)
);

CREATE INDEX IF NOT EXISTS idx_user_metrics_window ON user_metrics(window_start);

-- =============================================================================
-- 8. Session tokens
-- =============================================================================
CREATE TABLE IF NOT EXISTS session_tokens (
    jti TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    expires_at BIGINT NOT NULL,
    revoked_at BIGINT,
    created_at BIGINT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_session_tokens_user ON session_tokens(user_id);
"#;

/// Default data SQL for PostgreSQL (inserted separately after schema)
pub const DEFAULT_DATA: &str = r#"
-- 1. Default user
INSERT INTO users (id, username, created_at, updated_at)
VALUES ('local', 'local', EXTRACT(EPOCH FROM NOW())::BIGINT, EXTRACT(EPOCH FROM NOW())::BIGINT)
ON CONFLICT (id) DO NOTHING;

-- 2. Default channel
INSERT INTO channels (id, name, created_at, updated_at)
VALUES ('general', 'general', EXTRACT(EPOCH FROM NOW())::BIGINT, EXTRACT(EPOCH FROM NOW())::BIGINT)
ON CONFLICT (id) DO NOTHING;

-- 3. Default membership (local user owns the default channel)
INSERT INTO channel_members (channel_id, user_id, role, created_at)
VALUES ('general', 'local', 'owner', EXTRACT(EPOCH FROM NOW())::BIGINT)
ON CONFLICT (channel_id, user_id) DO NOTHING;
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
    fn test_default_data_contains_required_inserts() {
        assert!(
            DEFAULT_DATA.contains("INSERT INTO users"),
            "Default data missing user"
        );
        assert!(
            DEFAULT_DATA.contains("INSERT INTO channels"),
            "Default data missing channel"
        );
        assert!(
            DEFAULT_DATA.contains("INSERT INTO channel_members"),
            "Default data missing membership"
        );
    }
}
