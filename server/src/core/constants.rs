// =============================================================================
// Application Identity
// =============================================================================

/// Application name in title case (for display and platform directories)
pub const APP_NAME: &str = "SideSeat";

/// Application name in lowercase (for paths and identifiers)
pub const APP_NAME_LOWER: &str = "sideseat";

/// Unix-style dotfile folder name
pub const APP_DOT_FOLDER: &str = ".sideseat";

// =============================================================================
// Configuration Files
// =============================================================================

/// Config file name
pub const CONFIG_FILE_NAME: &str = "sideseat.json";

/// Environment variable for config file path
pub const ENV_CONFIG: &str = "SIDESEAT_CONFIG";

// =============================================================================
// Environment Variables - Debug
// =============================================================================

/// Environment variable for debug mode
pub const ENV_DEBUG: &str = "SIDESEAT_DEBUG";

// =============================================================================
// Environment Variables - Server
// =============================================================================

/// Environment variable for server host
pub const ENV_HOST: &str = "SIDESEAT_HOST";

/// Environment variable for server port
pub const ENV_PORT: &str = "SIDESEAT_PORT";

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "SIDESEAT_LOG";

// =============================================================================
// Server Defaults
// =============================================================================

/// Default server host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default server port
pub const DEFAULT_PORT: u16 = 5388;

// =============================================================================
// Environment Variables - Storage
// =============================================================================

/// Environment variable to override data directory
pub const ENV_DATA_DIR: &str = "SIDESEAT_DATA_DIR";

// =============================================================================
// Environment Variables - Secrets
// =============================================================================

/// Environment variable to force specific secrets backend
pub const ENV_SECRETS_BACKEND: &str = "SIDESEAT_SECRETS_BACKEND";

/// Service name for keychain/credential manager entries
pub const SECRET_SERVICE_NAME: &str = "sideseat";

/// Secret key name for JWT signing key (only used when `JwtConfig::secret_key` is unset)
pub const SECRET_KEY_JWT_SIGNING: &str = "jwt_signing_key";

pub const ENV_SECRETS_ENV_PREFIX: &str = "SIDESEAT_SECRETS_ENV_PREFIX";
pub const SECRETS_DEFAULT_ENV_PREFIX: &str = "SIDESEAT_SECRET_";

// =============================================================================
// Authentication / JWT
// =============================================================================

/// Environment variable for the JWT signing secret
pub const ENV_JWT_SECRET_KEY: &str = "SIDESEAT_JWT_SECRET_KEY";

/// Environment variable for the JWT algorithm (HS256 only, validated)
pub const ENV_JWT_ALGORITHM: &str = "SIDESEAT_JWT_ALGORITHM";

/// Environment variable for session token TTL in minutes
pub const ENV_JWT_ACCESS_TOKEN_EXPIRE_MINUTES: &str = "SIDESEAT_JWT_ACCESS_TOKEN_EXPIRE_MINUTES";

/// Default JWT algorithm
pub const DEFAULT_JWT_ALGORITHM: &str = "HS256";

/// Default session token TTL (minutes)
pub const DEFAULT_JWT_ACCESS_TOKEN_EXPIRE_MINUTES: i64 = 60 * 24;

// =============================================================================
// SQLite Database
// =============================================================================

/// SQLite database filename
pub const SQLITE_DB_FILENAME: &str = "sideseat.db";

/// SQLite connection pool max connections
pub const SQLITE_MAX_CONNECTIONS: u32 = 5;

/// SQLite busy timeout in seconds
pub const SQLITE_BUSY_TIMEOUT_SECS: u64 = 30;

/// SQLite cache size (negative = KB, so -64000 = 64MB)
pub const SQLITE_CACHE_SIZE: &str = "-64000";

/// SQLite WAL auto-checkpoint threshold (pages, ~4MB at 1000)
pub const SQLITE_WAL_AUTOCHECKPOINT: &str = "1000";

/// WAL checkpoint interval in seconds (5 minutes)
pub const SQLITE_CHECKPOINT_INTERVAL_SECS: u64 = 300;

// =============================================================================
// PostgreSQL Database
// =============================================================================

/// Environment variable for PostgreSQL connection URL
pub const ENV_POSTGRES_URL: &str = "SIDESEAT_DATABASE_URL";

/// Environment variable for transactional database backend (sqlite or postgres)
pub const ENV_TRANSACTIONAL_BACKEND: &str = "SIDESEAT_TRANSACTIONAL_BACKEND";

pub const POSTGRES_DEFAULT_MAX_CONNECTIONS: u32 = 20;
pub const POSTGRES_DEFAULT_MIN_CONNECTIONS: u32 = 2;
pub const POSTGRES_DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 30;
pub const POSTGRES_DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600;
pub const POSTGRES_DEFAULT_MAX_LIFETIME_SECS: u64 = 1800;
pub const POSTGRES_DEFAULT_STATEMENT_TIMEOUT_SECS: u64 = 60;

// =============================================================================
// Broker (pub/sub + volatile KV)
// =============================================================================

/// Environment variable for the pub/sub bus connection string. The deployed bus is
/// the Redis-backed `data::topics` backend, so this
/// aliases `redis_url` / `SIDESEAT_CACHE_REDIS_URL` when set.
pub const ENV_KAFKA_BOOTSTRAP_SERVERS: &str = "SIDESEAT_KAFKA_BOOTSTRAP_SERVERS";

/// Environment variable for the domain event stream topic name
pub const ENV_KAFKA_TOPIC_MESSAGES: &str = "SIDESEAT_KAFKA_TOPIC_MESSAGES";

/// Environment variable for the analytics topic name (reserved for upstream producers)
pub const ENV_KAFKA_TOPIC_ANALYTICS: &str = "SIDESEAT_KAFKA_TOPIC_ANALYTICS";

/// Environment variable for the aggregator's consumer group name
pub const ENV_KAFKA_CONSUMER_GROUP: &str = "SIDESEAT_KAFKA_CONSUMER_GROUP";

/// Default domain event stream topic (events consumed by the Metrics Aggregator)
pub const DEFAULT_TOPIC_EVENTS_MESSAGES: &str = "events.messages";

/// Default analytics topic name (reserved, not consumed by this crate)
pub const DEFAULT_TOPIC_EVENTS_ANALYTICS: &str = "events.analytics";

/// Default aggregator consumer group name
pub const DEFAULT_KAFKA_CONSUMER_GROUP: &str = "chat-aggregator";

/// Presence transition fan-out topic
pub const TOPIC_PRESENCE_UPDATES: &str = "presence:updates";

/// Per-channel fan-out topic prefix; full topic name is `channel:<channel_id>`
pub const CHANNEL_TOPIC_PREFIX: &str = "channel:";

/// Per-channel typing-indicator topic suffix; full topic name is `channel:<id>:typing`
pub const CHANNEL_TYPING_TOPIC_SUFFIX: &str = ":typing";

// =============================================================================
// Topic Configuration (in-process pub/sub plumbing, backend-agnostic)
// =============================================================================

pub const ENV_TOPIC_BUFFER_SIZE: &str = "SIDESEAT_TOPIC_BUFFER_SIZE";
pub const ENV_TOPIC_CHANNEL_CAPACITY: &str = "SIDESEAT_TOPIC_CHANNEL_CAPACITY";
pub const DEFAULT_TOPIC_BUFFER_SIZE: usize = 100 * 1024 * 1024;
pub const DEFAULT_TOPIC_CHANNEL_CAPACITY: usize = 100_000;
pub const BACKPRESSURE_RETRY_AFTER_SECS: u64 = 1;

// =============================================================================
// Shutdown
// =============================================================================

/// Graceful shutdown timeout in seconds (5 minutes)
pub const SHUTDOWN_TIMEOUT_SECS: u64 = 300;

// =============================================================================
// Volatile KV: Presence & Typing
// =============================================================================

/// Presence key prefix; full key is `user:presence:<user_id>`
pub const PRESENCE_KEY_PREFIX: &str = "user:presence:";

/// Presence key TTL in seconds
pub const PRESENCE_TTL_SECS: u64 = 300;

/// Value stored at a presence key
pub const PRESENCE_VALUE_ONLINE: &str = "online";

/// Typing entry key prefix; full key is `typing:<channel_id>`
pub const TYPING_KEY_PREFIX: &str = "typing:";

/// Typing entry TTL in seconds
pub const TYPING_TTL_SECS: u64 = 10;

// =============================================================================
// WebSocket / Realtime Endpoint
// =============================================================================

pub const ENV_WS_PING_INTERVAL_SECS: &str = "SIDESEAT_WS_PING_INTERVAL_SECS";
pub const ENV_WS_PING_TIMEOUT_SECS: &str = "SIDESEAT_WS_PING_TIMEOUT_SECS";
pub const ENV_WS_OUTBOUND_BUFFER_SIZE: &str = "SIDESEAT_WS_OUTBOUND_BUFFER_SIZE";

/// Default server-initiated ping interval
pub const DEFAULT_WS_PING_INTERVAL_SECS: u64 = 30;

/// Default server-initiated ping timeout before the connection is dropped
pub const DEFAULT_WS_PING_TIMEOUT_SECS: u64 = 10;

/// Default bound on a session's outbound frame sink
pub const DEFAULT_WS_OUTBOUND_BUFFER_SIZE: usize = 256;

/// Maximum accepted length of `content` on `message.send`/`message.edit`
pub const MESSAGE_CONTENT_MAX_LEN: usize = 8192;

// =============================================================================
// Metrics Aggregator
// =============================================================================

pub const ENV_METRICS_WINDOW_SECONDS: &str = "SIDESEAT_METRICS_WINDOW_SECONDS";
pub const ENV_METRICS_RETENTION_DAYS: &str = "SIDESEAT_METRICS_RETENTION_DAYS";

/// Default tumbling window size in seconds
pub const DEFAULT_METRICS_WINDOW_SECONDS: u64 = 60;

/// Default metrics retention in days
pub const DEFAULT_METRICS_RETENTION_DAYS: u32 = 30;

/// Periodic safety-flush check interval
pub const METRICS_SAFETY_FLUSH_CHECK_SECS: u64 = 10;

/// Metrics retention sweep interval in seconds (6 hours)
pub const METRICS_RETENTION_SWEEP_INTERVAL_SECS: u64 = 6 * 60 * 60;

// =============================================================================
// Users & Channels
// =============================================================================

/// Channel membership role: member (read + write)
pub const CHANNEL_ROLE_MEMBER: &str = "member";

/// Channel membership role: admin (manage membership)
pub const CHANNEL_ROLE_ADMIN: &str = "admin";

/// Channel membership role: owner (full control)
pub const CHANNEL_ROLE_OWNER: &str = "owner";

/// Default user ID (created on first run)
pub const DEFAULT_USER_ID: &str = "local";

/// Default channel ID (created on first run)
pub const DEFAULT_CHANNEL_ID: &str = "general";

// =============================================================================
// Cache
// =============================================================================

pub const ENV_CACHE_BACKEND: &str = "SIDESEAT_CACHE_BACKEND";
pub const ENV_CACHE_MAX_ENTRIES: &str = "SIDESEAT_CACHE_MAX_ENTRIES";
pub const ENV_CACHE_EVICTION_POLICY: &str = "SIDESEAT_CACHE_EVICTION_POLICY";

/// Environment variable for the Redis-compatible cache/broker URL
pub const ENV_CACHE_REDIS_URL: &str = "SIDESEAT_REDIS_URL";

pub const DEFAULT_CACHE_MAX_ENTRIES: u64 = 100_000;
pub const DEFAULT_CACHE_REDIS_URL: &str = "redis://127.0.0.1:6379/0";

/// Cache key version (bump on schema changes to invalidate all cached data)
pub const CACHE_KEY_VERSION: &str = "v1";

/// Cache TTL for user profile (5 min)
pub const CACHE_TTL_USER: u64 = 300;

/// Cache TTL for channel metadata (5 min)
pub const CACHE_TTL_CHANNEL: u64 = 300;

/// Cache TTL for channel membership role lookups (1 min - authorization critical)
pub const CACHE_TTL_MEMBERSHIP: u64 = 60;

/// Cache TTL for negative (not-found) results (30 sec - short)
pub const CACHE_TTL_NEGATIVE: u64 = 30;

/// Cache TTL for session token revocation lookups (1 min - revocation must propagate quickly)
pub const CACHE_TTL_SESSION_TOKEN: u64 = 60;

// =============================================================================
// Rate Limiting
// =============================================================================

pub const ENV_RATE_LIMIT_ENABLED: &str = "SIDESEAT_RATE_LIMIT_ENABLED";
pub const ENV_RATE_LIMIT_API_RPM: &str = "SIDESEAT_RATE_LIMIT_API_RPM";
pub const ENV_RATE_LIMIT_AUTH_RPM: &str = "SIDESEAT_RATE_LIMIT_AUTH_RPM";

pub const DEFAULT_RATE_LIMIT_API_RPM: u32 = 1000;
pub const DEFAULT_RATE_LIMIT_AUTH_RPM: u32 = 30;
pub const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 60;
