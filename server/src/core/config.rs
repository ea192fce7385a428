use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::utils::file::expand_path;

use super::cli::CliConfig;
use super::constants::{
    DEFAULT_CACHE_MAX_ENTRIES, DEFAULT_CACHE_REDIS_URL, DEFAULT_HOST,
    DEFAULT_JWT_ACCESS_TOKEN_EXPIRE_MINUTES, DEFAULT_JWT_ALGORITHM, DEFAULT_KAFKA_CONSUMER_GROUP,
    DEFAULT_METRICS_RETENTION_DAYS, DEFAULT_METRICS_WINDOW_SECONDS, DEFAULT_PORT,
    DEFAULT_RATE_LIMIT_API_RPM, DEFAULT_RATE_LIMIT_AUTH_RPM, DEFAULT_RATE_LIMIT_WINDOW_SECS,
    DEFAULT_TOPIC_EVENTS_ANALYTICS, DEFAULT_TOPIC_EVENTS_MESSAGES, DEFAULT_WS_OUTBOUND_BUFFER_SIZE,
    DEFAULT_WS_PING_INTERVAL_SECS, DEFAULT_WS_PING_TIMEOUT_SECS, POSTGRES_DEFAULT_ACQUIRE_TIMEOUT_SECS,
    POSTGRES_DEFAULT_IDLE_TIMEOUT_SECS, POSTGRES_DEFAULT_MAX_CONNECTIONS,
    POSTGRES_DEFAULT_MAX_LIFETIME_SECS, POSTGRES_DEFAULT_MIN_CONNECTIONS,
    POSTGRES_DEFAULT_STATEMENT_TIMEOUT_SECS, SECRETS_DEFAULT_ENV_PREFIX,
};

// =============================================================================
// Transactional Backend Enum (SQLite or PostgreSQL)
// =============================================================================

/// Transactional database backend for chat state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionalBackend {
    #[default]
    Sqlite,
    Postgres,
}

impl fmt::Display for TransactionalBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionalBackend::Sqlite => write!(f, "sqlite"),
            TransactionalBackend::Postgres => write!(f, "postgres"),
        }
    }
}

// =============================================================================
// Cache Backend Enum
// =============================================================================

/// Cache/broker backend type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackendType {
    #[default]
    Memory,
    Redis,
}

impl fmt::Display for CacheBackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheBackendType::Memory => write!(f, "memory"),
            CacheBackendType::Redis => write!(f, "redis"),
        }
    }
}

// =============================================================================
// Eviction Policy Enum
// =============================================================================

/// Cache eviction policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionPolicy {
    /// TinyLFU - LRU eviction + LFU admission (near-optimal hit ratio)
    #[default]
    TinyLfu,
    /// Simple LRU (better for recency-biased workloads)
    Lru,
}

impl fmt::Display for EvictionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvictionPolicy::TinyLfu => write!(f, "tinylfu"),
            EvictionPolicy::Lru => write!(f, "lru"),
        }
    }
}

// =============================================================================
// Secrets Backend Enum
// =============================================================================

/// Secrets storage backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SecretsBackend {
    DataProtectionKeychain,
    Keychain,
    CredentialManager,
    SecretService,
    Keyutils,
    File,
    Env,
    Aws,
    Vault,
}

impl SecretsBackend {
    /// Auto-detect best available backend for the current platform.
    pub fn detect() -> Self {
        #[cfg(target_os = "macos")]
        {
            Self::DataProtectionKeychain
        }
        #[cfg(target_os = "windows")]
        {
            Self::CredentialManager
        }
        #[cfg(target_os = "linux")]
        {
            Self::SecretService
        }
        #[cfg(not(any(target_os = "macos", target_os = "windows", target_os = "linux")))]
        {
            Self::File
        }
    }

    /// Whether this backend uses vault-blob storage (keychain/file variants)
    pub fn is_vault_based(&self) -> bool {
        matches!(
            self,
            Self::DataProtectionKeychain
                | Self::Keychain
                | Self::CredentialManager
                | Self::SecretService
                | Self::Keyutils
                | Self::File
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DataProtectionKeychain => "data-protection-keychain",
            Self::Keychain => "keychain",
            Self::CredentialManager => "credential-manager",
            Self::SecretService => "secret-service",
            Self::Keyutils => "keyutils",
            Self::File => "file",
            Self::Env => "env",
            Self::Aws => "aws",
            Self::Vault => "vault",
        }
    }
}

impl fmt::Display for SecretsBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// File Config Structs (JSON deserialization)
// =============================================================================

/// Server configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ServerFileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// JWT / session token configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct JwtFileConfig {
    pub secret_key: Option<String>,
    pub algorithm: Option<String>,
    pub access_token_expire_minutes: Option<i64>,
}

/// Pub/sub bus ("broker") configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct BrokerFileConfig {
    pub bootstrap_servers: Option<String>,
    pub topic_messages: Option<String>,
    pub topic_analytics: Option<String>,
    pub consumer_group: Option<String>,
}

/// Realtime WebSocket endpoint configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct WebSocketFileConfig {
    pub ping_interval_secs: Option<u64>,
    pub ping_timeout_secs: Option<u64>,
    pub outbound_buffer_size: Option<usize>,
}

/// Metrics Aggregator configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct MetricsFileConfig {
    pub window_seconds: Option<u64>,
    pub retention_days: Option<u32>,
}

/// Cache configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct CacheFileConfig {
    pub backend: Option<CacheBackendType>,
    pub max_entries: Option<u64>,
    pub eviction_policy: Option<EvictionPolicy>,
    pub redis_url: Option<String>,
}

/// Rate limit configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct RateLimitFileConfig {
    pub enabled: Option<bool>,
    pub api_rpm: Option<u32>,
    pub auth_rpm: Option<u32>,
}

/// PostgreSQL connection pool tuning (nested under database)
#[derive(Debug, Default, Clone, Deserialize)]
pub struct PostgresFileConfig {
    pub url: Option<String>,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    pub acquire_timeout_secs: Option<u64>,
    pub idle_timeout_secs: Option<u64>,
    pub max_lifetime_secs: Option<u64>,
    pub statement_timeout_secs: Option<u64>,
}

/// Database configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct DatabaseFileConfig {
    pub transactional_backend: Option<TransactionalBackend>,
    pub postgres: Option<PostgresFileConfig>,
}

/// Environment-variable secrets backend config
#[derive(Debug, Default, Clone, Deserialize)]
pub struct SecretsEnvFileConfig {
    pub prefix: Option<String>,
}

/// AWS Secrets Manager backend config
#[derive(Debug, Default, Clone, Deserialize)]
pub struct SecretsAwsFileConfig {
    pub region: Option<String>,
    pub prefix: Option<String>,
    pub recovery_window_days: Option<i32>,
}

/// HashiCorp Vault backend config
#[derive(Debug, Default, Clone, Deserialize)]
pub struct SecretsVaultFileConfig {
    pub address: Option<String>,
    pub token: Option<String>,
    pub mount: Option<String>,
    pub prefix: Option<String>,
}

/// Secrets configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct SecretsFileConfig {
    pub backend: Option<SecretsBackend>,
    pub env: Option<SecretsEnvFileConfig>,
    pub aws: Option<SecretsAwsFileConfig>,
    pub vault: Option<SecretsVaultFileConfig>,
}

/// Top-level JSON config file shape
#[derive(Debug, Default, Clone, Deserialize)]
pub struct FileConfig {
    pub server: Option<ServerFileConfig>,
    pub jwt: Option<JwtFileConfig>,
    pub broker: Option<BrokerFileConfig>,
    pub websocket: Option<WebSocketFileConfig>,
    pub metrics: Option<MetricsFileConfig>,
    pub cache: Option<CacheFileConfig>,
    pub rate_limit: Option<RateLimitFileConfig>,
    pub database: Option<DatabaseFileConfig>,
    pub secrets: Option<SecretsFileConfig>,
    pub debug: Option<bool>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

const KNOWN_TOP_LEVEL_KEYS: &[&str] = &[
    "server",
    "jwt",
    "broker",
    "websocket",
    "metrics",
    "cache",
    "rate_limit",
    "database",
    "secrets",
    "debug",
];

impl FileConfig {
    /// Load and parse a config file from disk. Returns `Ok(None)` if the file doesn't exist.
    pub fn load_from_file(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: FileConfig = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        config.warn_unknown_fields();
        Ok(Some(config))
    }

    fn warn_unknown_fields(&self) {
        for key in self.extra.keys() {
            if !KNOWN_TOP_LEVEL_KEYS.contains(&key.as_str()) {
                tracing::warn!(key = %key, "unknown top-level config key, ignoring");
            }
        }
    }
}

// =============================================================================
// Runtime Config Structs
// =============================================================================

/// Server bind configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

/// JWT session token configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// When `None`, the signing key comes from the secrets backend instead.
    pub secret_key: Option<String>,
    pub algorithm: String,
    pub access_token_expire_minutes: i64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret_key: None,
            algorithm: DEFAULT_JWT_ALGORITHM.to_string(),
            access_token_expire_minutes: DEFAULT_JWT_ACCESS_TOKEN_EXPIRE_MINUTES,
        }
    }
}

/// Pub/sub bus ("broker") configuration
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Connection string for the underlying bus. `None` uses the in-process backend.
    pub bootstrap_servers: Option<String>,
    pub topic_messages: String,
    pub topic_analytics: String,
    pub consumer_group: String,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            bootstrap_servers: None,
            topic_messages: DEFAULT_TOPIC_EVENTS_MESSAGES.to_string(),
            topic_analytics: DEFAULT_TOPIC_EVENTS_ANALYTICS.to_string(),
            consumer_group: DEFAULT_KAFKA_CONSUMER_GROUP.to_string(),
        }
    }
}

/// Realtime WebSocket endpoint configuration
#[derive(Debug, Clone)]
pub struct WebSocketConfig {
    pub ping_interval_secs: u64,
    pub ping_timeout_secs: u64,
    pub outbound_buffer_size: usize,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            ping_interval_secs: DEFAULT_WS_PING_INTERVAL_SECS,
            ping_timeout_secs: DEFAULT_WS_PING_TIMEOUT_SECS,
            outbound_buffer_size: DEFAULT_WS_OUTBOUND_BUFFER_SIZE,
        }
    }
}

/// Metrics Aggregator configuration
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    pub window_seconds: u64,
    pub retention_days: u32,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            window_seconds: DEFAULT_METRICS_WINDOW_SECONDS,
            retention_days: DEFAULT_METRICS_RETENTION_DAYS,
        }
    }
}

/// Cache / broker KV configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub backend: CacheBackendType,
    pub max_entries: u64,
    pub eviction_policy: EvictionPolicy,
    pub redis_url: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackendType::default(),
            max_entries: DEFAULT_CACHE_MAX_ENTRIES,
            eviction_policy: EvictionPolicy::default(),
            redis_url: DEFAULT_CACHE_REDIS_URL.to_string(),
        }
    }
}

/// API/auth rate limiting configuration
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub api_rpm: u32,
    pub auth_rpm: u32,
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_rpm: DEFAULT_RATE_LIMIT_API_RPM,
            auth_rpm: DEFAULT_RATE_LIMIT_AUTH_RPM,
            window_secs: DEFAULT_RATE_LIMIT_WINDOW_SECS,
        }
    }
}

/// PostgreSQL connection pool tuning
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
    pub statement_timeout_secs: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: POSTGRES_DEFAULT_MAX_CONNECTIONS,
            min_connections: POSTGRES_DEFAULT_MIN_CONNECTIONS,
            acquire_timeout_secs: POSTGRES_DEFAULT_ACQUIRE_TIMEOUT_SECS,
            idle_timeout_secs: POSTGRES_DEFAULT_IDLE_TIMEOUT_SECS,
            max_lifetime_secs: POSTGRES_DEFAULT_MAX_LIFETIME_SECS,
            statement_timeout_secs: POSTGRES_DEFAULT_STATEMENT_TIMEOUT_SECS,
        }
    }
}

/// Transactional (relational) store configuration
#[derive(Debug, Clone, Default)]
pub struct TransactionalConfig {
    pub backend: TransactionalBackend,
    pub postgres: PostgresConfig,
}

/// Environment-variable secrets backend config
#[derive(Debug, Clone, Default)]
pub struct SecretsEnvConfig {
    pub prefix: String,
}

/// AWS Secrets Manager backend config
#[derive(Debug, Clone)]
pub struct SecretsAwsConfig {
    pub region: Option<String>,
    pub prefix: String,
    pub recovery_window_days: Option<i32>,
}

/// HashiCorp Vault backend config
#[derive(Debug, Clone)]
pub struct SecretsVaultConfig {
    pub address: String,
    pub token: String,
    pub mount: String,
    pub prefix: String,
}

/// Secrets manager configuration
#[derive(Debug, Clone)]
pub struct SecretsConfig {
    pub backend: SecretsBackend,
    pub env: Option<SecretsEnvConfig>,
    pub aws: Option<SecretsAwsConfig>,
    pub vault: Option<SecretsVaultConfig>,
}

impl Default for SecretsConfig {
    fn default() -> Self {
        Self {
            backend: SecretsBackend::detect(),
            env: None,
            aws: None,
            vault: None,
        }
    }
}

/// Fully resolved application configuration: file config, merged with
/// environment variables (handled by clap's `env` attribute) and CLI flags.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub jwt: JwtConfig,
    pub broker: BrokerConfig,
    pub websocket: WebSocketConfig,
    pub metrics: MetricsConfig,
    pub cache: CacheConfig,
    pub rate_limit: RateLimitConfig,
    pub transactional: TransactionalConfig,
    pub secrets: SecretsConfig,
    pub debug: bool,
    pub data_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Load configuration by layering: defaults -> config file -> CLI/env overrides.
    /// CLI flags (which clap also resolves from env vars) always win.
    pub fn load(cli: &CliConfig) -> Result<Self> {
        let file_path = cli
            .config
            .clone()
            .unwrap_or_else(|| default_config_path());
        let file = FileConfig::load_from_file(&file_path)?;

        let mut config = AppConfig::default();
        if let Some(file) = file {
            config.apply_file(file);
        }
        config.apply_cli(cli);
        Ok(config)
    }

    fn apply_file(&mut self, file: FileConfig) {
        if let Some(s) = file.server {
            if let Some(host) = s.host {
                self.server.host = host;
            }
            if let Some(port) = s.port {
                self.server.port = port;
            }
        }
        if let Some(j) = file.jwt {
            if let Some(v) = j.secret_key {
                self.jwt.secret_key = Some(v);
            }
            if let Some(v) = j.algorithm {
                self.jwt.algorithm = v;
            }
            if let Some(v) = j.access_token_expire_minutes {
                self.jwt.access_token_expire_minutes = v;
            }
        }
        if let Some(b) = file.broker {
            if let Some(v) = b.bootstrap_servers {
                self.broker.bootstrap_servers = Some(v);
            }
            if let Some(v) = b.topic_messages {
                self.broker.topic_messages = v;
            }
            if let Some(v) = b.topic_analytics {
                self.broker.topic_analytics = v;
            }
            if let Some(v) = b.consumer_group {
                self.broker.consumer_group = v;
            }
        }
        if let Some(w) = file.websocket {
            if let Some(v) = w.ping_interval_secs {
                self.websocket.ping_interval_secs = v;
            }
            if let Some(v) = w.ping_timeout_secs {
                self.websocket.ping_timeout_secs = v;
            }
            if let Some(v) = w.outbound_buffer_size {
                self.websocket.outbound_buffer_size = v;
            }
        }
        if let Some(m) = file.metrics {
            if let Some(v) = m.window_seconds {
                self.metrics.window_seconds = v;
            }
            if let Some(v) = m.retention_days {
                self.metrics.retention_days = v;
            }
        }
        if let Some(c) = file.cache {
            if let Some(v) = c.backend {
                self.cache.backend = v;
            }
            if let Some(v) = c.max_entries {
                self.cache.max_entries = v;
            }
            if let Some(v) = c.eviction_policy {
                self.cache.eviction_policy = v;
            }
            if let Some(v) = c.redis_url {
                self.cache.redis_url = v;
            }
        }
        if let Some(r) = file.rate_limit {
            if let Some(v) = r.enabled {
                self.rate_limit.enabled = v;
            }
            if let Some(v) = r.api_rpm {
                self.rate_limit.api_rpm = v;
            }
            if let Some(v) = r.auth_rpm {
                self.rate_limit.auth_rpm = v;
            }
        }
        if let Some(d) = file.database {
            if let Some(v) = d.transactional_backend {
                self.transactional.backend = v;
            }
            if let Some(p) = d.postgres {
                if let Some(v) = p.url {
                    self.transactional.postgres.url = Some(v);
                }
                if let Some(v) = p.max_connections {
                    self.transactional.postgres.max_connections = v;
                }
                if let Some(v) = p.min_connections {
                    self.transactional.postgres.min_connections = v;
                }
                if let Some(v) = p.acquire_timeout_secs {
                    self.transactional.postgres.acquire_timeout_secs = v;
                }
                if let Some(v) = p.idle_timeout_secs {
                    self.transactional.postgres.idle_timeout_secs = v;
                }
                if let Some(v) = p.max_lifetime_secs {
                    self.transactional.postgres.max_lifetime_secs = v;
                }
                if let Some(v) = p.statement_timeout_secs {
                    self.transactional.postgres.statement_timeout_secs = v;
                }
            }
        }
        if let Some(s) = file.secrets {
            if let Some(v) = s.backend {
                self.secrets.backend = v;
            }
            if let Some(e) = s.env {
                self.secrets.env = Some(SecretsEnvConfig {
                    prefix: e.prefix.unwrap_or_else(|| SECRETS_DEFAULT_ENV_PREFIX.to_string()),
                });
            }
            if let Some(a) = s.aws {
                self.secrets.aws = Some(SecretsAwsConfig {
                    region: a.region,
                    prefix: a.prefix.unwrap_or_default(),
                    recovery_window_days: a.recovery_window_days,
                });
            }
            if let Some(v) = s.vault {
                self.secrets.vault = Some(SecretsVaultConfig {
                    address: v.address.unwrap_or_default(),
                    token: v.token.unwrap_or_default(),
                    mount: v.mount.unwrap_or_else(|| "secret".to_string()),
                    prefix: v.prefix.unwrap_or_default(),
                });
            }
        }
        if let Some(v) = file.debug {
            self.debug = v;
        }
    }

    fn apply_cli(&mut self, cli: &CliConfig) {
        if let Some(v) = &cli.host {
            self.server.host = v.clone();
        }
        if let Some(v) = cli.port {
            self.server.port = v;
        }
        if cli.debug {
            self.debug = true;
        }

        if let Some(v) = &cli.jwt_secret_key {
            self.jwt.secret_key = Some(v.clone());
        }
        if let Some(v) = &cli.jwt_algorithm {
            self.jwt.algorithm = v.clone();
        }
        if let Some(v) = cli.jwt_access_token_expire_minutes {
            self.jwt.access_token_expire_minutes = v;
        }

        if let Some(v) = &cli.kafka_bootstrap_servers {
            self.broker.bootstrap_servers = Some(v.clone());
        }
        if let Some(v) = &cli.kafka_topic_messages {
            self.broker.topic_messages = v.clone();
        }
        if let Some(v) = &cli.kafka_consumer_group {
            self.broker.consumer_group = v.clone();
        }

        if let Some(v) = cli.ws_ping_interval {
            self.websocket.ping_interval_secs = v;
        }
        if let Some(v) = cli.ws_ping_timeout {
            self.websocket.ping_timeout_secs = v;
        }

        if let Some(v) = cli.metrics_window_seconds {
            self.metrics.window_seconds = v;
        }
        if let Some(v) = cli.metrics_retention_days {
            self.metrics.retention_days = v;
        }

        if let Some(v) = cli.cache_backend {
            self.cache.backend = v;
        }
        if let Some(v) = cli.cache_max_entries {
            self.cache.max_entries = v;
        }
        if let Some(v) = cli.cache_eviction_policy {
            self.cache.eviction_policy = v;
        }
        if let Some(v) = &cli.cache_redis_url {
            self.cache.redis_url = v.clone();
        }

        if let Some(v) = cli.rate_limit_enabled {
            self.rate_limit.enabled = v;
        }
        if let Some(v) = cli.rate_limit_api_rpm {
            self.rate_limit.api_rpm = v;
        }
        if let Some(v) = cli.rate_limit_auth_rpm {
            self.rate_limit.auth_rpm = v;
        }

        if let Some(v) = cli.secrets_backend {
            self.secrets.backend = v;
        }

        if let Some(v) = cli.transactional_backend {
            self.transactional.backend = v;
        }
        if let Some(v) = &cli.postgres_url {
            self.transactional.postgres.url = Some(v.clone());
        }
    }
}

/// Whether a bind host represents "all interfaces" (displayed as localhost in banners)
pub fn is_all_interfaces(host: &str) -> bool {
    matches!(host, "0.0.0.0" | "::" | "[::]")
}

fn default_config_path() -> PathBuf {
    expand_path(&format!(
        "~/{}/{}",
        super::constants::APP_DOT_FOLDER,
        super::constants::CONFIG_FILE_NAME
    ))
}
