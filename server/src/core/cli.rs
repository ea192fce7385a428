use clap::{Parser, Subcommand};

use std::path::PathBuf;

use super::config::{CacheBackendType, EvictionPolicy, SecretsBackend, TransactionalBackend};
use super::constants::{
    ENV_CACHE_BACKEND, ENV_CACHE_EVICTION_POLICY, ENV_CACHE_MAX_ENTRIES, ENV_CACHE_REDIS_URL,
    ENV_CONFIG, ENV_DEBUG, ENV_HOST, ENV_JWT_ACCESS_TOKEN_EXPIRE_MINUTES, ENV_JWT_ALGORITHM,
    ENV_JWT_SECRET_KEY, ENV_KAFKA_BOOTSTRAP_SERVERS, ENV_KAFKA_CONSUMER_GROUP,
    ENV_KAFKA_TOPIC_MESSAGES, ENV_METRICS_RETENTION_DAYS, ENV_METRICS_WINDOW_SECONDS, ENV_PORT,
    ENV_POSTGRES_URL, ENV_RATE_LIMIT_API_RPM, ENV_RATE_LIMIT_AUTH_RPM, ENV_RATE_LIMIT_ENABLED,
    ENV_SECRETS_BACKEND, ENV_TRANSACTIONAL_BACKEND, ENV_WS_PING_INTERVAL_SECS,
    ENV_WS_PING_TIMEOUT_SECS,
};

#[derive(Parser)]
#[command(name = "sideseat")]
#[command(version, about = "Realtime chat messaging fabric", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Server host address
    #[arg(long, short = 'H', global = true, env = ENV_HOST)]
    pub host: Option<String>,

    /// Server port
    #[arg(long, short = 'p', global = true, env = ENV_PORT)]
    pub port: Option<u16>,

    /// Enable debug mode (verbose logging, relaxed checks)
    #[arg(long, global = true, env = ENV_DEBUG)]
    pub debug: bool,

    /// Path to config file
    #[arg(long, short = 'c', global = true, env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    // JWT / session token options
    /// JWT signing secret (falls back to the secrets backend when unset)
    #[arg(long, global = true, env = ENV_JWT_SECRET_KEY)]
    pub jwt_secret_key: Option<String>,

    /// JWT signing algorithm (HS256 only)
    #[arg(long, global = true, env = ENV_JWT_ALGORITHM)]
    pub jwt_algorithm: Option<String>,

    /// Session token lifetime in minutes
    #[arg(long, global = true, env = ENV_JWT_ACCESS_TOKEN_EXPIRE_MINUTES)]
    pub jwt_access_token_expire_minutes: Option<i64>,

    // Broker options
    /// Pub/sub bus connection string (Redis-compatible)
    #[arg(long, global = true, env = ENV_KAFKA_BOOTSTRAP_SERVERS)]
    pub kafka_bootstrap_servers: Option<String>,

    /// Domain event stream topic name
    #[arg(long, global = true, env = ENV_KAFKA_TOPIC_MESSAGES)]
    pub kafka_topic_messages: Option<String>,

    /// Metrics Aggregator consumer group name
    #[arg(long, global = true, env = ENV_KAFKA_CONSUMER_GROUP)]
    pub kafka_consumer_group: Option<String>,

    // WebSocket options
    /// Server-initiated ping interval in seconds
    #[arg(long, global = true, env = ENV_WS_PING_INTERVAL_SECS)]
    pub ws_ping_interval: Option<u64>,

    /// Ping timeout before a silent connection is dropped, in seconds
    #[arg(long, global = true, env = ENV_WS_PING_TIMEOUT_SECS)]
    pub ws_ping_timeout: Option<u64>,

    // Metrics aggregator options
    /// Tumbling window size for metrics aggregation, in seconds
    #[arg(long, global = true, env = ENV_METRICS_WINDOW_SECONDS)]
    pub metrics_window_seconds: Option<u64>,

    /// Metrics retention window in days
    #[arg(long, global = true, env = ENV_METRICS_RETENTION_DAYS)]
    pub metrics_retention_days: Option<u32>,

    // Cache options
    /// Cache backend (memory or redis)
    #[arg(long, global = true, env = ENV_CACHE_BACKEND, value_parser = parse_cache_backend_type)]
    pub cache_backend: Option<CacheBackendType>,

    /// Maximum number of cache entries
    #[arg(long, global = true, env = ENV_CACHE_MAX_ENTRIES)]
    pub cache_max_entries: Option<u64>,

    /// Cache eviction policy (tinylfu or lru)
    #[arg(long, global = true, env = ENV_CACHE_EVICTION_POLICY, value_parser = parse_eviction_policy)]
    pub cache_eviction_policy: Option<EvictionPolicy>,

    /// Redis-compatible cache/broker URL. Supports Redis, Sentinel, Valkey, Dragonfly.
    #[arg(long, global = true, env = ENV_CACHE_REDIS_URL)]
    pub cache_redis_url: Option<String>,

    // Rate limit options
    /// Enable or disable rate limiting
    #[arg(long, global = true, env = ENV_RATE_LIMIT_ENABLED)]
    pub rate_limit_enabled: Option<bool>,

    /// API rate limit (requests per minute)
    #[arg(long, global = true, env = ENV_RATE_LIMIT_API_RPM)]
    pub rate_limit_api_rpm: Option<u32>,

    /// Auth rate limit (requests per minute)
    #[arg(long, global = true, env = ENV_RATE_LIMIT_AUTH_RPM)]
    pub rate_limit_auth_rpm: Option<u32>,

    /// Secrets backend
    #[arg(long, global = true, env = ENV_SECRETS_BACKEND, value_parser = parse_secrets_backend)]
    pub secrets_backend: Option<SecretsBackend>,

    // Database options
    /// Transactional database backend (sqlite or postgres)
    #[arg(long, global = true, env = ENV_TRANSACTIONAL_BACKEND, value_parser = parse_transactional_backend)]
    pub transactional_backend: Option<TransactionalBackend>,

    /// PostgreSQL connection URL (when using the postgres backend)
    #[arg(long, global = true, env = ENV_POSTGRES_URL)]
    pub postgres_url: Option<String>,
}

/// Parse cache backend type from CLI/env string
fn parse_cache_backend_type(s: &str) -> Result<CacheBackendType, String> {
    match s.to_lowercase().as_str() {
        "memory" => Ok(CacheBackendType::Memory),
        "redis" => Ok(CacheBackendType::Redis),
        _ => Err(format!(
            "Invalid cache backend '{}'. Valid options: memory, redis",
            s
        )),
    }
}

/// Parse eviction policy from CLI/env string
fn parse_eviction_policy(s: &str) -> Result<EvictionPolicy, String> {
    match s.to_lowercase().as_str() {
        "tinylfu" => Ok(EvictionPolicy::TinyLfu),
        "lru" => Ok(EvictionPolicy::Lru),
        _ => Err(format!(
            "Invalid eviction policy '{}'. Valid options: tinylfu, lru",
            s
        )),
    }
}

/// Parse transactional backend from CLI/env string
fn parse_transactional_backend(s: &str) -> Result<TransactionalBackend, String> {
    match s.to_lowercase().as_str() {
        "sqlite" => Ok(TransactionalBackend::Sqlite),
        "postgres" | "postgresql" => Ok(TransactionalBackend::Postgres),
        _ => Err(format!(
            "Invalid transactional backend '{}'. Valid options: sqlite, postgres",
            s
        )),
    }
}

/// Parse secrets backend from CLI/env string
fn parse_secrets_backend(s: &str) -> Result<SecretsBackend, String> {
    match s.to_lowercase().as_str() {
        "keychain" => Ok(SecretsBackend::Keychain),
        "credential-manager" => Ok(SecretsBackend::CredentialManager),
        "secret-service" => Ok(SecretsBackend::SecretService),
        "keyutils" => Ok(SecretsBackend::Keyutils),
        "file" => Ok(SecretsBackend::File),
        "env" => Ok(SecretsBackend::Env),
        "aws" => Ok(SecretsBackend::Aws),
        "vault" | "hashicorp" => Ok(SecretsBackend::Vault),
        _ => Err(format!(
            "Invalid secrets backend '{}'. Valid: keychain, \
             credential-manager, secret-service, keyutils, file, env, aws, vault",
            s
        )),
    }
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Start the server (default command)
    Start,
    /// System maintenance commands
    System {
        #[command(subcommand)]
        command: SystemCommands,
    },
}

#[derive(Subcommand, Clone, Debug)]
pub enum SystemCommands {
    /// Delete local data directory (databases, caches). Requires confirmation.
    Prune {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub debug: bool,
    pub config: Option<PathBuf>,
    pub jwt_secret_key: Option<String>,
    pub jwt_algorithm: Option<String>,
    pub jwt_access_token_expire_minutes: Option<i64>,
    pub kafka_bootstrap_servers: Option<String>,
    pub kafka_topic_messages: Option<String>,
    pub kafka_consumer_group: Option<String>,
    pub ws_ping_interval: Option<u64>,
    pub ws_ping_timeout: Option<u64>,
    pub metrics_window_seconds: Option<u64>,
    pub metrics_retention_days: Option<u32>,
    pub cache_backend: Option<CacheBackendType>,
    pub cache_max_entries: Option<u64>,
    pub cache_eviction_policy: Option<EvictionPolicy>,
    pub cache_redis_url: Option<String>,
    pub rate_limit_enabled: Option<bool>,
    pub rate_limit_api_rpm: Option<u32>,
    pub rate_limit_auth_rpm: Option<u32>,
    pub secrets_backend: Option<SecretsBackend>,
    pub transactional_backend: Option<TransactionalBackend>,
    pub postgres_url: Option<String>,
}

/// Parse CLI arguments and return config with command
pub fn parse() -> (CliConfig, Option<Commands>) {
    let cli = Cli::parse();
    let config = CliConfig {
        host: cli.host,
        port: cli.port,
        debug: cli.debug,
        config: cli.config,
        jwt_secret_key: cli.jwt_secret_key,
        jwt_algorithm: cli.jwt_algorithm,
        jwt_access_token_expire_minutes: cli.jwt_access_token_expire_minutes,
        kafka_bootstrap_servers: cli.kafka_bootstrap_servers,
        kafka_topic_messages: cli.kafka_topic_messages,
        kafka_consumer_group: cli.kafka_consumer_group,
        ws_ping_interval: cli.ws_ping_interval,
        ws_ping_timeout: cli.ws_ping_timeout,
        metrics_window_seconds: cli.metrics_window_seconds,
        metrics_retention_days: cli.metrics_retention_days,
        cache_backend: cli.cache_backend,
        cache_max_entries: cli.cache_max_entries,
        cache_eviction_policy: cli.cache_eviction_policy,
        cache_redis_url: cli.cache_redis_url,
        rate_limit_enabled: cli.rate_limit_enabled,
        rate_limit_api_rpm: cli.rate_limit_api_rpm,
        rate_limit_auth_rpm: cli.rate_limit_auth_rpm,
        secrets_backend: cli.secrets_backend,
        transactional_backend: cli.transactional_backend,
        postgres_url: cli.postgres_url,
    };
    (config, cli.command)
}
