//! Data storage layer
//!
//! Provides database services for the application:
//! - `sqlite` / `postgres` - Transactional stores for users, channels, messages and metrics
//! - `cache` - In-memory and Redis caching (also backs presence/typing volatile state)
//! - `secrets` - Multi-backend secret manager (JWT signing key storage)
//! - `topics` - Pub/sub fan-out abstraction used by the realtime broker adapter
//! - `types` - Shared row/enum types across all backends
//! - `traits` - Repository trait for multi-database support
//! - `error` - Unified error type for all backends
//!
//! ## Backend Support
//!
//! `TransactionalRepository` is implemented by both SQLite and PostgreSQL, so the
//! rest of the application can stay backend-agnostic.

pub mod cache;
pub mod error;
pub mod postgres;
pub mod secrets;
pub mod sqlite;
pub mod topics;
pub mod traits;
pub mod types;

// Re-export backend-specific services
pub use postgres::PostgresService;
pub use sqlite::SqliteService;

// Re-export unified error type
pub use error::DataError;

// Re-export repository trait
pub use traits::{TransactionalRepository, has_min_role_level};

// Re-export shared types for convenient access
pub use types::{ChannelRole, MessageType, PresenceStatus};

use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::core::config::{PostgresConfig, TransactionalBackend};
use crate::core::storage::AppStorage;

/// Transactional database service enum
///
/// Wraps the underlying backend-specific service (SQLite or PostgreSQL).
/// Provides a unified interface for all transactional operations.
/// Services are stored as Arc to enable safe extraction.
pub enum TransactionalService {
    /// SQLite backend (default, embedded)
    Sqlite(Arc<SqliteService>),
    /// PostgreSQL backend (for distributed deployments)
    Postgres(Arc<PostgresService>),
}

impl TransactionalService {
    /// Initialize the transactional service based on configuration
    ///
    /// For SQLite backend, uses the storage path.
    /// For PostgreSQL backend, requires a PostgresConfig.
    pub async fn init(
        backend: TransactionalBackend,
        storage: &AppStorage,
        postgres_config: Option<&PostgresConfig>,
    ) -> Result<Self, DataError> {
        match backend {
            TransactionalBackend::Sqlite => {
                let service = SqliteService::init(storage).await?;
                Ok(Self::Sqlite(Arc::new(service)))
            }
            TransactionalBackend::Postgres => {
                let config = postgres_config.ok_or_else(|| {
                    DataError::Config("PostgreSQL configuration required".to_string())
                })?;
                let service = PostgresService::init(config).await?;
                Ok(Self::Postgres(Arc::new(service)))
            }
        }
    }

    /// Get the underlying SQLite pool (for direct access when needed)
    ///
    /// # Panics
    /// Panics if the service is not SQLite.
    pub fn sqlite_pool(&self) -> &sqlx::SqlitePool {
        match self {
            Self::Sqlite(s) => s.pool(),
            Self::Postgres(_) => panic!("Cannot get SQLite pool from PostgreSQL service"),
        }
    }

    /// Get the SQLite pool (convenience alias for sqlite_pool)
    ///
    /// # Panics
    /// Panics if the service is not SQLite. Use `backend()` to check first if unsure.
    pub fn pool(&self) -> &sqlx::SqlitePool {
        self.sqlite_pool()
    }

    /// Run a WAL checkpoint (SQLite) or equivalent maintenance task
    pub async fn checkpoint(&self) -> Result<(), DataError> {
        match self {
            Self::Sqlite(s) => s.checkpoint().await.map_err(Into::into),
            Self::Postgres(_) => {
                // PostgreSQL manages its own maintenance via autovacuum
                Ok(())
            }
        }
    }

    /// Close the database connection gracefully
    pub async fn close(&self) {
        match self {
            Self::Sqlite(s) => s.close().await,
            Self::Postgres(p) => p.close().await,
        }
    }

    /// Start the background checkpoint task (SQLite only)
    /// For PostgreSQL, starts a health check task instead.
    pub fn start_checkpoint_task(&self, shutdown_rx: watch::Receiver<bool>) -> JoinHandle<()> {
        match self {
            Self::Sqlite(s) => Arc::clone(s).start_checkpoint_task(shutdown_rx),
            Self::Postgres(p) => Arc::clone(p).start_health_check_task(shutdown_rx),
        }
    }

    /// Get the backend type
    pub fn backend(&self) -> TransactionalBackend {
        match self {
            Self::Sqlite(_) => TransactionalBackend::Sqlite,
            Self::Postgres(_) => TransactionalBackend::Postgres,
        }
    }

    /// Get the repository trait object for data operations
    ///
    /// This returns a boxed trait object, allowing backend-agnostic
    /// data operations through the TransactionalRepository interface.
    pub fn repository(&self) -> Box<dyn TransactionalRepository + Send + Sync> {
        match self {
            Self::Sqlite(s) => Box::new(Arc::clone(s)),
            Self::Postgres(p) => Box::new(Arc::clone(p)),
        }
    }
}
