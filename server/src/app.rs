//! Core application

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::api::{ApiServer, AuthManager};
use crate::core::TopicService;
use crate::core::banner;
use crate::core::cli::{self, CliConfig, Commands, SystemCommands};
use crate::core::config::AppConfig;
use crate::core::constants::{APP_NAME_LOWER, ENV_LOG};
use crate::core::shutdown::ShutdownService;
use crate::core::storage::AppStorage;
use crate::data::TransactionalService;
use crate::data::cache::{CacheService, RateLimiter};
use crate::data::secrets::SecretManager;
use crate::realtime::{BrokerAdapter, ConnectionManager, MetricsAggregator};

pub struct CoreApp {
    pub shutdown: ShutdownService,
    pub config: AppConfig,
    pub storage: AppStorage,
    pub secrets: SecretManager,
    pub database: Arc<TransactionalService>,
    pub auth: Arc<AuthManager>,
    pub topics: Arc<TopicService>,
    pub cache: Arc<CacheService>,
    pub rate_limiter: Arc<RateLimiter>,
    pub connections: Arc<ConnectionManager>,
    pub broker: Arc<BrokerAdapter>,
    pub aggregator: Arc<MetricsAggregator>,
}

impl CoreApp {
    /// Run the application with CLI argument parsing
    pub async fn run() -> Result<()> {
        dotenvy::dotenv().ok();
        Self::init_logging();

        tracing::debug!("Application starting");

        let (cli_config, command) = cli::parse();
        tracing::trace!(command = ?command, "Parsed command");

        match command {
            Some(Commands::System {
                command: system_cmd,
            }) => {
                return Self::handle_system_command(system_cmd);
            }
            Some(Commands::Start) | None => {}
        }

        let app = Self::init(&cli_config).await?;
        Self::start_server(app).await
    }

    async fn init(cli: &CliConfig) -> Result<Self> {
        let config = AppConfig::load(cli)?;
        let storage = AppStorage::init(&config).await?;
        let secrets = SecretManager::init(&storage, &config.secrets).await?;
        secrets.ensure_secrets().await?;

        let cache = Arc::new(
            CacheService::new(&config.cache)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to initialize cache service: {}", e))?,
        );
        tracing::debug!(backend = cache.backend_name(), "Cache initialized");

        let rate_limiter = Arc::new(RateLimiter::new(cache.clone()));

        let database = Arc::new(
            TransactionalService::init(config.transactional.backend, &storage, Some(&config.transactional.postgres))
                .await
                .map_err(anyhow::Error::from)?,
        );

        let auth = Arc::new(AuthManager::init(&secrets, &config.jwt).await?);

        let topics = Arc::new(
            TopicService::from_cache_config(&config.cache)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to initialize topic service: {}", e))?,
        );
        tracing::debug!(backend = topics.backend_name(), "Topics initialized");

        let broker = Arc::new(BrokerAdapter::new(
            topics.clone(),
            cache.clone(),
            config.broker.topic_messages.clone(),
        ));
        let connections = ConnectionManager::new(broker.clone());
        let aggregator = MetricsAggregator::new(
            broker.clone(),
            database.clone(),
            config.metrics.window_seconds,
            config.broker.consumer_group.clone(),
        );

        let shutdown = ShutdownService::new(topics.clone(), database.clone());

        Ok(Self {
            config,
            storage,
            secrets,
            database,
            auth,
            topics,
            shutdown,
            cache,
            rate_limiter,
            connections,
            broker,
            aggregator,
        })
    }

    fn handle_system_command(cmd: SystemCommands) -> Result<()> {
        match cmd {
            SystemCommands::Prune { yes } => Self::prune_data(yes),
        }
    }

    fn prune_data(skip_confirm: bool) -> Result<()> {
        let data_dir = AppStorage::resolve_data_dir();

        if !data_dir.exists() {
            println!(
                "Nothing to prune. Data directory does not exist: {}",
                data_dir.display()
            );
            return Ok(());
        }

        let data_dir = data_dir.canonicalize().unwrap_or(data_dir);

        println!("This will permanently delete the local data directory:");
        println!("  {}", data_dir.display());
        println!();
        println!(
            "Make sure the server is not running. \
             Deleting data while the server is running will cause data corruption."
        );

        if !skip_confirm {
            print!("\nContinue? [y/N] ");
            std::io::Write::flush(&mut std::io::stdout())?;

            let mut input = String::new();
            std::io::stdin().read_line(&mut input)?;

            if !matches!(input.trim().to_lowercase().as_str(), "y" | "yes") {
                println!("Aborted.");
                return Ok(());
            }
        }

        std::fs::remove_dir_all(&data_dir)
            .with_context(|| format!("Failed to delete data directory: {}", data_dir.display()))?;
        println!("Pruned: {}", data_dir.display());
        Ok(())
    }

    fn init_logging() {
        let default_filter = format!("info,{}=info", APP_NAME_LOWER);

        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or(default_filter);

        tracing_subscriber::fmt()
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_ansi(true)
            .compact()
            .with_env_filter(filter)
            .init();
    }

    async fn start_server(app: Self) -> Result<()> {
        // Install signal handlers FIRST (before any blocking calls)
        app.shutdown.install_signal_handlers();

        app.start_background_tasks().await?;

        banner::print_banner(
            &app.config.server.host,
            app.config.server.port,
            app.broker.backend_name(),
            &app.storage.data_dir().display().to_string(),
        );

        let server = ApiServer::new(app);
        let app = server.start().await?;
        app.shutdown.shutdown().await;

        Ok(())
    }

    pub async fn start_background_tasks(&self) -> Result<()> {
        self.shutdown
            .register(
                self.secrets
                    .start_health_check_task(self.shutdown.subscribe()),
            )
            .await;

        self.shutdown
            .register(
                self.database
                    .start_checkpoint_task(self.shutdown.subscribe()),
            )
            .await;

        self.shutdown
            .register(self.aggregator.spawn(self.shutdown.subscribe()))
            .await;

        tracing::debug!("Background tasks started");
        Ok(())
    }
}
