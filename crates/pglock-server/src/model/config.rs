//! Configuration management for the pglock server
//!
//! Sources, lowest precedence first:
//! 1. `conf/application.yml` (or the file given with `--config`), optional
//! 2. Environment variables prefixed `PGLOCK__`, e.g. `PGLOCK__LOCK__TTL_SECS=60`
//! 3. Command line flags

use std::time::Duration;

use clap::Parser;
use config::{Config, Environment, File};
use pglock_core::CoordinatorConfig;
use pglock_persistence::StoreBackend;
use sea_orm::ConnectOptions;

use crate::error::ServerError;
use crate::startup::LoggingConfig;

use super::constants::*;

/// Command line arguments for the server
#[derive(Debug, Default, Parser)]
#[command(name = "pglock-server", version, about = "Lease lock service backed by PostgreSQL")]
pub struct Cli {
    /// Configuration file
    #[arg(short = 'c', long = "config", default_value = DEFAULT_CONFIG_FILE)]
    pub config_file: String,
    #[arg(long = "db-url", env = "DATABASE_URL")]
    pub database_url: Option<String>,
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,
    /// Lease TTL in seconds
    #[arg(long = "lease-ttl")]
    pub lease_ttl_secs: Option<u64>,
    /// Lease store backend: postgres or memory
    #[arg(long = "store")]
    pub store: Option<String>,
}

/// Application configuration loaded from config files, environment and CLI
#[derive(Clone, Debug, Default)]
pub struct Configuration {
    pub config: Config,
}

impl Configuration {
    /// Load configuration using the process command line.
    pub fn new() -> Result<Self, ServerError> {
        Self::from_cli(Cli::parse())
    }

    pub fn from_cli(args: Cli) -> Result<Self, ServerError> {
        let mut builder = Config::builder()
            .add_source(File::with_name(&args.config_file).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            );

        if let Some(v) = args.database_url {
            builder = builder.set_override(DB_URL, v)?;
        }
        if let Some(v) = args.port {
            builder = builder.set_override(SERVER_PORT, i64::from(v))?;
        }
        if let Some(v) = args.lease_ttl_secs {
            let v = i64::try_from(v)
                .map_err(|_| ServerError::invalid_setting(LOCK_TTL_SECS, "value out of range"))?;
            builder = builder.set_override(LOCK_TTL_SECS, v)?;
        }
        if let Some(v) = args.store {
            builder = builder.set_override(LOCK_STORE, v)?;
        }

        Ok(Configuration {
            config: builder.build()?,
        })
    }

    pub fn from_config(config: Config) -> Self {
        Configuration { config }
    }

    fn get_u64(&self, key: &str, default: u64) -> Result<u64, ServerError> {
        match self.config.get_int(key) {
            Ok(v) => u64::try_from(v).map_err(|_| {
                ServerError::invalid_setting(key, format!("must not be negative, got {v}"))
            }),
            Err(config::ConfigError::NotFound(_)) => Ok(default),
            Err(e) => Err(e.into()),
        }
    }

    fn get_u32(&self, key: &str, default: u32) -> Result<u32, ServerError> {
        let v = self.get_u64(key, u64::from(default))?;
        u32::try_from(v).map_err(|_| ServerError::invalid_setting(key, "value out of range"))
    }

    // ========================================================================
    // Server Configuration
    // ========================================================================

    pub fn server_address(&self) -> String {
        self.config
            .get_string(SERVER_ADDRESS)
            .unwrap_or(DEFAULT_SERVER_ADDRESS.to_string())
    }

    pub fn server_port(&self) -> u16 {
        self.config
            .get_int(SERVER_PORT)
            .ok()
            .and_then(|v| u16::try_from(v).ok())
            .unwrap_or(DEFAULT_SERVER_PORT)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        self.config
            .get_int(SERVER_SHUTDOWN_TIMEOUT_SECS)
            .ok()
            .and_then(|v| u64::try_from(v).ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT)
    }

    // ========================================================================
    // Lock Configuration
    // ========================================================================

    pub fn store_backend(&self) -> Result<StoreBackend, ServerError> {
        match self.config.get_string(LOCK_STORE) {
            Ok(v) => v
                .to_lowercase()
                .parse()
                .map_err(|e: String| ServerError::invalid_setting(LOCK_STORE, e)),
            Err(config::ConfigError::NotFound(_)) => Ok(StoreBackend::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn lease_ttl(&self) -> Result<Duration, ServerError> {
        self.get_u64(LOCK_TTL_SECS, pglock_core::DEFAULT_LEASE_TTL.as_secs())
            .map(Duration::from_secs)
    }

    pub fn store_timeout(&self) -> Result<Duration, ServerError> {
        self.get_u64(
            LOCK_STORE_TIMEOUT_MS,
            pglock_core::DEFAULT_STORE_TIMEOUT.as_millis() as u64,
        )
        .map(Duration::from_millis)
    }

    /// Coordinator settings, validated.
    pub fn coordinator_config(&self) -> Result<CoordinatorConfig, ServerError> {
        let config = CoordinatorConfig::new(self.lease_ttl()?, self.store_timeout()?);
        config.validate()?;
        Ok(config)
    }

    // ========================================================================
    // Database Configuration
    // ========================================================================

    pub fn db_url(&self) -> String {
        self.config
            .get_string(DB_URL)
            .unwrap_or(DEFAULT_DB_URL.to_string())
    }

    pub fn db_migrate(&self) -> bool {
        self.config.get_bool(DB_MIGRATE).unwrap_or(true)
    }

    pub fn db_connect_attempts(&self) -> Result<u32, ServerError> {
        Ok(self.get_u32(DB_CONNECT_ATTEMPTS, 10)?.max(1))
    }

    pub fn db_connect_retry_interval(&self) -> Result<Duration, ServerError> {
        self.get_u64(DB_CONNECT_RETRY_INTERVAL_SECS, 2)
            .map(Duration::from_secs)
    }

    /// Connection pool options for the lease database.
    pub fn connect_options(&self) -> Result<ConnectOptions, ServerError> {
        let max_connections = self.get_u32(DB_POOL_MAX_CONNECTIONS, 10)?;
        let min_connections = self.get_u32(DB_POOL_MIN_CONNECTIONS, 1)?;
        let connect_timeout = self.get_u64(DB_POOL_CONNECT_TIMEOUT_SECS, 30)?;
        let acquire_timeout = self.get_u64(DB_POOL_ACQUIRE_TIMEOUT_SECS, 8)?;
        let sqlx_logging = self
            .config
            .get_bool(DB_POOL_SQLX_LOGGING)
            .unwrap_or(false);

        let mut opt = ConnectOptions::new(self.db_url());

        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(connect_timeout))
            .acquire_timeout(Duration::from_secs(acquire_timeout))
            .sqlx_logging(sqlx_logging)
            .sqlx_logging_level(tracing::log::LevelFilter::Debug);

        tracing::info!(
            max_connections = max_connections,
            min_connections = min_connections,
            connect_timeout = connect_timeout,
            acquire_timeout = acquire_timeout,
            "Database pool configured"
        );

        Ok(opt)
    }

    // ========================================================================
    // Observability Configuration
    // ========================================================================

    pub fn logging_config(&self) -> LoggingConfig {
        LoggingConfig::from_config(
            self.config.get_string(LOGGING_DIR).ok(),
            self.config.get_bool(LOGGING_CONSOLE).unwrap_or(true),
            self.config.get_bool(LOGGING_FILE).unwrap_or(false),
            self.config
                .get_string(LOGGING_LEVEL)
                .unwrap_or("info".to_string()),
            self.config
                .get_string(LOGGING_ROTATION)
                .unwrap_or("daily".to_string()),
        )
    }

    pub fn metrics_enabled(&self) -> bool {
        self.config.get_bool(METRICS_ENABLED).unwrap_or(true)
    }
}
