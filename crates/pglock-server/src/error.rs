//! Startup and wiring errors for the pglock server.
//!
//! Request-time failures never use this type; handlers map
//! [`LockError`](pglock_core::LockError) straight to HTTP responses.

use pglock_core::LockError;
use sea_orm::DbErr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("invalid setting '{key}': {message}")]
    InvalidSetting { key: String, message: String },

    #[error(transparent)]
    Lock(#[from] LockError),

    #[error("database connection failed after {attempts} attempt(s): {source}")]
    Connect {
        attempts: u32,
        #[source]
        source: DbErr,
    },

    #[error("database migration failed: {0}")]
    Migration(#[source] DbErr),

    #[error("logging initialization failed: {0}")]
    Logging(String),

    #[error("metrics initialization failed: {0}")]
    Metrics(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ServerError {
    pub fn invalid_setting(key: &str, message: impl Into<String>) -> Self {
        ServerError::InvalidSetting {
            key: key.to_string(),
            message: message.into(),
        }
    }
}
