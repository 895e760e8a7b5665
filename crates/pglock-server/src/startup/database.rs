//! Database connection and schema migration at startup.

use pglock_migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection};
use tracing::{info, warn};

use crate::error::ServerError;
use crate::model::Configuration;

/// Connect to the lease database, retrying on failure.
///
/// Makes `db.connect.attempts` tries spaced by `db.connect.retry_interval_secs`
/// and fails with the last error once they are exhausted.
pub async fn connect(configuration: &Configuration) -> Result<DatabaseConnection, ServerError> {
    let attempts = configuration.db_connect_attempts()?;
    let retry_interval = configuration.db_connect_retry_interval()?;
    let options = configuration.connect_options()?;

    let mut attempt = 1;
    loop {
        match Database::connect(options.clone()).await {
            Ok(db) => {
                info!(attempt, "Connected to lease database");
                return Ok(db);
            }
            Err(e) if attempt < attempts => {
                warn!(
                    attempt,
                    attempts,
                    error = %e,
                    "Database connection failed, retrying in {:?}",
                    retry_interval
                );
                tokio::time::sleep(retry_interval).await;
                attempt += 1;
            }
            Err(e) => {
                return Err(ServerError::Connect {
                    attempts,
                    source: e,
                });
            }
        }
    }
}

/// Apply pending lease table migrations.
pub async fn migrate(db: &DatabaseConnection) -> Result<(), ServerError> {
    Migrator::up(db, None).await.map_err(ServerError::Migration)?;
    info!("Lease table migrations applied");
    Ok(())
}
