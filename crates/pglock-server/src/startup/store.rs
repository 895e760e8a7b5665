//! Lease store selection and coordinator wiring.

use std::sync::Arc;

use pglock_core::{LeaseManager, LockCoordinator};
use pglock_persistence::{MemoryLeaseStore, SqlLeaseStore, StoreBackend};
use tracing::{info, warn};

use crate::error::ServerError;
use crate::model::Configuration;

use super::database;

/// Build the lease manager for the configured backend.
///
/// For PostgreSQL this connects (with retries) and runs migrations unless
/// `db.migrate` is disabled.
pub async fn lease_manager(
    configuration: &Configuration,
) -> Result<Arc<dyn LeaseManager>, ServerError> {
    let coordinator_config = configuration.coordinator_config()?;
    let backend = configuration.store_backend()?;
    info!(
        backend = %backend,
        lease_ttl_secs = coordinator_config.lease_ttl.as_secs(),
        store_timeout_ms = coordinator_config.store_timeout.as_millis() as u64,
        "Lease store selected"
    );

    let manager: Arc<dyn LeaseManager> = match backend {
        StoreBackend::Postgres => {
            let db = database::connect(configuration).await?;
            if configuration.db_migrate() {
                database::migrate(&db).await?;
            }
            Arc::new(LockCoordinator::new(
                Arc::new(SqlLeaseStore::new(db)),
                coordinator_config,
            )?)
        }
        StoreBackend::Memory => {
            warn!("Using the in-memory lease store; leases are not shared between instances");
            Arc::new(LockCoordinator::new(
                Arc::new(MemoryLeaseStore::new()),
                coordinator_config,
            )?)
        }
    };

    Ok(manager)
}
