//! Main entry point for the pglock server.

use std::sync::Arc;

use anyhow::Context;
use pglock_server::{
    metrics,
    model::{AppState, Configuration},
    startup,
};
use tracing::info;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let configuration = Configuration::new().context("Failed to load configuration")?;

    let _logging_guard = startup::init_logging(&configuration.logging_config())?;

    if configuration.metrics_enabled() {
        metrics::init_metrics()?;
    }

    let lease_manager = startup::lease_manager(&configuration)
        .await
        .context("Failed to initialize the lease store")?;

    let address = configuration.server_address();
    let port = configuration.server_port();
    let app_state = Arc::new(AppState::new(configuration, lease_manager));

    info!("Starting pglock server on {}:{}", address, port);

    startup::main_server(app_state)
        .with_context(|| format!("Failed to bind {}:{}", address, port))?
        .await?;

    info!("pglock server stopped");
    Ok(())
}
