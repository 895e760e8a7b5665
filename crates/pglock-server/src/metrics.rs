// Prometheus exposition of the metrics recorded through the `metrics` facade

use std::sync::OnceLock;

use actix_web::{HttpResponse, Resource, web};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::error::ServerError;

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the global Prometheus recorder and register metric descriptions.
/// Should be called once at application startup
pub fn init_metrics() -> Result<(), ServerError> {
    if PROMETHEUS_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| ServerError::Metrics(e.to_string()))?;
    let _ = PROMETHEUS_HANDLE.set(handle);

    pglock_core::metrics::describe_metrics();
    tracing::info!("Metrics initialized");
    Ok(())
}

/// Render the current metrics in the Prometheus text format.
///
/// Empty when no recorder is installed.
pub fn render() -> String {
    PROMETHEUS_HANDLE
        .get()
        .map(PrometheusHandle::render)
        .unwrap_or_default()
}

async fn metrics_handler() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(render())
}

/// GET /metrics
pub fn route() -> Resource {
    web::resource("/metrics").route(web::get().to(metrics_handler))
}
