//! V1 Health API handler

use actix_web::{HttpRequest, HttpResponse, get, web};
use tracing::warn;

use crate::model::{AppState, ErrorResult};

use super::model::HealthResponse;

/// Report whether the lease store answers
///
/// GET /v1/health
#[get("/health")]
pub async fn health(req: HttpRequest, data: web::Data<AppState>) -> HttpResponse {
    match data.lease_manager.health_check().await {
        Ok(()) => HttpResponse::Ok().json(HealthResponse {
            status: "UP".to_string(),
        }),
        Err(e) => {
            warn!(error = %e, "Health check failed");
            ErrorResult::service_unavailable(&e.to_string(), req.path())
        }
    }
}
