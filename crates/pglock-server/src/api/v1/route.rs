//! V1 API routing configuration

use actix_web::{HttpRequest, Scope, error, web};

use crate::model::{ErrorResult, constants::PARSE_ERROR_PREFIX};

use super::{health, lock};

/// JSON body settings for the lock endpoints.
///
/// Bodies are accepted without a JSON content type; undecodable bodies get a
/// 400 in the `ErrorResult` envelope.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .content_type_required(false)
        .error_handler(|err, req: &HttpRequest| {
            let message = format!("{}: {}", PARSE_ERROR_PREFIX, err);
            let response = ErrorResult::bad_request(&message, req.path());
            error::InternalError::from_response(err, response).into()
        })
}

/// Create the V1 routes
///
/// Routes:
/// - POST /v1/lock - Acquire or renew a lock
/// - DELETE /v1/lock - Release a lock
/// - GET /v1/lock/{profileId} - Inspect a lock
/// - GET /v1/health - Store health
pub fn routes() -> Scope {
    web::scope("/v1")
        .app_data(json_config())
        .service(
            web::scope("/lock")
                .service(lock::acquire_lock)
                .service(lock::release_lock)
                .service(lock::lock_status),
        )
        .service(health::health)
}
