//! V1 Lock API handlers
//!
//! - POST /v1/lock - Acquire or renew the lease of a profile for a device
//! - DELETE /v1/lock - Release the lease of a profile
//! - GET /v1/lock/{profileId} - Inspect the lease of a profile

use actix_web::{HttpRequest, HttpResponse, delete, get, post, web};
use pglock_core::{AcquireOutcome, LockError};
use tracing::{debug, warn};

use crate::model::{AppState, ErrorResult};

use super::model::{LockRequest, LockResponse, LockStatusResponse};

fn lock_error_response(err: &LockError, path: &str) -> HttpResponse {
    match err {
        LockError::Unavailable(_) => ErrorResult::service_unavailable(&err.to_string(), path),
        LockError::InvalidConfig(_) => ErrorResult::http_response(
            actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
            &err.to_string(),
            path,
        ),
    }
}

/// Acquire or renew a lock
///
/// POST /v1/lock
///
/// Granted: 200 with the lease TTL. Held by another device, or decided
/// concurrently by another request: 400.
#[post("")]
pub async fn acquire_lock(
    req: HttpRequest,
    data: web::Data<AppState>,
    body: web::Json<LockRequest>,
) -> HttpResponse {
    let LockRequest {
        profile_id,
        device_id,
    } = body.into_inner();

    if profile_id.is_empty() {
        return ErrorResult::bad_request("Required field 'profileId' is missing", req.path());
    }
    if device_id.is_empty() {
        return ErrorResult::bad_request("Required field 'deviceId' is missing", req.path());
    }

    match data
        .lease_manager
        .attempt_acquire(&profile_id, &device_id)
        .await
    {
        Ok(AcquireOutcome::Granted) => HttpResponse::Ok().json(LockResponse {
            ttl: data.lease_manager.lease_ttl().as_secs(),
            profile_id,
            device_id,
        }),
        Ok(AcquireOutcome::NotGranted) => {
            debug!(profile_id = %profile_id, device_id = %device_id, "Lock not granted");
            ErrorResult::bad_request(
                &format!("Lock for profile '{}' is held by another device", profile_id),
                req.path(),
            )
        }
        Err(e) => {
            warn!(profile_id = %profile_id, error = %e, "Lock acquisition failed");
            lock_error_response(&e, req.path())
        }
    }
}

/// Release a lock
///
/// DELETE /v1/lock
///
/// Without `deviceId` the lease is released whoever holds it; with it, only
/// when that device holds it. 200 when a lease row was rewound, 404 otherwise.
#[delete("")]
pub async fn release_lock(
    req: HttpRequest,
    data: web::Data<AppState>,
    body: web::Json<LockRequest>,
) -> HttpResponse {
    let LockRequest {
        profile_id,
        device_id,
    } = body.into_inner();

    if profile_id.is_empty() {
        return ErrorResult::bad_request("Required field 'profileId' is missing", req.path());
    }

    let result = if device_id.is_empty() {
        data.lease_manager.release(&profile_id).await
    } else {
        data.lease_manager.release_held(&profile_id, &device_id).await
    };

    match result {
        Ok(rows) if rows > 0 => HttpResponse::Ok().finish(),
        Ok(_) => ErrorResult::not_found(
            &format!("No lock found for profile '{}'", profile_id),
            req.path(),
        ),
        Err(e) => {
            warn!(profile_id = %profile_id, error = %e, "Lock release failed");
            lock_error_response(&e, req.path())
        }
    }
}

/// Inspect a lock
///
/// GET /v1/lock/{profileId}
#[get("/{profile_id}")]
pub async fn lock_status(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> HttpResponse {
    let profile_id = path.into_inner();

    match data.lease_manager.inspect(&profile_id).await {
        Ok(Some(status)) => HttpResponse::Ok().json(LockStatusResponse::from(status)),
        Ok(None) => ErrorResult::not_found(
            &format!("No lock found for profile '{}'", profile_id),
            req.path(),
        ),
        Err(e) => lock_error_response(&e, req.path()),
    }
}
