//! HTTP response types for the pglock server

use actix_web::{HttpResponse, HttpResponseBuilder, http::StatusCode};
use serde::{Deserialize, Serialize};

/// Error body returned by every failing endpoint
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorResult {
    pub timestamp: String,
    pub status: i32,
    pub error: String,
    pub message: String,
    pub path: String,
}

impl ErrorResult {
    pub fn new(status: StatusCode, message: &str, path: &str) -> Self {
        ErrorResult {
            timestamp: chrono::Utc::now().to_rfc3339(),
            status: status.as_u16() as i32,
            error: status.canonical_reason().unwrap_or_default().to_string(),
            message: message.to_string(),
            path: path.to_string(),
        }
    }

    pub fn http_response(status: StatusCode, message: &str, path: &str) -> HttpResponse {
        HttpResponseBuilder::new(status).json(ErrorResult::new(status, message, path))
    }

    pub fn bad_request(message: &str, path: &str) -> HttpResponse {
        Self::http_response(StatusCode::BAD_REQUEST, message, path)
    }

    pub fn not_found(message: &str, path: &str) -> HttpResponse {
        Self::http_response(StatusCode::NOT_FOUND, message, path)
    }

    pub fn service_unavailable(message: &str, path: &str) -> HttpResponse {
        Self::http_response(StatusCode::SERVICE_UNAVAILABLE, message, path)
    }
}
