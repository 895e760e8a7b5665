//! Request and response bodies of the v1 lock API

use pglock_core::LeaseStatus;
use serde::{Deserialize, Serialize};

/// Body of `POST /v1/lock` and `DELETE /v1/lock`
///
/// Missing fields decode as empty strings and are rejected by the handlers,
/// except `deviceId` on `DELETE`, where it is optional.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockRequest {
    #[serde(default)]
    pub profile_id: String,
    #[serde(default)]
    pub device_id: String,
}

/// Body of a granted `POST /v1/lock`
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockResponse {
    pub profile_id: String,
    pub device_id: String,
    /// Lease TTL in seconds; renew before it elapses
    pub ttl: u64,
}

/// Body of `GET /v1/lock/{profileId}`
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockStatusResponse {
    pub profile_id: String,
    pub device_id: String,
    pub acquired_at: String,
    pub live: bool,
    /// Seconds until the lease turns stale, 0 once stale
    pub remaining_ttl: u64,
}

impl From<LeaseStatus> for LockStatusResponse {
    fn from(status: LeaseStatus) -> Self {
        Self {
            profile_id: status.resource_key,
            device_id: status.holder_id,
            acquired_at: status.acquired_at.to_rfc3339(),
            live: status.live,
            remaining_ttl: status.remaining.as_secs(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}
