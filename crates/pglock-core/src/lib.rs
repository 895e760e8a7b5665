//! pglock Core - lease coordination over a transactional lease store
//!
//! This crate provides:
//! - `LockCoordinator`, which decides acquisition, renewal, takeover and release
//! - The object-safe `LeaseManager` handle used by the HTTP layer
//! - Clock abstraction, coordinator configuration and metrics

pub mod clock;
pub mod error;
pub mod metrics;
pub mod model;
pub mod service;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{LockError, LockResult};
pub use model::{
    AcquireOutcome, CoordinatorConfig, DEFAULT_LEASE_TTL, DEFAULT_STORE_TIMEOUT, LeaseStatus,
    RELEASE_REWIND,
};
pub use service::{LeaseManager, LockCoordinator, RowLeaseGuard};
