//! Error types for lease coordination.
//!
//! Lost races (`Contended`, `Conflict`) never reach this level: the coordinator
//! turns them into [`AcquireOutcome::NotGranted`](crate::AcquireOutcome).

use pglock_persistence::LeaseStoreError;
use thiserror::Error;

/// Result type for coordinator operations.
pub type LockResult<T> = Result<T, LockError>;

/// Errors surfaced by the coordinator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LockError {
    /// Store connectivity, deadline or unexpected backend failure
    #[error("lock store unavailable: {0}")]
    Unavailable(String),

    /// Coordinator configuration rejected at construction
    #[error("invalid lock configuration: {0}")]
    InvalidConfig(String),
}

impl From<LeaseStoreError> for LockError {
    fn from(err: LeaseStoreError) -> Self {
        match err {
            LeaseStoreError::Unavailable(msg) => LockError::Unavailable(msg),
            other => LockError::Unavailable(other.to_string()),
        }
    }
}
