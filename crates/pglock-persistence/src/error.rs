//! Error classification for lease store primitives.

use thiserror::Error;

/// Result type for lease store primitives.
pub type StoreResult<T> = Result<T, LeaseStoreError>;

/// Failures a lease store primitive can report.
///
/// `Contended` and `Conflict` are expected race outcomes that callers turn into
/// a denial. Everything else is `Unavailable`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LeaseStoreError {
    /// The row is exclusively locked by another in-flight transaction.
    #[error("lease row for '{0}' is locked by another transaction")]
    Contended(String),

    /// A row for the key already exists (unique constraint on `resource_key`).
    #[error("lease row for '{0}' already exists")]
    Conflict(String),

    /// Connectivity, timeout or any unexpected backend failure.
    #[error("lease store unavailable: {0}")]
    Unavailable(String),
}

impl LeaseStoreError {
    /// Whether this failure is a lost race rather than a store failure.
    pub fn is_race(&self) -> bool {
        matches!(self, Self::Contended(_) | Self::Conflict(_))
    }
}
