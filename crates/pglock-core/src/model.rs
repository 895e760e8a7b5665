//! Coordinator configuration and outcome types

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::{LockError, LockResult};

/// Lease TTL used when none is configured.
pub const DEFAULT_LEASE_TTL: Duration = Duration::from_secs(300);

/// Per-operation store deadline used when none is configured.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// How far into the past a release rewinds `acquired_at`.
///
/// Must exceed every accepted TTL so a released lease is stale immediately.
pub const RELEASE_REWIND: Duration = Duration::from_secs(10 * 60 * 60);

/// Result of an acquisition attempt
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AcquireOutcome {
    Granted,
    NotGranted,
}

impl AcquireOutcome {
    pub fn is_granted(&self) -> bool {
        matches!(self, AcquireOutcome::Granted)
    }
}

/// Coordinator settings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// How long a lease stays live without renewal
    pub lease_ttl: Duration,
    /// Deadline for every individual store operation
    pub store_timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            lease_ttl: DEFAULT_LEASE_TTL,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }
}

impl CoordinatorConfig {
    pub fn new(lease_ttl: Duration, store_timeout: Duration) -> Self {
        Self {
            lease_ttl,
            store_timeout,
        }
    }

    pub fn with_lease_ttl(mut self, lease_ttl: Duration) -> Self {
        self.lease_ttl = lease_ttl;
        self
    }

    pub fn with_store_timeout(mut self, store_timeout: Duration) -> Self {
        self.store_timeout = store_timeout;
        self
    }

    pub fn validate(&self) -> LockResult<()> {
        if self.lease_ttl.is_zero() {
            return Err(LockError::InvalidConfig(
                "lease TTL must be greater than zero".to_string(),
            ));
        }
        if self.lease_ttl >= RELEASE_REWIND {
            return Err(LockError::InvalidConfig(format!(
                "lease TTL of {}s must be below the release rewind of {}s",
                self.lease_ttl.as_secs(),
                RELEASE_REWIND.as_secs()
            )));
        }
        if self.store_timeout.is_zero() {
            return Err(LockError::InvalidConfig(
                "store timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Point-in-time view of a lease row
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeaseStatus {
    pub resource_key: String,
    pub holder_id: String,
    pub acquired_at: DateTime<Utc>,
    /// Whether the lease was live when inspected
    pub live: bool,
    /// Time left before the lease turns stale; zero once stale
    pub remaining: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CoordinatorConfig::default();
        assert_eq!(config.lease_ttl, Duration::from_secs(300));
        assert_eq!(config.store_timeout, Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let config = CoordinatorConfig::default().with_lease_ttl(Duration::ZERO);
        assert!(matches!(config.validate(), Err(LockError::InvalidConfig(_))));
    }

    #[test]
    fn test_ttl_must_stay_below_release_rewind() {
        let config = CoordinatorConfig::default().with_lease_ttl(RELEASE_REWIND);
        assert!(config.validate().is_err());

        let config = CoordinatorConfig::default()
            .with_lease_ttl(RELEASE_REWIND - Duration::from_secs(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_store_timeout_rejected() {
        let config = CoordinatorConfig::default().with_store_timeout(Duration::ZERO);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_outcome_is_granted() {
        assert!(AcquireOutcome::Granted.is_granted());
        assert!(!AcquireOutcome::NotGranted.is_granted());
    }
}
