//! Domain model types shared by all lease store backends

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::lease;

/// A committed (or transaction-local) lease row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lease {
    pub id: i32,
    pub resource_key: String,
    pub holder_id: String,
    pub acquired_at: DateTime<Utc>,
}

impl Lease {
    /// Time elapsed since the lease was last confirmed, as seen at `now`.
    ///
    /// Negative when `acquired_at` lies in the future of `now` (clock skew
    /// between service instances).
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now.signed_duration_since(self.acquired_at)
    }
}

impl From<lease::Model> for Lease {
    fn from(model: lease::Model) -> Self {
        Self {
            id: model.id,
            resource_key: model.resource_key,
            holder_id: model.holder_id,
            acquired_at: model.acquired_at.with_timezone(&Utc),
        }
    }
}

/// Lease store backend selection
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreBackend {
    /// PostgreSQL via SeaORM
    #[default]
    Postgres,
    /// In-process store, for tests and local runs without a database
    Memory,
}

impl std::fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreBackend::Postgres => write!(f, "postgres"),
            StoreBackend::Memory => write!(f, "memory"),
        }
    }
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            _ => Err(format!("Invalid store backend: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};

    #[test]
    fn test_lease_age() {
        let acquired_at = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let lease = Lease {
            id: 1,
            resource_key: "p1".to_string(),
            holder_id: "d1".to_string(),
            acquired_at,
        };

        let now = acquired_at + chrono::Duration::seconds(7);
        assert_eq!(lease.age(now), chrono::Duration::seconds(7));
        assert!(lease.age(acquired_at - chrono::Duration::seconds(1)) < chrono::Duration::zero());
    }

    #[test]
    fn test_from_model_normalizes_timezone() {
        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        let acquired_at = offset.with_ymd_and_hms(2024, 1, 1, 14, 0, 0).unwrap();
        let lease = Lease::from(lease::Model {
            id: 3,
            resource_key: "p1".to_string(),
            holder_id: "d1".to_string(),
            acquired_at,
        });

        assert_eq!(lease.acquired_at, Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_store_backend_round_trip() {
        assert_eq!("postgres".parse::<StoreBackend>(), Ok(StoreBackend::Postgres));
        assert_eq!("postgresql".parse::<StoreBackend>(), Ok(StoreBackend::Postgres));
        assert_eq!("memory".parse::<StoreBackend>(), Ok(StoreBackend::Memory));
        assert!("rocksdb".parse::<StoreBackend>().is_err());
        assert_eq!(StoreBackend::Memory.to_string(), "memory");
    }
}
