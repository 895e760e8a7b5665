//! Lease coordinator
//!
//! Every decision is evaluated fresh against the store; the coordinator keeps
//! no lease state between calls, so any number of service instances may share
//! one database. Per key, the fail-fast row lock serializes decisions:
//!
//! | Row state          | Decision                                   |
//! |--------------------|--------------------------------------------|
//! | locked elsewhere   | not granted                                |
//! | missing            | insert; a lost insert race is not granted  |
//! | held by the caller | refresh `acquired_at`, granted             |
//! | stale              | reassign to the caller, granted            |
//! | live, other holder | not granted                                |

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use pglock_persistence::{LeaseStore, LeaseStoreError, StoreResult};
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::{LockError, LockResult};
use crate::metrics;
use crate::model::{AcquireOutcome, CoordinatorConfig, LeaseStatus, RELEASE_REWIND};

use super::guard::RowLeaseGuard;

/// How a granted acquisition changed the row
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Transition {
    Created,
    Renewed,
    TakenOver,
}

/// Why an acquisition was not granted
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Denial {
    HeldByOther,
    Contended,
    LostInsertRace,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Decision {
    Granted(Transition),
    Denied(Denial),
}

impl Decision {
    fn label(&self) -> &'static str {
        match self {
            Decision::Granted(Transition::Created) => "created",
            Decision::Granted(Transition::Renewed) => "renewed",
            Decision::Granted(Transition::TakenOver) => "taken_over",
            Decision::Denied(Denial::HeldByOther) => "held_by_other",
            Decision::Denied(Denial::Contended) => "contended",
            Decision::Denied(Denial::LostInsertRace) => "lost_insert_race",
        }
    }

    fn outcome(&self) -> AcquireOutcome {
        match self {
            Decision::Granted(_) => AcquireOutcome::Granted,
            Decision::Denied(_) => AcquireOutcome::NotGranted,
        }
    }
}

/// Map a lost race onto a denial; anything else stays an error.
fn race_denial(err: &LeaseStoreError) -> Option<Denial> {
    match err {
        LeaseStoreError::Contended(_) => Some(Denial::Contended),
        LeaseStoreError::Conflict(_) => Some(Denial::LostInsertRace),
        LeaseStoreError::Unavailable(_) => None,
    }
}

/// Lease-based lock coordinator over a transactional [`LeaseStore`].
pub struct LockCoordinator<S: LeaseStore> {
    store: Arc<S>,
    config: CoordinatorConfig,
    lease_ttl: chrono::Duration,
    release_rewind: chrono::Duration,
    clock: Arc<dyn Clock>,
}

impl<S: LeaseStore> LockCoordinator<S> {
    /// Create a coordinator using the system clock.
    ///
    /// Fails with [`LockError::InvalidConfig`] when the configuration is rejected.
    pub fn new(store: Arc<S>, config: CoordinatorConfig) -> LockResult<Self> {
        config.validate()?;
        let lease_ttl = chrono::Duration::from_std(config.lease_ttl)
            .map_err(|e| LockError::InvalidConfig(format!("lease TTL out of range: {e}")))?;
        let release_rewind = chrono::Duration::from_std(RELEASE_REWIND)
            .map_err(|e| LockError::InvalidConfig(format!("release rewind out of range: {e}")))?;

        Ok(Self {
            store,
            config,
            lease_ttl,
            release_rewind,
            clock: Arc::new(SystemClock),
        })
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Run one store operation under the configured deadline.
    async fn bounded<T, F>(&self, operation: &'static str, fut: F) -> StoreResult<T>
    where
        F: Future<Output = StoreResult<T>>,
    {
        let result = match tokio::time::timeout(self.config.store_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(LeaseStoreError::Unavailable(format!(
                "{operation} exceeded deadline of {:?}",
                self.config.store_timeout
            ))),
        };
        if let Err(LeaseStoreError::Unavailable(reason)) = &result {
            warn!(operation, reason = %reason, "Lease store operation failed");
            metrics::record_store_error(operation);
        }
        result
    }

    /// Roll back without surfacing rollback failures; the decision already stands.
    async fn abort(&self, guard: RowLeaseGuard<S::Transaction>) {
        let key = guard.resource_key().to_string();
        if let Err(e) = self.bounded("rollback", guard.rollback()).await {
            debug!(resource_key = %key, error = %e, "Rollback failed, transaction discarded");
        }
    }

    async fn decide(&self, resource_key: &str, holder_id: &str) -> StoreResult<Decision> {
        let tx = self.bounded("begin", self.store.begin()).await?;
        let mut guard = RowLeaseGuard::new(tx, resource_key);

        let current = match self.bounded("lock_row", guard.lock()).await {
            Ok(current) => current,
            Err(e) => {
                self.abort(guard).await;
                return match race_denial(&e) {
                    Some(denial) => Ok(Decision::Denied(denial)),
                    None => Err(e),
                };
            }
        };

        // Sampled after the row lock is held, so queued callers never judge
        // staleness with an earlier instant.
        let now = self.clock.now();

        let transition = match current {
            None => {
                if let Err(e) = self.bounded("insert", guard.insert(holder_id, now)).await {
                    self.abort(guard).await;
                    return match race_denial(&e) {
                        Some(denial) => Ok(Decision::Denied(denial)),
                        None => Err(e),
                    };
                }
                Transition::Created
            }
            Some(lease) => {
                let transition = if lease.holder_id == holder_id {
                    Transition::Renewed
                } else if lease.age(now) > self.lease_ttl {
                    Transition::TakenOver
                } else {
                    self.abort(guard).await;
                    return Ok(Decision::Denied(Denial::HeldByOther));
                };

                if let Err(e) = self.bounded("update", guard.update(holder_id, now)).await {
                    self.abort(guard).await;
                    return match race_denial(&e) {
                        Some(denial) => Ok(Decision::Denied(denial)),
                        None => Err(e),
                    };
                }
                transition
            }
        };

        self.bounded("commit", guard.commit()).await?;
        Ok(Decision::Granted(transition))
    }

    /// Try to take or renew the lease on `resource_key` for `holder_id`.
    pub async fn attempt_acquire(
        &self,
        resource_key: &str,
        holder_id: &str,
    ) -> LockResult<AcquireOutcome> {
        let started = Instant::now();
        match self.decide(resource_key, holder_id).await {
            Ok(decision) => {
                metrics::record_acquire(decision.label(), started.elapsed());
                match decision {
                    Decision::Granted(Transition::TakenOver) => info!(
                        resource_key = %resource_key,
                        holder_id = %holder_id,
                        "Stale lease taken over"
                    ),
                    _ => debug!(
                        resource_key = %resource_key,
                        holder_id = %holder_id,
                        decision = decision.label(),
                        "Lease acquisition decided"
                    ),
                }
                Ok(decision.outcome())
            }
            Err(e) => {
                metrics::record_acquire("unavailable", started.elapsed());
                Err(e.into())
            }
        }
    }

    /// Force the lease on `resource_key` stale, whoever holds it.
    ///
    /// Returns the number of rows affected: 0 when the key has no lease row.
    pub async fn release(&self, resource_key: &str) -> LockResult<u64> {
        let rewound_to = self.clock.now() - self.release_rewind;
        let rows = self
            .bounded("rewind", self.store.rewind(resource_key, rewound_to))
            .await?;
        metrics::record_release(rows);
        info!(resource_key = %resource_key, rows, "Lease released");
        Ok(rows)
    }

    /// Force the lease on `resource_key` stale only if `holder_id` holds it.
    pub async fn release_held(&self, resource_key: &str, holder_id: &str) -> LockResult<u64> {
        let rewound_to = self.clock.now() - self.release_rewind;
        let rows = self
            .bounded(
                "rewind_held",
                self.store.rewind_held(resource_key, holder_id, rewound_to),
            )
            .await?;
        metrics::record_release(rows);
        info!(
            resource_key = %resource_key,
            holder_id = %holder_id,
            rows,
            "Held lease released"
        );
        Ok(rows)
    }

    /// Committed state of the lease on `resource_key`, judged at the current instant.
    pub async fn inspect(&self, resource_key: &str) -> LockResult<Option<LeaseStatus>> {
        let Some(lease) = self.bounded("find", self.store.find(resource_key)).await? else {
            return Ok(None);
        };

        let age = lease.age(self.clock.now());
        let live = age <= self.lease_ttl;
        let remaining = (self.lease_ttl - age.max(chrono::Duration::zero()))
            .to_std()
            .unwrap_or(Duration::ZERO);

        Ok(Some(LeaseStatus {
            resource_key: lease.resource_key,
            holder_id: lease.holder_id,
            acquired_at: lease.acquired_at,
            live,
            remaining: if live { remaining } else { Duration::ZERO },
        }))
    }

    pub async fn health_check(&self) -> LockResult<()> {
        self.bounded("health_check", self.store.health_check())
            .await
            .map_err(LockError::from)
    }
}
