// Lease coordination services

pub mod coordinator;
pub mod guard;

use std::time::Duration;

use async_trait::async_trait;
use pglock_persistence::LeaseStore;

use crate::error::LockResult;
use crate::model::{AcquireOutcome, LeaseStatus};

pub use coordinator::LockCoordinator;
pub use guard::RowLeaseGuard;

/// Object-safe lease manager, the handle shared by request handlers.
#[async_trait]
pub trait LeaseManager: Send + Sync {
    /// Try to take or renew the lease on `resource_key` for `holder_id`.
    async fn attempt_acquire(
        &self,
        resource_key: &str,
        holder_id: &str,
    ) -> LockResult<AcquireOutcome>;

    /// Force the lease stale regardless of holder. Returns rows affected.
    async fn release(&self, resource_key: &str) -> LockResult<u64>;

    /// Force the lease stale only when `holder_id` holds it. Returns rows affected.
    async fn release_held(&self, resource_key: &str, holder_id: &str) -> LockResult<u64>;

    async fn inspect(&self, resource_key: &str) -> LockResult<Option<LeaseStatus>>;

    async fn health_check(&self) -> LockResult<()>;

    /// Configured lease TTL
    fn lease_ttl(&self) -> Duration;
}

#[async_trait]
impl<S: LeaseStore + 'static> LeaseManager for LockCoordinator<S> {
    async fn attempt_acquire(
        &self,
        resource_key: &str,
        holder_id: &str,
    ) -> LockResult<AcquireOutcome> {
        LockCoordinator::attempt_acquire(self, resource_key, holder_id).await
    }

    async fn release(&self, resource_key: &str) -> LockResult<u64> {
        LockCoordinator::release(self, resource_key).await
    }

    async fn release_held(&self, resource_key: &str, holder_id: &str) -> LockResult<u64> {
        LockCoordinator::release_held(self, resource_key, holder_id).await
    }

    async fn inspect(&self, resource_key: &str) -> LockResult<Option<LeaseStatus>> {
        LockCoordinator::inspect(self, resource_key).await
    }

    async fn health_check(&self) -> LockResult<()> {
        LockCoordinator::health_check(self).await
    }

    fn lease_ttl(&self) -> Duration {
        self.config().lease_ttl
    }
}
