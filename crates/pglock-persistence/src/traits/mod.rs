//! Lease store traits
//!
//! The store exposes primitives, not policy. All decisions about lease state
//! transitions belong to the coordinator built on top of these traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreResult;
use crate::model::Lease;

/// Durable, transactional home of lease rows.
#[async_trait]
pub trait LeaseStore: Send + Sync {
    /// Transaction handle produced by [`LeaseStore::begin`].
    type Transaction: LeaseTransaction;

    /// Open a new transaction.
    async fn begin(&self) -> StoreResult<Self::Transaction>;

    /// Rewrite `acquired_at` of the row for `resource_key` in a single
    /// statement, outside any transaction. Returns the number of rows affected.
    async fn rewind(&self, resource_key: &str, acquired_at: DateTime<Utc>) -> StoreResult<u64>;

    /// Like [`LeaseStore::rewind`], restricted to rows held by `holder_id`.
    async fn rewind_held(
        &self,
        resource_key: &str,
        holder_id: &str,
        acquired_at: DateTime<Utc>,
    ) -> StoreResult<u64>;

    /// Read the committed row for `resource_key` without locking it.
    async fn find(&self, resource_key: &str) -> StoreResult<Option<Lease>>;

    /// Verify the backend is reachable.
    async fn health_check(&self) -> StoreResult<()>;

    /// Remove every row. Test fixture support only.
    async fn truncate(&self) -> StoreResult<()>;
}

/// Primitives executed inside one store transaction.
///
/// A transaction that is dropped without [`commit`](LeaseTransaction::commit)
/// or [`rollback`](LeaseTransaction::rollback) is rolled back.
#[async_trait]
pub trait LeaseTransaction: Send {
    /// Take the row's exclusive lock without waiting.
    ///
    /// - `Ok(Some(lease))`: the row exists and is now locked by this transaction
    /// - `Ok(None)`: no row exists for the key
    /// - `Err(Contended)`: another transaction holds the row's lock
    async fn lock_row_for_update(&mut self, resource_key: &str) -> StoreResult<Option<Lease>>;

    /// Insert a new row. Fails with `Conflict` when the key already exists.
    async fn insert(
        &mut self,
        resource_key: &str,
        holder_id: &str,
        acquired_at: DateTime<Utc>,
    ) -> StoreResult<()>;

    /// Unconditionally rewrite holder and timestamp of the row.
    async fn update(
        &mut self,
        resource_key: &str,
        holder_id: &str,
        acquired_at: DateTime<Utc>,
    ) -> StoreResult<()>;

    /// Make this transaction's writes visible and release its row locks.
    async fn commit(self) -> StoreResult<()>;

    /// Discard this transaction's writes and release its row locks.
    async fn rollback(self) -> StoreResult<()>;
}
