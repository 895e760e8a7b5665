//! Scoped row lease guard
//!
//! Wraps the transaction that holds (or is about to take) the exclusive lock on
//! one lease row. The guard is finished by [`RowLeaseGuard::commit`] or
//! [`RowLeaseGuard::rollback`]; dropping an unfinished guard drops the
//! transaction, which rolls it back and releases the row lock.

use chrono::{DateTime, Utc};
use pglock_persistence::{Lease, LeaseStoreError, LeaseTransaction, StoreResult};
use tracing::debug;

pub struct RowLeaseGuard<T: LeaseTransaction> {
    tx: Option<T>,
    resource_key: String,
}

impl<T: LeaseTransaction> RowLeaseGuard<T> {
    pub fn new(tx: T, resource_key: &str) -> Self {
        Self {
            tx: Some(tx),
            resource_key: resource_key.to_string(),
        }
    }

    pub fn resource_key(&self) -> &str {
        &self.resource_key
    }

    fn tx(&mut self) -> StoreResult<&mut T> {
        self.tx.as_mut().ok_or_else(|| {
            LeaseStoreError::Unavailable("lease transaction already finished".to_string())
        })
    }

    /// Take the row's exclusive lock without waiting.
    pub async fn lock(&mut self) -> StoreResult<Option<Lease>> {
        let key = self.resource_key.clone();
        self.tx()?.lock_row_for_update(&key).await
    }

    pub async fn insert(&mut self, holder_id: &str, now: DateTime<Utc>) -> StoreResult<()> {
        let key = self.resource_key.clone();
        self.tx()?.insert(&key, holder_id, now).await
    }

    pub async fn update(&mut self, holder_id: &str, now: DateTime<Utc>) -> StoreResult<()> {
        let key = self.resource_key.clone();
        self.tx()?.update(&key, holder_id, now).await
    }

    pub async fn commit(mut self) -> StoreResult<()> {
        match self.tx.take() {
            Some(tx) => tx.commit().await,
            None => Ok(()),
        }
    }

    pub async fn rollback(mut self) -> StoreResult<()> {
        match self.tx.take() {
            Some(tx) => tx.rollback().await,
            None => Ok(()),
        }
    }
}

impl<T: LeaseTransaction> Drop for RowLeaseGuard<T> {
    fn drop(&mut self) {
        if self.tx.take().is_some() {
            debug!(
                resource_key = %self.resource_key,
                "Row lease guard dropped unfinished, transaction rolled back"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pglock_persistence::{LeaseStore, MemoryLeaseStore};

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    #[tokio::test]
    async fn test_commit_publishes_writes() {
        let store = MemoryLeaseStore::new();
        let mut guard = RowLeaseGuard::new(store.begin().await.unwrap(), "p1");
        assert_eq!(guard.resource_key(), "p1");
        assert!(guard.lock().await.unwrap().is_none());
        guard.insert("d1", ts(0)).await.unwrap();
        guard.commit().await.unwrap();

        assert_eq!(store.find("p1").await.unwrap().unwrap().holder_id, "d1");
    }

    #[tokio::test]
    async fn test_drop_releases_row_lock() {
        let store = MemoryLeaseStore::new();
        let mut seed = RowLeaseGuard::new(store.begin().await.unwrap(), "p1");
        seed.insert("d1", ts(0)).await.unwrap();
        seed.commit().await.unwrap();

        {
            let mut guard = RowLeaseGuard::new(store.begin().await.unwrap(), "p1");
            assert!(guard.lock().await.unwrap().is_some());
            guard.update("d2", ts(1)).await.unwrap();

            let mut other = RowLeaseGuard::new(store.begin().await.unwrap(), "p1");
            assert!(matches!(
                other.lock().await,
                Err(LeaseStoreError::Contended(_))
            ));
        }

        let mut guard = RowLeaseGuard::new(store.begin().await.unwrap(), "p1");
        let lease = guard.lock().await.unwrap().unwrap();
        assert_eq!(lease.holder_id, "d1");
        guard.rollback().await.unwrap();
    }
}
