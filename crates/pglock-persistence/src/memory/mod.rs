//! In-process lease store
//!
//! Mirrors the row-locking semantics of the PostgreSQL backend so the
//! coordinator can be exercised without a database:
//!
//! - a row lock taken by one transaction makes `lock_row_for_update` from any
//!   other transaction fail with `Contended`
//! - inserting a key that is committed, or pending in another transaction,
//!   fails with `Conflict`
//! - writes stay private to the transaction until commit; rollback or drop
//!   discards them and releases the row locks
//!
//! - `rewind` on a row locked by a transaction waits until that transaction
//!   commits or rolls back, then applies on top of its writes

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicI32, AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::debug;

use crate::error::{LeaseStoreError, StoreResult};
use crate::model::Lease;
use crate::traits::{LeaseStore, LeaseTransaction};

type TxId = u64;

#[derive(Default)]
struct Tables {
    /// Committed rows keyed by resource key
    rows: HashMap<String, Lease>,
    /// Row locks (including pending inserts) keyed by resource key
    row_locks: HashMap<String, TxId>,
}

struct Shared {
    tables: Mutex<Tables>,
    next_tx: AtomicU64,
    next_row_id: AtomicI32,
    /// Signalled whenever a transaction gives up its row locks
    unlocked: Notify,
    /// When set, every primitive fails with `Unavailable`
    offline: Mutex<Option<String>>,
}

impl Shared {
    fn check_online(&self) -> StoreResult<()> {
        match self.offline.lock().as_ref() {
            Some(reason) => Err(LeaseStoreError::Unavailable(reason.clone())),
            None => Ok(()),
        }
    }
}

/// In-memory lease store
#[derive(Clone)]
pub struct MemoryLeaseStore {
    shared: Arc<Shared>,
}

impl Default for MemoryLeaseStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLeaseStore {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                tables: Mutex::new(Tables::default()),
                next_tx: AtomicU64::new(1),
                next_row_id: AtomicI32::new(1),
                unlocked: Notify::new(),
                offline: Mutex::new(None),
            }),
        }
    }

    /// Simulate a connectivity loss: all primitives fail until [`Self::restore`].
    pub fn fail_with(&self, reason: &str) {
        *self.shared.offline.lock() = Some(reason.to_string());
    }

    /// Undo [`Self::fail_with`].
    pub fn restore(&self) {
        *self.shared.offline.lock() = None;
    }

    /// Number of committed rows
    pub fn len(&self) -> usize {
        self.shared.tables.lock().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    async fn rewind_where<F>(
        &self,
        resource_key: &str,
        acquired_at: DateTime<Utc>,
        pred: F,
    ) -> StoreResult<u64>
    where
        F: Fn(&Lease) -> bool + Send,
    {
        loop {
            self.shared.check_online()?;
            // Registered before the lock check so an unlock in between is not missed
            let unlocked = self.shared.unlocked.notified();
            {
                let mut guard = self.shared.tables.lock();
                let tables = &mut *guard;
                let locked = tables.row_locks.contains_key(resource_key);
                match tables.rows.get_mut(resource_key) {
                    None => return Ok(0),
                    Some(row) if !locked => {
                        if !pred(row) {
                            return Ok(0);
                        }
                        row.acquired_at = acquired_at;
                        return Ok(1);
                    }
                    Some(_) => {}
                }
            }
            debug!(resource_key = %resource_key, "Rewind waiting for row lock");
            unlocked.await;
        }
    }
}

#[async_trait]
impl LeaseStore for MemoryLeaseStore {
    type Transaction = MemoryLeaseTransaction;

    async fn begin(&self) -> StoreResult<MemoryLeaseTransaction> {
        self.shared.check_online()?;
        let id = self.shared.next_tx.fetch_add(1, Ordering::Relaxed);
        Ok(MemoryLeaseTransaction {
            id,
            shared: self.shared.clone(),
            writes: HashMap::new(),
            held: HashSet::new(),
            finished: false,
        })
    }

    async fn rewind(&self, resource_key: &str, acquired_at: DateTime<Utc>) -> StoreResult<u64> {
        self.rewind_where(resource_key, acquired_at, |_| true).await
    }

    async fn rewind_held(
        &self,
        resource_key: &str,
        holder_id: &str,
        acquired_at: DateTime<Utc>,
    ) -> StoreResult<u64> {
        self.rewind_where(resource_key, acquired_at, |row| row.holder_id == holder_id)
            .await
    }

    async fn find(&self, resource_key: &str) -> StoreResult<Option<Lease>> {
        self.shared.check_online()?;
        Ok(self.shared.tables.lock().rows.get(resource_key).cloned())
    }

    async fn health_check(&self) -> StoreResult<()> {
        self.shared.check_online()
    }

    async fn truncate(&self) -> StoreResult<()> {
        self.shared.check_online()?;
        self.shared.tables.lock().rows.clear();
        Ok(())
    }
}

/// Transaction on a [`MemoryLeaseStore`]
pub struct MemoryLeaseTransaction {
    id: TxId,
    shared: Arc<Shared>,
    /// Rows written by this transaction, not yet visible to others
    writes: HashMap<String, Lease>,
    /// Resource keys whose row lock this transaction holds
    held: HashSet<String>,
    finished: bool,
}

impl MemoryLeaseTransaction {
    fn release_locks(&mut self, tables: &mut Tables) {
        let had_locks = !self.held.is_empty();
        for key in self.held.drain() {
            if tables.row_locks.get(&key) == Some(&self.id) {
                tables.row_locks.remove(&key);
            }
        }
        if had_locks {
            self.shared.unlocked.notify_waiters();
        }
    }

    /// Take the row lock for `resource_key`, failing if another transaction has it.
    fn take_lock(&mut self, tables: &mut Tables, resource_key: &str) -> StoreResult<()> {
        match tables.row_locks.get(resource_key) {
            Some(owner) if *owner != self.id => {
                Err(LeaseStoreError::Contended(resource_key.to_string()))
            }
            _ => {
                tables.row_locks.insert(resource_key.to_string(), self.id);
                self.held.insert(resource_key.to_string());
                Ok(())
            }
        }
    }
}

#[async_trait]
impl LeaseTransaction for MemoryLeaseTransaction {
    async fn lock_row_for_update(&mut self, resource_key: &str) -> StoreResult<Option<Lease>> {
        self.shared.check_online()?;
        if let Some(row) = self.writes.get(resource_key) {
            return Ok(Some(row.clone()));
        }

        let shared = self.shared.clone();
        let mut tables = shared.tables.lock();
        let Some(row) = tables.rows.get(resource_key).cloned() else {
            // Uncommitted inserts of other transactions are invisible, and a
            // missing row cannot be locked.
            return Ok(None);
        };
        self.take_lock(&mut tables, resource_key)?;
        Ok(Some(row))
    }

    async fn insert(
        &mut self,
        resource_key: &str,
        holder_id: &str,
        acquired_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        self.shared.check_online()?;
        let shared = self.shared.clone();
        let mut tables = shared.tables.lock();

        let pending_elsewhere = tables
            .row_locks
            .get(resource_key)
            .is_some_and(|owner| *owner != self.id);
        if tables.rows.contains_key(resource_key)
            || self.writes.contains_key(resource_key)
            || pending_elsewhere
        {
            return Err(LeaseStoreError::Conflict(resource_key.to_string()));
        }

        self.take_lock(&mut tables, resource_key)?;
        let id = shared.next_row_id.fetch_add(1, Ordering::Relaxed);
        self.writes.insert(
            resource_key.to_string(),
            Lease {
                id,
                resource_key: resource_key.to_string(),
                holder_id: holder_id.to_string(),
                acquired_at,
            },
        );
        Ok(())
    }

    async fn update(
        &mut self,
        resource_key: &str,
        holder_id: &str,
        acquired_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        self.shared.check_online()?;
        let shared = self.shared.clone();
        let mut tables = shared.tables.lock();

        let current = match self.writes.get(resource_key) {
            Some(row) => row.clone(),
            None => match tables.rows.get(resource_key) {
                Some(row) => row.clone(),
                // UPDATE of a missing row affects nothing
                None => return Ok(()),
            },
        };
        self.take_lock(&mut tables, resource_key)?;
        self.writes.insert(
            resource_key.to_string(),
            Lease {
                holder_id: holder_id.to_string(),
                acquired_at,
                ..current
            },
        );
        Ok(())
    }

    async fn commit(mut self) -> StoreResult<()> {
        let shared = self.shared.clone();
        let mut tables = shared.tables.lock();
        if let Some(reason) = shared.offline.lock().as_ref() {
            self.release_locks(&mut tables);
            self.finished = true;
            return Err(LeaseStoreError::Unavailable(reason.clone()));
        }

        let count = self.writes.len();
        for (key, row) in self.writes.drain() {
            tables.rows.insert(key, row);
        }
        self.release_locks(&mut tables);
        self.finished = true;
        debug!(tx = self.id, writes = count, "Memory transaction committed");
        Ok(())
    }

    async fn rollback(mut self) -> StoreResult<()> {
        let shared = self.shared.clone();
        let mut tables = shared.tables.lock();
        self.writes.clear();
        self.release_locks(&mut tables);
        self.finished = true;
        Ok(())
    }
}

impl Drop for MemoryLeaseTransaction {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let shared = self.shared.clone();
        let mut tables = shared.tables.lock();
        self.writes.clear();
        self.release_locks(&mut tables);
        debug!(tx = self.id, "Memory transaction dropped, rolled back");
    }
}
