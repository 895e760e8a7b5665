//! PostgreSQL lease store (via SeaORM)
//!
//! Row-level pessimistic locking is delegated to PostgreSQL:
//! `SELECT ... FOR UPDATE NOWAIT` fails immediately with SQLSTATE `55P03`
//! when another transaction holds the row, and the unique constraint on
//! `resource_key` arbitrates concurrent inserts (SQLSTATE `23505`).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait, QueryFilter,
    QuerySelect, RuntimeErr, Set, SqlErr, TransactionTrait,
    sea_query::{Expr, LockBehavior, LockType},
};
use tracing::debug;

use crate::entity::lease;
use crate::error::{LeaseStoreError, StoreResult};
use crate::model::Lease;
use crate::traits::{LeaseStore, LeaseTransaction};

/// SQLSTATE raised by `NOWAIT` when the row lock is held elsewhere.
const LOCK_NOT_AVAILABLE: &str = "55P03";

/// PostgreSQL-backed lease store
///
/// Wraps an explicitly constructed SeaORM `DatabaseConnection` (a pool).
#[derive(Clone)]
pub struct SqlLeaseStore {
    db: DatabaseConnection,
}

impl SqlLeaseStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Get a reference to the underlying database connection
    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

/// Transaction on a [`SqlLeaseStore`]
///
/// SeaORM rolls back a `DatabaseTransaction` dropped without commit.
pub struct SqlLeaseTransaction {
    txn: DatabaseTransaction,
}

fn sqlstate(err: &DbErr) -> Option<String> {
    match err {
        DbErr::Query(RuntimeErr::SqlxError(e))
        | DbErr::Exec(RuntimeErr::SqlxError(e))
        | DbErr::Conn(RuntimeErr::SqlxError(e)) => e
            .as_database_error()
            .and_then(|db_err| db_err.code())
            .map(|code| code.into_owned()),
        _ => None,
    }
}

/// Map a SeaORM error onto the store taxonomy.
fn classify(resource_key: &str, err: DbErr) -> LeaseStoreError {
    if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
        return LeaseStoreError::Conflict(resource_key.to_string());
    }
    if sqlstate(&err).as_deref() == Some(LOCK_NOT_AVAILABLE) {
        return LeaseStoreError::Contended(resource_key.to_string());
    }
    LeaseStoreError::Unavailable(err.to_string())
}

fn unavailable(err: DbErr) -> LeaseStoreError {
    LeaseStoreError::Unavailable(err.to_string())
}

#[async_trait]
impl LeaseStore for SqlLeaseStore {
    type Transaction = SqlLeaseTransaction;

    async fn begin(&self) -> StoreResult<SqlLeaseTransaction> {
        let txn = self.db.begin().await.map_err(unavailable)?;
        Ok(SqlLeaseTransaction { txn })
    }

    async fn rewind(&self, resource_key: &str, acquired_at: DateTime<Utc>) -> StoreResult<u64> {
        let result = lease::Entity::update_many()
            .col_expr(
                lease::Column::AcquiredAt,
                Expr::value(acquired_at.fixed_offset()),
            )
            .filter(lease::Column::ResourceKey.eq(resource_key))
            .exec(&self.db)
            .await
            .map_err(unavailable)?;

        debug!(resource_key = %resource_key, rows = result.rows_affected, "Lease rewound");
        Ok(result.rows_affected)
    }

    async fn rewind_held(
        &self,
        resource_key: &str,
        holder_id: &str,
        acquired_at: DateTime<Utc>,
    ) -> StoreResult<u64> {
        let result = lease::Entity::update_many()
            .col_expr(
                lease::Column::AcquiredAt,
                Expr::value(acquired_at.fixed_offset()),
            )
            .filter(lease::Column::ResourceKey.eq(resource_key))
            .filter(lease::Column::HolderId.eq(holder_id))
            .exec(&self.db)
            .await
            .map_err(unavailable)?;

        debug!(
            resource_key = %resource_key,
            holder_id = %holder_id,
            rows = result.rows_affected,
            "Held lease rewound"
        );
        Ok(result.rows_affected)
    }

    async fn find(&self, resource_key: &str) -> StoreResult<Option<Lease>> {
        let model = lease::Entity::find()
            .filter(lease::Column::ResourceKey.eq(resource_key))
            .one(&self.db)
            .await
            .map_err(unavailable)?;
        Ok(model.map(Lease::from))
    }

    async fn health_check(&self) -> StoreResult<()> {
        self.db.ping().await.map_err(unavailable)
    }

    async fn truncate(&self) -> StoreResult<()> {
        lease::Entity::delete_many()
            .exec(&self.db)
            .await
            .map_err(unavailable)?;
        Ok(())
    }
}

#[async_trait]
impl LeaseTransaction for SqlLeaseTransaction {
    async fn lock_row_for_update(&mut self, resource_key: &str) -> StoreResult<Option<Lease>> {
        let model = lease::Entity::find()
            .filter(lease::Column::ResourceKey.eq(resource_key))
            .lock_with_behavior(LockType::Update, LockBehavior::Nowait)
            .one(&self.txn)
            .await
            .map_err(|e| classify(resource_key, e))?;
        Ok(model.map(Lease::from))
    }

    async fn insert(
        &mut self,
        resource_key: &str,
        holder_id: &str,
        acquired_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let model = lease::ActiveModel {
            resource_key: Set(resource_key.to_string()),
            holder_id: Set(holder_id.to_string()),
            acquired_at: Set(acquired_at.fixed_offset()),
            ..Default::default()
        };

        lease::Entity::insert(model)
            .exec(&self.txn)
            .await
            .map_err(|e| classify(resource_key, e))?;
        Ok(())
    }

    async fn update(
        &mut self,
        resource_key: &str,
        holder_id: &str,
        acquired_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        lease::Entity::update_many()
            .col_expr(lease::Column::HolderId, Expr::value(holder_id))
            .col_expr(
                lease::Column::AcquiredAt,
                Expr::value(acquired_at.fixed_offset()),
            )
            .filter(lease::Column::ResourceKey.eq(resource_key))
            .exec(&self.txn)
            .await
            .map_err(|e| classify(resource_key, e))?;
        Ok(())
    }

    async fn commit(self) -> StoreResult<()> {
        self.txn.commit().await.map_err(unavailable)
    }

    async fn rollback(self) -> StoreResult<()> {
        self.txn.rollback().await.map_err(unavailable)
    }
}
