//! pglock Persistence - lease table and lease store backends
//!
//! This crate provides:
//! - The SeaORM entity for the `lease` table
//! - The `LeaseStore` / `LeaseTransaction` primitive traits
//! - A PostgreSQL backend (`SqlLeaseStore`) and an in-process backend
//!   (`MemoryLeaseStore`) with the same row-locking semantics

pub mod entity;
pub mod error;
pub mod memory;
pub mod model;
pub mod sql;
pub mod traits;

// Re-export sea-orm for convenience
pub use sea_orm;

pub use error::{LeaseStoreError, StoreResult};
pub use memory::{MemoryLeaseStore, MemoryLeaseTransaction};
pub use model::{Lease, StoreBackend};
pub use sql::{SqlLeaseStore, SqlLeaseTransaction};
pub use traits::{LeaseStore, LeaseTransaction};
