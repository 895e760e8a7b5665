//! Schema migrations for the lease table.
//!
//! Must run before the first lease store call; the server runs them at
//! startup unless `db.migrate` is disabled.

pub use sea_orm_migration::prelude::*;

mod m20241017_000001_create_lease_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20241017_000001_create_lease_table::Migration)]
    }
}
