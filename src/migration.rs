//! Schema migrations for the session snapshot table.
//!
//! Applications that manage their schema with `sea-orm-migration` can run
//! [`Migrator`] alongside their own migrators. Others can call
//! [`SeaOrmStorage::create_table`](crate::SeaOrmStorage::create_table).

pub use sea_orm_migration::prelude::*;

mod m20240101_000001_create_session_snapshot_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    // Separate bookkeeping table so this migrator can coexist with the host app's.
    fn migration_table_name() -> sea_orm::DynIden {
        Alias::new("admin_session_migrations").into_iden()
    }

    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(
            m20240101_000001_create_session_snapshot_table::Migration,
        )]
    }
}
