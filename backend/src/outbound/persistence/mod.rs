//! PostgreSQL persistence adapter.

mod diesel_record_store;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_record_store::DieselRecordStore;
pub use migrations::{MigrationError, run_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
