//! Database layer for the pool ledger.
//!
//! This crate provides:
//! - `SeaORM` entity definitions
//! - `LedgerStore` implementations for Postgres and in-process use
//! - Database migrations

pub mod entities;
pub mod error;
pub mod migration;
pub mod store;

pub use migration::Migrator;
pub use store::{MemoryLedgerStore, PgLedgerStore};

use std::time::Duration;

use poolbank_shared::config::DatabaseConfig;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

/// Establishes a connection to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    Database::connect(database_url).await
}

/// Establishes a connection pool sized from configuration.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect_with(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);
    Database::connect(options).await
}
