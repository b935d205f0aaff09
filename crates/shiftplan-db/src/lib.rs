//! Database layer for the shiftplan roster store.
//!
//! Holds the persisted models the reconciliation engine works against:
//! roster assignment records and the reconciliation run audit trail, plus
//! the embedded migrations that create their schema.
//!
//! Queries live as associated functions on the model structs and take a
//! `&PgPool`; connections are checked out per operation, so reads always
//! reflect the current persisted state and no result is cached across calls.

pub mod error;
pub mod models;

pub use error::DbError;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Connect to the roster database.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool, DbError> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .map_err(DbError::ConnectionFailed)
}

/// Apply the embedded migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), DbError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(DbError::MigrationFailed)
}
