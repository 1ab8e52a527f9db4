//! Job store: persistence for job records.
//!
//! Records live in a flat key-value mapping from engine task id to a JSON
//! document. [`store::JobStore`] abstracts the backend; PostgreSQL is used
//! in deployment and an in-memory map for local development and tests.

use sqlx::postgres::PgPoolOptions;

pub mod repositories;
pub mod store;

pub use store::{JobStore, MemoryJobStore, PgJobStore, StoreError, StoreResult};

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
}

/// Verify the database answers a trivial query.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply pending migrations from `crates/db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
