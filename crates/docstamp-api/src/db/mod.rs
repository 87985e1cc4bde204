//! # Database Persistence Layer
//!
//! Postgres-backed [`Catalog`](docstamp_pipeline::Catalog) and
//! [`Ledger`](docstamp_pipeline::Ledger) via SQLx.
//!
//! The database is **optional**. When `DATABASE_URL` is set the service
//! reads documents, collections and artifacts from Postgres and persists
//! jobs and provenance there. When absent, the service runs against the
//! in-memory collaborators (development and testing only).
//!
//! Every SQLx error is surfaced to the pipeline as an `Unavailable`
//! collaborator error. The pipeline decides whether that aborts an
//! invocation or only fails one document.

pub mod catalog;
pub mod ledger;

pub use catalog::PgCatalog;
pub use ledger::PgLedger;

use sqlx::postgres::{PgPool, PgPoolOptions};

/// Initialize the database connection pool and run migrations.
///
/// Returns `None` if `DATABASE_URL` is not set (in-memory-only mode).
/// Returns `Err` if the URL is set but the connection or migration fails.
pub async fn init_pool() -> Result<Option<PgPool>, sqlx::Error> {
    let url = match std::env::var("DATABASE_URL") {
        Ok(url) if !url.trim().is_empty() => url,
        _ => {
            tracing::warn!(
                "DATABASE_URL not set, running in-memory only mode. \
                 Jobs will not survive restarts."
            );
            return Ok(None);
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(&url)
        .await?;

    tracing::info!("Connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(Some(pool))
}
