//! # docstamp-cli — CLI Tool for the Document Stamping Service
//!
//! Provides the `docstamp` command-line interface for operators.
//!
//! ## Subcommands
//!
//! - `docstamp stamp documents <ID>...`: stamp explicit documents and wait.
//! - `docstamp stamp agenda <ID>`: stamp every eligible document of an agenda.
//! - `docstamp job <ID>`: print a job's state and provenance.
//!
//! Stamping runs synchronously: the command returns once the job is
//! finalized. Because the catalog only offers documents that were never
//! stamped successfully, re-running a command is the retry pass for earlier
//! failures.
//!
//! ## Exit codes
//!
//! `0` success or nothing left to stamp, `1` error, `2` the job finished
//! with failed documents.

pub mod job;
pub mod stamp;

use anyhow::{Context, Result};

use docstamp_api::state::{AppConfig, AppState};
use docstamp_pipeline::StampingPipeline;

/// Exit code for a job that finished with failed documents.
pub const EXIT_JOB_FAILED: u8 = 2;

/// Build a pipeline backed by the Postgres catalog and ledger.
///
/// Reads the same environment as the HTTP service. `DATABASE_URL` is
/// required: an in-memory catalog would have nothing to stamp.
pub async fn pipeline_from_env() -> Result<StampingPipeline> {
    let config = AppConfig::from_env().context("invalid configuration")?;
    let pool = docstamp_api::db::init_pool()
        .await
        .context("failed to connect to the database")?
        .context("DATABASE_URL must be set to run the CLI")?;
    Ok(AppState::with_pool(config, pool).pipeline)
}
