//! # Job Subcommand
//!
//! Prints a stamping job's record and its provenance links as JSON.

use anyhow::{bail, Result};
use clap::Args;
use serde::Serialize;

use docstamp_core::JobId;
use docstamp_pipeline::{Ledger, StampingPipeline};
use docstamp_state::{JobRecord, ProvenanceLink};

/// Arguments for the `docstamp job` subcommand.
#[derive(Args, Debug)]
pub struct JobArgs {
    /// Job identifier (UUID).
    pub id: String,
}

#[derive(Debug, Serialize)]
struct JobReport {
    job: JobRecord,
    provenance: Vec<ProvenanceLink>,
}

/// Execute the job subcommand.
pub async fn run_job(args: &JobArgs, pipeline: &StampingPipeline) -> Result<u8> {
    let id = JobId::parse(&args.id)?;
    let ledger = pipeline.ledger();
    let Some(job) = ledger.job(id).await? else {
        bail!("stamping job {id} not found");
    };
    let provenance = ledger.provenance(id).await?;
    println!(
        "{}",
        serde_json::to_string_pretty(&JobReport { job, provenance })?
    );
    Ok(0)
}
