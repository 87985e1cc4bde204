//! # Stamp Subcommand
//!
//! Runs one stamping job to completion and prints the finalized job as
//! JSON.

use anyhow::Result;
use clap::{Args, Subcommand};
use serde::Serialize;

use docstamp_core::{CandidateSelector, CollectionId, DocumentId, JobStatus};
use docstamp_pipeline::{JobSummary, PipelineError, StampingPipeline};
use docstamp_state::JobRecord;

use crate::EXIT_JOB_FAILED;

/// Arguments for the `docstamp stamp` subcommand.
#[derive(Args, Debug)]
pub struct StampArgs {
    #[command(subcommand)]
    pub command: StampCommand,
}

/// What to stamp.
#[derive(Subcommand, Debug)]
pub enum StampCommand {
    /// Stamp explicit documents.
    Documents {
        /// Document identifiers.
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Stamp every eligible document of an agenda.
    Agenda {
        /// Agenda identifier.
        id: String,
    },
}

impl StampCommand {
    /// Build the candidate selector for this command.
    pub fn selector(&self) -> Result<CandidateSelector> {
        Ok(match self {
            Self::Documents { ids } => {
                let ids = ids
                    .iter()
                    .map(DocumentId::new)
                    .collect::<Result<Vec<_>, _>>()?;
                CandidateSelector::documents(ids)?
            }
            Self::Agenda { id } => CandidateSelector::collection(CollectionId::new(id.as_str())?),
        })
    }
}

#[derive(Debug, Serialize)]
struct StampReport {
    summary: JobSummary,
    job: JobRecord,
}

/// Execute the stamp subcommand.
pub async fn run_stamp(args: &StampArgs, pipeline: &StampingPipeline) -> Result<u8> {
    let selector = args.command.selector()?;
    tracing::info!(selector = %selector, "starting stamping run");

    let (summary, job) = match pipeline.run_to_completion(&selector).await {
        Ok(result) => result,
        Err(PipelineError::NoEligibleCandidates) => {
            println!("Nothing to stamp for {selector}");
            return Ok(0);
        }
        Err(e) => return Err(e.into()),
    };

    let failed = job.status == JobStatus::Fail;
    if let Some(detail) = job.failure_detail() {
        tracing::warn!(job_id = %job.id, "{detail}");
    }
    println!(
        "{}",
        serde_json::to_string_pretty(&StampReport { summary, job })?
    );

    Ok(if failed { EXIT_JOB_FAILED } else { 0 })
}
