//! # Job and Batch Summaries
//!
//! [`JobSummary`] is what the caller sees right after job creation.
//! [`ProcessingSummary`] is the result of the per-document loop and the
//! only input to the job's terminal outcome.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use docstamp_core::{DocumentId, JobId, JobStatus, Marker};
use docstamp_state::{JobOutcome, Running, StampingJob};

/// Caller-facing payload produced before processing begins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSummary {
    /// The job identifier.
    pub id: JobId,
    /// The job URI.
    pub uri: String,
    /// Always `Running` at the time the summary is produced.
    pub status: JobStatus,
    /// When the job was created.
    pub created: DateTime<Utc>,
    /// Number of documents the job will attempt.
    pub candidates: usize,
    /// Human-readable description of the work.
    pub message: String,
}

/// Build the summary of a freshly created job.
pub fn summarize(job: &StampingJob<Running>, candidates: usize) -> JobSummary {
    JobSummary {
        id: job.id(),
        uri: job.uri().to_string(),
        status: job.status(),
        created: job.created(),
        candidates,
        message: format!("Stamping {candidates} document(s)"),
    }
}

/// A document that was stamped and linked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StampedDocument {
    /// The stamped document.
    pub document_id: DocumentId,
    /// URI of the artifact that was read.
    pub source_uri: String,
    /// URI of the artifact that was written.
    pub result_uri: String,
}

/// A document that could not be stamped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedDocument {
    /// The document.
    pub document_id: DocumentId,
    /// Its marker, reported in the job's failure detail.
    pub marker: Marker,
    /// Rendered cause of the failure.
    pub reason: String,
}

/// Result of attempting every candidate of a job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessingSummary {
    /// Successful documents, in processing order.
    pub stamped: Vec<StampedDocument>,
    /// Failed documents, in processing order.
    pub failed: Vec<FailedDocument>,
}

impl ProcessingSummary {
    /// Markers of the failed documents, in processing order.
    pub fn failed_markers(&self) -> Vec<String> {
        self.failed.iter().map(|f| f.marker.to_string()).collect()
    }

    /// `Success` if nothing failed, otherwise `Fail` with the failed markers.
    pub fn outcome(&self) -> JobOutcome {
        JobOutcome::from_failures(self.failed_markers())
    }

    /// Number of documents attempted.
    pub fn attempted(&self) -> usize {
        self.stamped.len() + self.failed.len()
    }
}
