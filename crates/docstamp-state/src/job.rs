//! # Stamping Job Typestate
//!
//! Each lifecycle state is a distinct type. `StampingJob<Running>` is the
//! only state with transition methods, and both transitions consume it, so
//! a finalized job cannot be finalized again.

use std::marker::PhantomData;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use docstamp_core::{resource_uri, JobId, JobStatus, JOB_RESOURCE_TYPE};

use crate::error::JobError;

// ── State Types ──────────────────────────────────────────────────────

/// Documents are being processed.
#[derive(Debug, Clone, Copy)]
pub struct Running;

/// Every document was stamped. Terminal.
#[derive(Debug, Clone, Copy)]
pub struct Succeeded;

/// At least one document could not be stamped. Terminal.
#[derive(Debug, Clone, Copy)]
pub struct Failed;

/// Marker trait for job states. Sealed to the three states above.
pub trait JobState: private::Sealed + std::fmt::Debug {
    /// The runtime status matching this state.
    fn status() -> JobStatus;
}

mod private {
    pub trait Sealed {}
    impl Sealed for super::Running {}
    impl Sealed for super::Succeeded {}
    impl Sealed for super::Failed {}
}

impl JobState for Running {
    fn status() -> JobStatus {
        JobStatus::Running
    }
}
impl JobState for Succeeded {
    fn status() -> JobStatus {
        JobStatus::Success
    }
}
impl JobState for Failed {
    fn status() -> JobStatus {
        JobStatus::Fail
    }
}

// ── Outcome ──────────────────────────────────────────────────────────

/// Terminal outcome of a batch, computed after every document was attempted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum JobOutcome {
    /// No document failed.
    Success,
    /// The listed document markers could not be stamped.
    Fail {
        /// Markers of the failed documents, in processing order.
        failed_documents: Vec<String>,
    },
}

impl JobOutcome {
    /// `Success` when `failed_documents` is empty, `Fail` otherwise.
    pub fn from_failures(failed_documents: Vec<String>) -> Self {
        if failed_documents.is_empty() {
            Self::Success
        } else {
            Self::Fail { failed_documents }
        }
    }

    /// The terminal status this outcome maps to.
    pub fn status(&self) -> JobStatus {
        match self {
            Self::Success => JobStatus::Success,
            Self::Fail { .. } => JobStatus::Fail,
        }
    }
}

// ── The Job ──────────────────────────────────────────────────────────

/// A stamping job parameterized by its lifecycle state.
#[derive(Debug, Clone)]
pub struct StampingJob<S: JobState> {
    id: JobId,
    uri: String,
    created: DateTime<Utc>,
    started: DateTime<Utc>,
    ended: Option<DateTime<Utc>>,
    failed_documents: Vec<String>,
    _state: PhantomData<S>,
}

impl<S: JobState> StampingJob<S> {
    /// The job identifier.
    pub fn id(&self) -> JobId {
        self.id
    }

    /// The job URI.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// When the job was created.
    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    /// The runtime status of this state.
    pub fn status(&self) -> JobStatus {
        S::status()
    }

    /// Snapshot this job as a serializable record.
    pub fn record(&self) -> JobRecord {
        JobRecord {
            id: self.id,
            uri: self.uri.clone(),
            status: S::status(),
            created: self.created,
            started: self.started,
            ended: self.ended,
            failed_documents: self.failed_documents.clone(),
        }
    }

    fn transmute_to<T: JobState>(self, ended: DateTime<Utc>) -> StampingJob<T> {
        StampingJob {
            id: self.id,
            uri: self.uri,
            created: self.created,
            started: self.started,
            ended: Some(ended),
            failed_documents: self.failed_documents,
            _state: PhantomData,
        }
    }
}

impl StampingJob<Running> {
    /// Allocate a new job with a fresh id, created and started now.
    pub fn start(resource_base: &str) -> Self {
        Self::start_at(resource_base, JobId::new(), Utc::now())
    }

    /// Allocate a job with an explicit id and creation time.
    ///
    /// `started` equals `created`: a job begins running the moment it exists.
    pub fn start_at(resource_base: &str, id: JobId, created: DateTime<Utc>) -> Self {
        Self {
            id,
            uri: resource_uri(resource_base, JOB_RESOURCE_TYPE, id),
            created,
            started: created,
            ended: None,
            failed_documents: Vec::new(),
            _state: PhantomData,
        }
    }

    /// Transitions: Running → Success.
    pub fn succeed(self, at: DateTime<Utc>) -> StampingJob<Succeeded> {
        self.transmute_to(at)
    }

    /// Transitions: Running → Fail, carrying the failed document markers.
    pub fn fail(mut self, failed_documents: Vec<String>, at: DateTime<Utc>) -> StampingJob<Failed> {
        self.failed_documents = failed_documents;
        self.transmute_to(at)
    }

    /// Apply an outcome and return the terminal record.
    pub fn finish(self, outcome: JobOutcome, at: DateTime<Utc>) -> JobRecord {
        match outcome {
            JobOutcome::Success => self.succeed(at).record(),
            JobOutcome::Fail { failed_documents } => self.fail(failed_documents, at).record(),
        }
    }
}

impl StampingJob<Failed> {
    /// Markers of the documents that could not be stamped.
    pub fn failed_documents(&self) -> &[String] {
        &self.failed_documents
    }
}

// ── JobRecord ────────────────────────────────────────────────────────

/// Serializable job snapshot for persistence and API responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    /// The job identifier.
    pub id: JobId,
    /// The job URI.
    pub uri: String,
    /// Current status.
    pub status: JobStatus,
    /// When the job was created.
    pub created: DateTime<Utc>,
    /// When processing started.
    pub started: DateTime<Utc>,
    /// When the job reached its terminal status.
    #[serde(default)]
    pub ended: Option<DateTime<Utc>>,
    /// Markers of documents that failed; empty unless status is `Fail`.
    #[serde(default)]
    pub failed_documents: Vec<String>,
}

impl JobRecord {
    /// Human-readable failure detail, present only for failed jobs.
    pub fn failure_detail(&self) -> Option<String> {
        if self.status != JobStatus::Fail {
            return None;
        }
        Some(format!(
            "failed to stamp {} document(s): {}",
            self.failed_documents.len(),
            self.failed_documents.join(", ")
        ))
    }

    /// Apply a terminal outcome to a running record.
    ///
    /// Returns [`JobError::AlreadyTerminal`] if the record is finalized.
    pub fn apply(&mut self, outcome: JobOutcome, at: DateTime<Utc>) -> Result<(), JobError> {
        if self.status.is_terminal() {
            return Err(JobError::AlreadyTerminal {
                id: self.id,
                status: self.status,
            });
        }
        self.status = outcome.status();
        self.ended = Some(at);
        self.failed_documents = match outcome {
            JobOutcome::Success => Vec::new(),
            JobOutcome::Fail { failed_documents } => failed_documents,
        };
        Ok(())
    }
}

impl<S: JobState> From<&StampingJob<S>> for JobRecord {
    fn from(job: &StampingJob<S>) -> Self {
        job.record()
    }
}
