//! # Provenance Links
//!
//! A job "used" a source artifact and "generated" a result artifact. One
//! link is recorded per successfully stamped document. In in-place storage
//! mode source and result name the same artifact.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A (source, result) artifact pair attached to a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenanceLink {
    /// URI of the job that produced the result.
    pub job_uri: String,
    /// URI of the artifact that was stamped.
    pub source_uri: String,
    /// URI of the stamped artifact.
    pub result_uri: String,
    /// When the link was recorded.
    pub recorded_at: DateTime<Utc>,
}

impl ProvenanceLink {
    /// Create a link stamped with the current time.
    pub fn new(
        job_uri: impl Into<String>,
        source_uri: impl Into<String>,
        result_uri: impl Into<String>,
    ) -> Self {
        Self {
            job_uri: job_uri.into(),
            source_uri: source_uri.into(),
            result_uri: result_uri.into(),
            recorded_at: Utc::now(),
        }
    }

    /// Whether the link denotes the same attachment, ignoring the timestamp.
    pub fn same_pair(&self, job_uri: &str, source_uri: &str, result_uri: &str) -> bool {
        self.job_uri == job_uri && self.source_uri == source_uri && self.result_uri == result_uri
    }

    /// Whether the result was written over the source rather than alongside it.
    pub fn is_in_place(&self) -> bool {
        self.source_uri == self.result_uri
    }
}
