//! # API Route Modules
//!
//! - `stamping`: trigger endpoints. Each resolves a candidate selector,
//!   creates a job, answers with the running job and keeps stamping in the
//!   background.
//! - `jobs`: job polling, terminal status, failure detail and provenance.
//!
//! Both speak JSON:API documents of type `document-stamping-jobs`.

pub mod jobs;
pub mod stamping;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use docstamp_core::JOB_RESOURCE_TYPE;
use docstamp_pipeline::JobSummary;

/// Attributes of a freshly created job.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct JobSummaryAttributes {
    /// Job URI.
    pub uri: String,
    /// Status URI; always `http://vocab.deri.ie/cogs#Running` here.
    pub status: String,
    /// Creation time.
    pub created: DateTime<Utc>,
    /// Human-readable count of documents being stamped.
    pub message: String,
}

/// JSON:API resource object for a created job.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct JobSummaryResource {
    /// Always `document-stamping-jobs`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Job identifier.
    pub id: String,
    /// Job attributes.
    pub attributes: JobSummaryAttributes,
}

/// Response of every trigger endpoint.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct JobSummaryDocument {
    /// The created job.
    pub data: JobSummaryResource,
}

impl From<JobSummary> for JobSummaryDocument {
    fn from(summary: JobSummary) -> Self {
        Self {
            data: JobSummaryResource {
                kind: JOB_RESOURCE_TYPE.to_string(),
                id: summary.id.to_string(),
                attributes: JobSummaryAttributes {
                    uri: summary.uri,
                    status: summary.status.uri().to_string(),
                    created: summary.created,
                    message: summary.message,
                },
            },
        }
    }
}
