//! # Job Polling
//!
//! `GET /document-stamping-jobs/:job_id` reports a job's current status.
//! Once terminal it also carries the end time, the failed documents (on
//! failure) and the source/result pairs recorded as provenance.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use docstamp_core::{JobId, JOB_RESOURCE_TYPE};
use docstamp_state::{JobRecord, ProvenanceLink};

use crate::error::AppError;
use crate::state::AppState;

/// One source/result pair produced by a job.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProvenanceEntry {
    /// Source artifact URI.
    pub source: String,
    /// Result artifact URI. Equal to `source` for in-place stamping.
    pub result: String,
}

impl From<ProvenanceLink> for ProvenanceEntry {
    fn from(link: ProvenanceLink) -> Self {
        Self {
            source: link.source_uri,
            result: link.result_uri,
        }
    }
}

/// Attributes of a polled job.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct JobDetailAttributes {
    /// Job URI.
    pub uri: String,
    /// Status URI (COGS vocabulary).
    pub status: String,
    /// Creation time.
    pub created: DateTime<Utc>,
    /// Time processing started.
    pub started: DateTime<Utc>,
    /// Time the job reached a terminal status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended: Option<DateTime<Utc>>,
    /// Failure detail listing the markers that could not be stamped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Markers of the documents that could not be stamped.
    #[serde(rename = "failedDocuments")]
    pub failed_documents: Vec<String>,
    /// Artifacts used and generated by the job.
    pub provenance: Vec<ProvenanceEntry>,
}

/// JSON:API resource object for a polled job.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct JobDetailResource {
    /// Always `document-stamping-jobs`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Job identifier.
    pub id: String,
    /// Job attributes.
    pub attributes: JobDetailAttributes,
}

/// Response of the polling endpoint.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct JobDetailDocument {
    /// The polled job.
    pub data: JobDetailResource,
}

impl JobDetailDocument {
    fn new(record: JobRecord, links: Vec<ProvenanceLink>) -> Self {
        let message = record.failure_detail();
        Self {
            data: JobDetailResource {
                kind: JOB_RESOURCE_TYPE.to_string(),
                id: record.id.to_string(),
                attributes: JobDetailAttributes {
                    uri: record.uri,
                    status: record.status.uri().to_string(),
                    created: record.created,
                    started: record.started,
                    ended: record.ended,
                    message,
                    failed_documents: record.failed_documents,
                    provenance: links.into_iter().map(ProvenanceEntry::from).collect(),
                },
            },
        }
    }
}

/// Build the job polling router.
pub fn router() -> Router<AppState> {
    Router::new().route("/document-stamping-jobs/:job_id", get(get_job))
}

/// GET /document-stamping-jobs/:job_id — Poll a stamping job.
#[utoipa::path(
    get,
    path = "/document-stamping-jobs/{job_id}",
    params(("job_id" = String, Path, description = "Job identifier (UUID)")),
    responses(
        (status = 200, description = "Job found", body = JobDetailDocument),
        (status = 404, description = "Job not found", body = crate::error::ErrorBody),
    ),
    tag = "jobs"
)]
pub(crate) async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<JobDetailDocument>, AppError> {
    let not_found = || AppError::NotFound(format!("stamping job {job_id} not found"));
    let id = JobId::parse(&job_id).map_err(|_| not_found())?;

    let ledger = state.pipeline.ledger();
    let record = ledger.job(id).await?.ok_or_else(not_found)?;
    let links = ledger.provenance(id).await?;
    Ok(Json(JobDetailDocument::new(record, links)))
}
