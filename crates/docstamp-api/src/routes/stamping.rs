//! # Stamping Triggers
//!
//! - `POST /documents/:document_id/stamp`: one document.
//! - `POST /documents/stamp`: explicit id set in the body.
//! - `POST /agendas/:agenda_id/agendaitems/documents/stamp`: every
//!   document of an agenda.
//!
//! The response is sent once the job exists. Stamping continues on a
//! detached task; poll `GET /document-stamping-jobs/:id` for the outcome.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use docstamp_core::{CandidateSelector, CollectionId, DocumentId};

use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::routes::JobSummaryDocument;
use crate::state::AppState;

/// Request to stamp an explicit set of documents.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StampDocumentsRequest {
    /// Document identifiers. Duplicates are ignored.
    #[serde(rename = "documentIds")]
    pub document_ids: Vec<String>,
}

impl Validate for StampDocumentsRequest {
    fn validate(&self) -> Result<(), String> {
        if self.document_ids.is_empty() {
            return Err("documentIds must not be empty".into());
        }
        if self.document_ids.iter().any(|id| id.trim().is_empty()) {
            return Err("documentIds must not contain blank ids".into());
        }
        Ok(())
    }
}

/// Build the stamping router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/documents/stamp", post(stamp_documents))
        .route("/documents/:document_id/stamp", post(stamp_document))
        .route(
            "/agendas/:agenda_id/agendaitems/documents/stamp",
            post(stamp_agenda),
        )
}

async fn submit(
    state: &AppState,
    selector: CandidateSelector,
) -> Result<Json<JobSummaryDocument>, AppError> {
    let (summary, _detached) = state.pipeline.submit(&selector).await?;
    Ok(Json(summary.into()))
}

/// POST /documents/:document_id/stamp — Stamp a single document.
#[utoipa::path(
    post,
    path = "/documents/{document_id}/stamp",
    params(("document_id" = String, Path, description = "Document identifier")),
    responses(
        (status = 200, description = "Stamping job created", body = JobSummaryDocument),
        (status = 403, description = "Caller not in an authorized group", body = crate::error::ErrorBody),
        (status = 404, description = "Document unknown or nothing to stamp", body = crate::error::ErrorBody),
    ),
    tag = "stamping"
)]
pub(crate) async fn stamp_document(
    State(state): State<AppState>,
    Path(document_id): Path<String>,
) -> Result<Json<JobSummaryDocument>, AppError> {
    let id = DocumentId::new(document_id)?;
    submit(&state, CandidateSelector::document(id)).await
}

/// POST /documents/stamp — Stamp an explicit set of documents.
#[utoipa::path(
    post,
    path = "/documents/stamp",
    request_body = StampDocumentsRequest,
    responses(
        (status = 200, description = "Stamping job created", body = JobSummaryDocument),
        (status = 400, description = "Malformed body", body = crate::error::ErrorBody),
        (status = 404, description = "A document is unknown or nothing to stamp", body = crate::error::ErrorBody),
        (status = 422, description = "Empty or blank document ids", body = crate::error::ErrorBody),
    ),
    tag = "stamping"
)]
pub(crate) async fn stamp_documents(
    State(state): State<AppState>,
    body: Result<Json<StampDocumentsRequest>, JsonRejection>,
) -> Result<Json<JobSummaryDocument>, AppError> {
    let request = extract_validated_json(body)?;
    let ids = request
        .document_ids
        .into_iter()
        .map(DocumentId::new)
        .collect::<Result<Vec<_>, _>>()?;
    submit(&state, CandidateSelector::documents(ids)?).await
}

/// POST /agendas/:agenda_id/agendaitems/documents/stamp — Stamp an agenda's documents.
#[utoipa::path(
    post,
    path = "/agendas/{agenda_id}/agendaitems/documents/stamp",
    params(("agenda_id" = String, Path, description = "Agenda identifier")),
    responses(
        (status = 200, description = "Stamping job created", body = JobSummaryDocument),
        (status = 403, description = "Caller not in an authorized group", body = crate::error::ErrorBody),
        (status = 404, description = "Agenda unknown or nothing to stamp", body = crate::error::ErrorBody),
    ),
    tag = "stamping"
)]
pub(crate) async fn stamp_agenda(
    State(state): State<AppState>,
    Path(agenda_id): Path<String>,
) -> Result<Json<JobSummaryDocument>, AppError> {
    let id = CollectionId::new(agenda_id)?;
    submit(&state, CandidateSelector::collection(id)).await
}
