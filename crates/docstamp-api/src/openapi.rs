//! # OpenAPI Specification Assembly
//!
//! Assembles the utoipa-documented routes into one OpenAPI document served
//! at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI spec for the stamping API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Document Stamping Service",
        version = "0.1.0",
        description = "Stamps each candidate PDF with its document name on the first page.\n\nTrigger endpoints create a `document-stamping-jobs` resource and return immediately with status Running. Poll the job for its terminal status, failed documents and provenance.\n\nAuthorization: the `MU-AUTH-ALLOWED-GROUPS` header must name one of the configured groups. Health probes, `/metrics` and `/openapi.json` are unauthenticated.",
        license(name = "MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server"),
    ),
    paths(
        // ── Stamping ────────────────────────────────────────────────────
        crate::routes::stamping::stamp_document,
        crate::routes::stamping::stamp_documents,
        crate::routes::stamping::stamp_agenda,
        // ── Jobs ────────────────────────────────────────────────────────
        crate::routes::jobs::get_job,
    ),
    components(
        schemas(
            // ── Error types ─────────────────────────────────────────────
            crate::error::ErrorBody,
            crate::error::ErrorDetail,
            // ── Stamping DTOs ───────────────────────────────────────────
            crate::routes::stamping::StampDocumentsRequest,
            crate::routes::JobSummaryDocument,
            crate::routes::JobSummaryResource,
            crate::routes::JobSummaryAttributes,
            // ── Job DTOs ────────────────────────────────────────────────
            crate::routes::jobs::JobDetailDocument,
            crate::routes::jobs::JobDetailResource,
            crate::routes::jobs::JobDetailAttributes,
            crate::routes::jobs::ProvenanceEntry,
            // ── Metrics ─────────────────────────────────────────────────
            crate::middleware::metrics::MetricsSnapshot,
        ),
    ),
    tags(
        (name = "stamping", description = "Trigger stamping for a document, a document set or an agenda"),
        (name = "jobs", description = "Stamping job status, failure detail and provenance"),
    )
)]
pub struct ApiDoc;

/// Build the OpenAPI router.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json — Return the generated OpenAPI specification.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_generates_with_all_paths() {
        let spec = ApiDoc::openapi();
        assert_eq!(spec.info.title, "Document Stamping Service");
        for path in [
            "/documents/{document_id}/stamp",
            "/documents/stamp",
            "/agendas/{agenda_id}/agendaitems/documents/stamp",
            "/document-stamping-jobs/{job_id}",
        ] {
            assert!(spec.paths.paths.contains_key(path), "missing {path}");
        }
    }

    #[test]
    fn spec_serializes_to_json() {
        let json = serde_json::to_value(ApiDoc::openapi()).unwrap();
        assert!(json["components"]["schemas"]["ErrorBody"].is_object());
    }
}
