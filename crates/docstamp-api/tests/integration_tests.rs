//! # Integration Tests for docstamp-api
//!
//! Drives the full router with an in-memory catalog and ledger and a
//! filesystem artifact store in a temporary directory: triggers, polling,
//! error bodies, group authorization, health probes, metrics and OpenAPI.

use std::path::Path;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::Utc;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use docstamp_api::auth::ALLOWED_GROUPS_HEADER;
use docstamp_api::middleware::metrics::ApiMetrics;
use docstamp_api::state::{AppConfig, AppState};
use docstamp_core::{Artifact, CollectionId, Document, DocumentId};
use docstamp_pipeline::MemoryCatalog;

const RUNNING: &str = "http://vocab.deri.ie/cogs#Running";
const SUCCESS: &str = "http://vocab.deri.ie/cogs#Success";
const FAIL: &str = "http://vocab.deri.ie/cogs#Fail";

fn sample_pdf() -> Vec<u8> {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};

    let mut doc = lopdf::Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let content = Content {
        operations: vec![Operation::new("BT", vec![]), Operation::new("ET", vec![])],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
    doc.trailer.set("Root", catalog_id);
    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

fn document(doc_id: &str) -> Document {
    let now = Utc::now();
    Document {
        id: DocumentId::new(doc_id).unwrap(),
        uri: format!("http://example.org/documents/{doc_id}"),
        name: format!("Nota {doc_id}"),
        artifact: Artifact {
            uri: format!("http://example.org/files/{doc_id}"),
            id: doc_id.into(),
            file_name: format!("{doc_id}.pdf"),
            format: Some("application/pdf".into()),
            extension: Some("pdf".into()),
            size: None,
            physical_uri: format!("share://{doc_id}.pdf"),
            created: now,
            modified: now,
            derived_from: None,
        },
        derived: None,
        modified: now,
    }
}

/// A catalog with `good` (valid PDF), `bad` (garbage bytes) and `note`
/// (not a PDF), plus agenda `agenda-1` holding `good` and `bad`.
fn seeded_catalog(dir: &Path) -> MemoryCatalog {
    std::fs::write(dir.join("good.pdf"), sample_pdf()).unwrap();
    std::fs::write(dir.join("bad.pdf"), b"not a pdf").unwrap();

    let catalog = MemoryCatalog::new();
    catalog.insert_document(document("good"));
    catalog.insert_document(document("bad"));
    let mut note = document("note");
    note.artifact.format = Some("text/plain".into());
    note.artifact.extension = Some("txt".into());
    catalog.insert_document(note);
    catalog.insert_collection(
        CollectionId::new("agenda-1").unwrap(),
        vec![
            DocumentId::new("good").unwrap(),
            DocumentId::new("bad").unwrap(),
        ],
    );
    catalog
}

fn config(dir: &Path, groups: &[&str]) -> AppConfig {
    AppConfig {
        storage_path: dir.to_path_buf(),
        authorized_groups: groups.iter().map(|g| g.to_string()).collect(),
        ..AppConfig::default()
    }
}

/// Helper: build the test app with group authorization disabled.
fn test_app(dir: &Path) -> (Router, MemoryCatalog) {
    let catalog = seeded_catalog(dir);
    let state = AppState::in_memory(config(dir, &[]), catalog.clone());
    (docstamp_api::app(state), catalog)
}

/// Helper: read response body as string.
async fn body_string(response: axum::http::Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: axum::http::Response<Body>) -> Value {
    serde_json::from_str(&body_string(response).await).unwrap()
}

fn post(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// Poll the job resource until it leaves Running.
async fn wait_for_terminal(app: &Router, job_id: &str) -> Value {
    for _ in 0..200 {
        let response = app
            .clone()
            .oneshot(get(&format!("/document-stamping-jobs/{job_id}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        if json["data"]["attributes"]["status"] != RUNNING {
            return json;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {job_id} never finished");
}

// -- Health Probes ------------------------------------------------------------

#[tokio::test]
async fn test_liveness_probe() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = test_app(dir.path());
    let response = app.oneshot(get("/health/liveness")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ok");
}

#[tokio::test]
async fn test_readiness_probe_without_database() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = test_app(dir.path());
    let response = app.oneshot(get("/health/readiness")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ready");
}

// -- Triggers -----------------------------------------------------------------

#[tokio::test]
async fn test_single_document_trigger_returns_running_job() {
    let dir = tempfile::tempdir().unwrap();
    let (app, catalog) = test_app(dir.path());

    let response = app.clone().oneshot(post("/documents/good/stamp")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["type"], "document-stamping-jobs");
    assert_eq!(json["data"]["attributes"]["status"], RUNNING);
    assert_eq!(json["data"]["attributes"]["message"], "Stamping 1 document(s)");
    let job_id = json["data"]["id"].as_str().unwrap().to_string();
    assert!(json["data"]["attributes"]["uri"]
        .as_str()
        .unwrap()
        .ends_with(&format!("/document-stamping-jobs/{job_id}")));

    let job = wait_for_terminal(&app, &job_id).await;
    let attributes = &job["data"]["attributes"];
    assert_eq!(attributes["status"], SUCCESS);
    assert!(attributes["ended"].is_string());
    assert_eq!(attributes["provenance"].as_array().unwrap().len(), 1);
    assert_eq!(attributes["provenance"][0]["source"], "http://example.org/files/good");

    let derived = catalog
        .document(&DocumentId::new("good").unwrap())
        .unwrap()
        .derived
        .unwrap();
    assert_eq!(derived.derived_from.as_deref(), Some("http://example.org/files/good"));
    assert_eq!(attributes["provenance"][0]["result"], derived.uri);
}

#[tokio::test]
async fn test_batch_failure_names_only_the_failed_document() {
    let dir = tempfile::tempdir().unwrap();
    let (app, catalog) = test_app(dir.path());

    let response = app
        .clone()
        .oneshot(post_json("/documents/stamp", r#"{"documentIds":["good","bad"]}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["attributes"]["message"], "Stamping 2 document(s)");
    let job_id = json["data"]["id"].as_str().unwrap().to_string();

    let job = wait_for_terminal(&app, &job_id).await;
    let attributes = &job["data"]["attributes"];
    assert_eq!(attributes["status"], FAIL);
    assert_eq!(attributes["failedDocuments"], serde_json::json!(["Nota bad"]));
    assert!(attributes["message"].as_str().unwrap().contains("Nota bad"));
    assert!(!attributes["message"].as_str().unwrap().contains("Nota good"));

    assert!(catalog.is_transformed("http://example.org/files/good"));
    assert!(!catalog.is_transformed("http://example.org/files/bad"));
}

#[tokio::test]
async fn test_retrigger_after_success_finds_nothing_to_stamp() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = test_app(dir.path());

    let response = app.clone().oneshot(post("/documents/good/stamp")).await.unwrap();
    let job_id = body_json(response).await["data"]["id"]
        .as_str()
        .unwrap()
        .to_string();
    wait_for_terminal(&app, &job_id).await;

    let response = app.oneshot(post("/documents/good/stamp")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "NO_ELIGIBLE_CANDIDATES");
    assert_eq!(json["error"]["message"], "No documents found to be stamped");
}

#[tokio::test]
async fn test_agenda_trigger_stamps_member_documents() {
    let dir = tempfile::tempdir().unwrap();
    let (app, catalog) = test_app(dir.path());

    let response = app
        .clone()
        .oneshot(post("/agendas/agenda-1/agendaitems/documents/stamp"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let job_id = body_json(response).await["data"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let job = wait_for_terminal(&app, &job_id).await;
    assert_eq!(job["data"]["attributes"]["status"], FAIL);
    assert!(catalog.is_transformed("http://example.org/files/good"));
}

// -- Error Bodies -------------------------------------------------------------

#[tokio::test]
async fn test_unknown_document_returns_404() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = test_app(dir.path());
    let response = app.oneshot(post("/documents/missing/stamp")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "NOT_FOUND");
    assert_eq!(
        json["error"]["message"],
        "documents with id 'missing' doesn't exist"
    );
}

#[tokio::test]
async fn test_unknown_agenda_returns_404() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = test_app(dir.path());
    let response = app
        .oneshot(post("/agendas/nope/agendaitems/documents/stamp"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_non_pdf_document_has_no_eligible_candidates() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = test_app(dir.path());
    let response = app.oneshot(post("/documents/note/stamp")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        body_json(response).await["error"]["code"],
        "NO_ELIGIBLE_CANDIDATES"
    );
}

#[tokio::test]
async fn test_malformed_body_returns_400() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = test_app(dir.path());
    let response = app
        .oneshot(post_json("/documents/stamp", "{not json"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_empty_document_ids_returns_422() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = test_app(dir.path());
    let response = app
        .oneshot(post_json("/documents/stamp", r#"{"documentIds":[]}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(response).await["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_unknown_or_invalid_job_returns_404() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = test_app(dir.path());
    for id in ["not-a-uuid", "6f1c2d0e-8a7b-4c3d-9e5f-102030405060"] {
        let response = app
            .clone()
            .oneshot(get(&format!("/document-stamping-jobs/{id}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"]["code"], "NOT_FOUND");
    }
}

// -- Authorization ------------------------------------------------------------

#[tokio::test]
async fn test_group_authorization() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = seeded_catalog(dir.path());
    let state = AppState::in_memory(config(dir.path(), &["admin"]), catalog);
    let app = docstamp_api::app(state);

    let response = app.clone().oneshot(post("/documents/good/stamp")).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "FORBIDDEN");

    let request = Request::builder()
        .method("POST")
        .uri("/documents/good/stamp")
        .header(ALLOWED_GROUPS_HEADER, r#"[{"name":"public"}]"#)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let request = Request::builder()
        .method("POST")
        .uri("/documents/good/stamp")
        .header(ALLOWED_GROUPS_HEADER, r#"[{"name":"public"},{"name":"admin"}]"#)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Probes stay reachable without the header.
    let response = app.oneshot(get("/health/liveness")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// -- Metrics & OpenAPI ---------------------------------------------------------

#[tokio::test]
async fn test_metrics_count_requests_and_errors() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = seeded_catalog(dir.path());
    let state = AppState::in_memory(config(dir.path(), &[]), catalog);
    let metrics = ApiMetrics::new();
    let app = docstamp_api::app_with_metrics(state, metrics.clone());

    app.clone().oneshot(get("/health/liveness")).await.unwrap();
    app.clone()
        .oneshot(post("/documents/missing/stamp"))
        .await
        .unwrap();
    assert_eq!(metrics.requests(), 2);
    assert_eq!(metrics.errors(), 1);

    let response = app.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["requests"], 2);
    assert_eq!(json["errors"], 1);
}

#[tokio::test]
async fn test_openapi_spec_is_served() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = test_app(dir.path());
    let response = app.oneshot(get("/openapi.json")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert!(json["paths"]["/documents/stamp"]["post"].is_object());
    assert!(json["paths"]["/document-stamping-jobs/{job_id}"]["get"].is_object());
}
