//! # docstamp-api — HTTP Service for Document Stamping
//!
//! Exposes the stamping pipeline over HTTP. A trigger resolves its
//! candidate documents, creates a job, answers with the running job and
//! stamps the documents on a detached task. Clients poll the job resource
//! for the outcome.
//!
//! ## API Surface
//!
//! | Route | Module | Auth |
//! |---|---|---|
//! | `POST /documents/:document_id/stamp` | [`routes::stamping`] | group |
//! | `POST /documents/stamp` | [`routes::stamping`] | group |
//! | `POST /agendas/:agenda_id/agendaitems/documents/stamp` | [`routes::stamping`] | group |
//! | `GET /document-stamping-jobs/:job_id` | [`routes::jobs`] | group |
//! | `GET /health/liveness`, `GET /health/readiness` | here | none |
//! | `GET /metrics` | here | none |
//! | `GET /openapi.json` | [`openapi`] | none |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → AuthMiddleware → Handler
//! ```

pub mod auth;
pub mod db;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};

use crate::auth::AuthConfig;
use crate::middleware::metrics::{ApiMetrics, MetricsSnapshot};
use crate::state::AppState;

/// Assemble the full application router with fresh metrics.
pub fn app(state: AppState) -> Router {
    app_with_metrics(state, ApiMetrics::new())
}

/// Assemble the full application router, counting into `metrics`.
///
/// Health probes, `/metrics` and `/openapi.json` are mounted outside the
/// auth middleware so they remain reachable without group headers.
pub fn app_with_metrics(state: AppState, metrics: ApiMetrics) -> Router {
    let auth_config = AuthConfig {
        authorized_groups: state.config.authorized_groups.clone(),
    };

    let api = Router::new()
        .merge(routes::stamping::router())
        .merge(routes::jobs::router())
        .layer(from_fn(auth::auth_middleware))
        .layer(Extension(auth_config))
        .with_state(state.clone());

    let unauthenticated = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .route("/metrics", get(metrics_json))
        .merge(openapi::router())
        .with_state(state);

    Router::new()
        .merge(unauthenticated)
        .merge(api)
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(middleware::tracing_layer::layer())
        .layer(Extension(metrics))
}

/// Liveness probe: always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe: verifies the database answers when one is configured.
///
/// Returns 200 "ready" or 503 with a diagnostic message.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    if let Some(pool) = &state.db_pool {
        if let Err(e) = sqlx::query("SELECT 1").execute(pool).await {
            tracing::warn!("Database health check failed: {e}");
            return (StatusCode::SERVICE_UNAVAILABLE, "database unreachable").into_response();
        }
    }
    (StatusCode::OK, "ready").into_response()
}

/// GET /metrics — Current request and error counters.
async fn metrics_json(Extension(metrics): Extension<ApiMetrics>) -> Json<MetricsSnapshot> {
    Json(metrics.snapshot())
}
