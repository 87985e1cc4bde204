//! # docstamp-api — Binary Entry Point
//!
//! Starts the Axum HTTP server for the document stamping service.
//! Binds to configurable port (default 8080).

use docstamp_api::state::{AppConfig, AppState};
use docstamp_pipeline::MemoryCatalog;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured tracing.
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let json_logs = std::env::var("DOCSTAMP_LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json_logs {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    // Build configuration from environment.
    let config = AppConfig::from_env().map_err(|e| {
        tracing::error!("Invalid configuration: {e}");
        e
    })?;
    let port = config.port;

    if config.authorized_groups.is_empty() {
        tracing::warn!("DOCSTAMP_AUTHORIZED_GROUPS not set, group authorization is disabled");
    }

    // Initialize database pool (optional, absent means in-memory only).
    let db_pool = docstamp_api::db::init_pool().await.map_err(|e| {
        tracing::error!("Database initialization failed: {e}");
        e
    })?;

    let state = match db_pool {
        Some(pool) => AppState::with_pool(config, pool),
        None => {
            tracing::warn!("Using an empty in-memory document catalog");
            AppState::in_memory(config, MemoryCatalog::new())
        }
    };
    tracing::info!(
        storage_path = %state.config.storage_path.display(),
        storage_mode = %state.config.storage_mode,
        "artifact storage configured"
    );

    let app = docstamp_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Document stamping service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
