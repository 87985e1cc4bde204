//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers
//! via the `State` extractor.
//!
//! AppState holds the [`StampingPipeline`] (with its collaborators already
//! wired) and the immutable [`AppConfig`]. Which catalog and ledger back the
//! pipeline is decided once at startup: Postgres when `DATABASE_URL` is set,
//! in-memory otherwise.

use std::path::PathBuf;
use std::sync::Arc;

use sqlx::PgPool;
use thiserror::Error;

use docstamp_core::DEFAULT_RESOURCE_BASE;
use docstamp_pdf::PdfStamper;
use docstamp_pipeline::{
    ArtifactStore, Catalog, FsArtifactStore, Ledger, MemoryCatalog, MemoryLedger, StampingPipeline,
    StorageMode, Transformer,
};

use crate::db::{PgCatalog, PgLedger};

// ── Configuration ────────────────────────────────────────────────────

/// Default shared-volume mount holding the physical files.
pub const DEFAULT_STORAGE_PATH: &str = "/share";

/// Runtime configuration for the API server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Base of every URI the service mints.
    pub resource_base: String,
    /// Root directory that `share://` locations resolve against.
    pub storage_path: PathBuf,
    /// Whether stamped bytes get a new artifact or replace the source.
    pub storage_mode: StorageMode,
    /// Groups allowed to trigger stamping. Empty disables the check.
    pub authorized_groups: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            resource_base: DEFAULT_RESOURCE_BASE.to_string(),
            storage_path: PathBuf::from(DEFAULT_STORAGE_PATH),
            storage_mode: StorageMode::default(),
            authorized_groups: Vec::new(),
        }
    }
}

/// Error building [`AppConfig`] from the environment.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable is set to a value that cannot be used.
    #[error("invalid value '{value}' for {name}: {reason}")]
    Invalid {
        /// The environment variable.
        name: &'static str,
        /// The rejected value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl AppConfig {
    /// Build configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// Unset or blank variables fall back to defaults. Set but unusable
    /// values are errors.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let port = match get("PORT") {
            Some(value) => value.trim().parse().map_err(|e: std::num::ParseIntError| {
                ConfigError::Invalid {
                    name: "PORT",
                    value,
                    reason: e.to_string(),
                }
            })?,
            None => defaults.port,
        };

        let resource_base = match get("DOCSTAMP_RESOURCE_BASE") {
            Some(value) if value.starts_with("http://") || value.starts_with("https://") => {
                value.trim_end_matches('/').to_string()
            }
            Some(value) => {
                return Err(ConfigError::Invalid {
                    name: "DOCSTAMP_RESOURCE_BASE",
                    value,
                    reason: "must be an http(s) URI".into(),
                })
            }
            None => defaults.resource_base,
        };

        let storage_path = get("DOCSTAMP_STORAGE_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.storage_path);

        let storage_mode = match get("DOCSTAMP_STORAGE_MODE") {
            Some(value) => value.parse().map_err(|e: docstamp_pipeline::UnknownStorageMode| {
                ConfigError::Invalid {
                    name: "DOCSTAMP_STORAGE_MODE",
                    value,
                    reason: e.to_string(),
                }
            })?,
            None => defaults.storage_mode,
        };

        let authorized_groups = get("DOCSTAMP_AUTHORIZED_GROUPS")
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|g| !g.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            port,
            resource_base,
            storage_path,
            storage_mode,
            authorized_groups,
        })
    }
}

// ── Application State ────────────────────────────────────────────────

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The stamping pipeline with its collaborators.
    pub pipeline: StampingPipeline,
    /// Immutable runtime configuration.
    pub config: Arc<AppConfig>,
    /// Database pool, when running against Postgres.
    pub db_pool: Option<PgPool>,
}

impl AppState {
    /// Assemble state from explicit collaborators.
    pub fn with_collaborators(
        config: AppConfig,
        catalog: Arc<dyn Catalog>,
        ledger: Arc<dyn Ledger>,
        store: Arc<dyn ArtifactStore>,
        transformer: Arc<dyn Transformer>,
    ) -> Self {
        Self {
            pipeline: StampingPipeline::new(catalog, ledger, store, transformer),
            config: Arc::new(config),
            db_pool: None,
        }
    }

    /// State with an in-memory catalog and ledger.
    pub fn in_memory(config: AppConfig, catalog: MemoryCatalog) -> Self {
        let ledger = MemoryLedger::new(config.resource_base.clone());
        let store = file_store(&config);
        Self::with_collaborators(
            config,
            Arc::new(catalog),
            Arc::new(ledger),
            Arc::new(store),
            Arc::new(PdfStamper::new()),
        )
    }

    /// State backed by Postgres.
    pub fn with_pool(config: AppConfig, pool: PgPool) -> Self {
        let catalog = PgCatalog::new(pool.clone());
        let ledger = PgLedger::new(pool.clone(), config.resource_base.clone());
        let store = file_store(&config);
        let mut state = Self::with_collaborators(
            config,
            Arc::new(catalog),
            Arc::new(ledger),
            Arc::new(store),
            Arc::new(PdfStamper::new()),
        );
        state.db_pool = Some(pool);
        state
    }
}

fn file_store(config: &AppConfig) -> FsArtifactStore {
    FsArtifactStore::new(
        config.storage_path.clone(),
        config.storage_mode,
        config.resource_base.clone(),
    )
}
