//! # docstamp-pipeline — Stamping Job Pipeline
//!
//! Discovers documents eligible for stamping, creates a job, stamps each
//! document's artifact, and records provenance and the job outcome so that
//! a later run never reprocesses a stamped document but always retries a
//! failed one.
//!
//! ## Collaborators
//!
//! | Trait | Role | Implementations |
//! |---|---|---|
//! | [`Catalog`] | eligibility, "already transformed" record | [`MemoryCatalog`], Postgres (docstamp-api) |
//! | [`Ledger`] | jobs, terminal status, provenance | [`MemoryLedger`], Postgres (docstamp-api) |
//! | [`ArtifactStore`] | physical bytes | [`FsArtifactStore`], [`MemoryArtifactStore`] |
//! | [`Transformer`] | stamped bytes | [`PdfStamper`](docstamp_pdf::PdfStamper) |
//!
//! ## Failure isolation
//!
//! A document that fails at any step is recorded in the batch's failure
//! list and the loop moves on. The job is finalized exactly once, with
//! `Success` when nothing failed and `Fail` plus the failed markers
//! otherwise. Failed documents are never marked transformed, so the next
//! invocation picks them up again.

pub mod collaborators;
pub mod error;
pub mod memory;
pub mod pipeline;
pub mod store;
pub mod summary;

pub use collaborators::{ArtifactStore, Catalog, Ledger, Transformer};
pub use error::{
    CatalogError, DocumentFailure, LedgerError, PipelineError, StorageError, TransformError,
    UnknownStorageMode,
};
pub use memory::{MarkCall, MemoryCatalog, MemoryLedger};
pub use pipeline::{PreparedJob, StampingPipeline};
pub use store::{FsArtifactStore, MemoryArtifactStore, StorageMode, SHARE_SCHEME};
pub use summary::{
    summarize, FailedDocument, JobSummary, ProcessingSummary, StampedDocument,
};
