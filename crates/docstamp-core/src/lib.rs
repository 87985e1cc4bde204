#![deny(missing_docs)]

//! # docstamp-core — Foundational Types for the Document Stamping Service
//!
//! Every other crate in the workspace depends on the types defined here.
//! The crate performs no I/O and has no internal crate dependencies.
//!
//! ## Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** A [`DocumentId`] cannot be passed
//!    where a [`CollectionId`] is expected, and a [`JobId`] is always a UUID.
//!
//! 2. **One status vocabulary.** [`JobStatus`] is a closed enum. The COGS
//!    URIs used on the wire are derived from it, never stored as free strings.
//!
//! 3. **Selectors are tagged unions.** [`CandidateSelector`] is either an
//!    explicit id set or a parent collection, resolved through one entry point.

pub mod artifact;
pub mod error;
pub mod identity;
pub mod marker;
pub mod selector;
pub mod status;

pub use artifact::{Artifact, Document, PDF_EXTENSION, PDF_FORMAT};
pub use error::ValidationError;
pub use identity::{CollectionId, DocumentId, JobId};
pub use marker::Marker;
pub use selector::CandidateSelector;
pub use status::JobStatus;

/// Default base for every URI minted by the service (jobs, files).
pub const DEFAULT_RESOURCE_BASE: &str = "http://mu.semte.ch/services/document-stamping-service";

/// JSON:API type name of stamping jobs; also the path segment of job URIs.
pub const JOB_RESOURCE_TYPE: &str = "document-stamping-jobs";

/// Build a resource URI of the form `{base}/{kind}/{id}`.
///
/// A trailing slash on `base` is tolerated.
pub fn resource_uri(base: &str, kind: &str, id: impl std::fmt::Display) -> String {
    format!("{}/{kind}/{id}", base.trim_end_matches('/'))
}
