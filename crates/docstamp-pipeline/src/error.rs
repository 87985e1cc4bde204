//! # Pipeline Errors
//!
//! One error enum per collaborator, plus [`DocumentFailure`] for errors that
//! stay local to a single document and [`PipelineError`] for errors that
//! reject an invocation before any job exists.

use std::path::PathBuf;

use docstamp_core::{JobId, JobStatus, ValidationError};
use docstamp_pdf::StampError;
use thiserror::Error;

/// Errors raised by a [`Catalog`](crate::Catalog).
#[derive(Error, Debug, Clone)]
pub enum CatalogError {
    /// The catalog backend could not be reached.
    #[error("catalog unavailable: {0}")]
    Unavailable(String),

    /// The catalog holds data the pipeline cannot interpret.
    #[error("inconsistent catalog data: {0}")]
    Inconsistent(String),
}

/// Errors raised by a [`Ledger`](crate::Ledger).
#[derive(Error, Debug, Clone)]
pub enum LedgerError {
    /// The ledger backend could not be reached.
    #[error("job ledger unavailable: {0}")]
    Unavailable(String),

    /// No job with this id was ever created.
    #[error("unknown job {0}")]
    UnknownJob(JobId),

    /// The job already reached a terminal status.
    #[error("job {id} is already finalized with status {}", status.label())]
    AlreadyFinalized {
        /// The job identifier.
        id: JobId,
        /// The status it was finalized with.
        status: JobStatus,
    },
}

/// Errors raised by an [`ArtifactStore`](crate::ArtifactStore).
#[derive(Error, Debug)]
pub enum StorageError {
    /// Reading or writing a physical file failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// The file being accessed.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The physical location does not resolve inside the storage root.
    #[error("invalid physical location '{0}'")]
    InvalidLocation(String),
}

/// Errors raised by a [`Transformer`](crate::Transformer).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    /// The source bytes could not be parsed.
    #[error("malformed input: {0}")]
    Malformed(String),

    /// The source is well-formed but cannot be stamped.
    #[error("unsupported input: {0}")]
    Unsupported(String),

    /// Producing the output failed.
    #[error("rendering failed: {0}")]
    Rendering(String),
}

impl From<StampError> for TransformError {
    fn from(err: StampError) -> Self {
        match err {
            StampError::Malformed(msg) => Self::Malformed(msg),
            StampError::NoPages => Self::Unsupported(err.to_string()),
            StampError::Structure(_) | StampError::Encode(_) => Self::Rendering(err.to_string()),
        }
    }
}

/// Why a single document could not be stamped. Never aborts the batch.
#[derive(Error, Debug)]
pub enum DocumentFailure {
    /// The source bytes could not be read.
    #[error("reading source artifact: {0}")]
    Read(#[source] StorageError),

    /// The transformer rejected the source.
    #[error("transforming artifact: {0}")]
    Transform(#[from] TransformError),

    /// The transformed bytes could not be stored.
    #[error("persisting stamped artifact: {0}")]
    Persist(#[source] StorageError),

    /// The catalog could not record the transformation.
    #[error("marking document transformed: {0}")]
    Catalog(#[from] CatalogError),

    /// The ledger could not record provenance.
    #[error("attaching provenance: {0}")]
    Provenance(#[from] LedgerError),

    /// The blocking transform worker did not complete.
    #[error("transform worker failed: {0}")]
    Worker(String),
}

/// Errors that reject an invocation. No job exists when one is returned.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A selected entity does not exist at all.
    #[error("{kind} with id '{id}' doesn't exist")]
    NotFound {
        /// The entity kind (`documents` or `agendas`).
        kind: &'static str,
        /// The missing identifier, or the comma-separated requested ids.
        id: String,
    },

    /// Every selected document is already stamped or has no eligible artifact.
    #[error("No documents found to be stamped")]
    NoEligibleCandidates,

    /// The selector was malformed.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The catalog failed during the pre-check or resolution.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// The job could not be created.
    #[error(transparent)]
    LedgerUnavailable(#[from] LedgerError),
}

/// A storage mode name that is neither `derived` nor `in-place`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown storage mode '{0}', expected 'derived' or 'in-place'")]
pub struct UnknownStorageMode(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stamp_errors_map_to_transform_taxonomy() {
        assert!(matches!(
            TransformError::from(StampError::Malformed("bad xref".into())),
            TransformError::Malformed(_)
        ));
        assert!(matches!(
            TransformError::from(StampError::NoPages),
            TransformError::Unsupported(_)
        ));
        assert!(matches!(
            TransformError::from(StampError::Encode("io".into())),
            TransformError::Rendering(_)
        ));
    }

    #[test]
    fn not_found_names_kind_and_id() {
        let err = PipelineError::NotFound {
            kind: "agendas",
            id: "a-1".into(),
        };
        assert_eq!(err.to_string(), "agendas with id 'a-1' doesn't exist");
    }

    #[test]
    fn no_candidates_message() {
        assert_eq!(
            PipelineError::NoEligibleCandidates.to_string(),
            "No documents found to be stamped"
        );
    }
}
