//! # Validation Errors
//!
//! Raised when a domain primitive is constructed from invalid input.
//! Each variant carries the offending value so operators can diagnose
//! bad requests without guesswork.

use thiserror::Error;

/// Validation errors for identifiers and selectors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A document id was empty or whitespace only.
    #[error("document id must not be empty")]
    EmptyDocumentId,

    /// A collection id was empty or whitespace only.
    #[error("collection id must not be empty")]
    EmptyCollectionId,

    /// A job id was not a valid UUID.
    #[error("invalid job id: \"{0}\" (expected a UUID)")]
    InvalidJobId(String),

    /// An explicit id selector contained no ids.
    #[error("at least one document id is required")]
    EmptySelector,
}
