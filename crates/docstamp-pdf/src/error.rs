//! Stamping errors.

use thiserror::Error;

/// Errors raised while stamping a PDF.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StampError {
    /// The input could not be parsed as a PDF.
    #[error("malformed PDF: {0}")]
    Malformed(String),

    /// The document has no pages to stamp.
    #[error("PDF has no pages")]
    NoPages,

    /// The page structure could not be updated.
    #[error("failed to update page structure: {0}")]
    Structure(String),

    /// The stamped document could not be serialized.
    #[error("failed to serialize stamped PDF: {0}")]
    Encode(String),
}
