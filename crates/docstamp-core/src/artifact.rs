//! # Artifacts and Documents
//!
//! An [`Artifact`] is a stored file: its logical identity (`uri`), display
//! metadata, and the location of its physical bytes. A [`Document`] owns one
//! source artifact and, once stamped in derived mode, a derived artifact.
//!
//! Derivation is a directed, append-only edge: a derived artifact names its
//! source through `derived_from` and the edge is never rewritten.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::DocumentId;

/// Media type prefix identifying PDF artifacts.
pub const PDF_FORMAT: &str = "application/pdf";

/// File extension identifying PDF artifacts.
pub const PDF_EXTENSION: &str = "pdf";

/// A stored file associated with a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Logical identity of the artifact.
    pub uri: String,
    /// Short identifier of the artifact.
    pub id: String,
    /// Display file name.
    pub file_name: String,
    /// Media type, when known.
    #[serde(default)]
    pub format: Option<String>,
    /// File extension without the leading dot, when known.
    #[serde(default)]
    pub extension: Option<String>,
    /// Size in bytes, when known.
    #[serde(default)]
    pub size: Option<u64>,
    /// Location of the physical bytes (e.g. `share://abc.pdf`).
    pub physical_uri: String,
    /// When the artifact was created.
    pub created: DateTime<Utc>,
    /// When the artifact bytes were last modified.
    pub modified: DateTime<Utc>,
    /// Source artifact this one was derived from, if any.
    #[serde(default)]
    pub derived_from: Option<String>,
}

impl Artifact {
    /// Whether the artifact's format or extension identifies it as a PDF.
    ///
    /// Matches either a `application/pdf*` media type or a `pdf` extension,
    /// so artifacts missing one of the two are still recognised.
    pub fn is_pdf(&self) -> bool {
        let format_matches = self
            .format
            .as_deref()
            .is_some_and(|f| f.starts_with(PDF_FORMAT));
        let extension_matches = self
            .extension
            .as_deref()
            .is_some_and(|e| e == PDF_EXTENSION);
        format_matches || extension_matches
    }

    /// Whether this artifact was derived from another one.
    pub fn is_derived(&self) -> bool {
        self.derived_from.is_some()
    }
}

/// A catalog document eligible (or not) for stamping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Catalog identifier.
    pub id: DocumentId,
    /// Logical identity of the document.
    pub uri: String,
    /// Display name (title) of the document.
    pub name: String,
    /// The source artifact to stamp.
    pub artifact: Artifact,
    /// Artifact produced by an earlier stamping run, if any.
    #[serde(default)]
    pub derived: Option<Artifact>,
    /// When the document was last modified. Stamping bumps it.
    pub modified: DateTime<Utc>,
}
