//! # Markers
//!
//! The marker is the text stamped onto a document's artifact. It is derived
//! only from the document's own identity, so the same document always
//! yields the same marker across runs.

use serde::{Deserialize, Serialize};

use crate::artifact::Document;

/// Text written onto a stamped artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Marker(String);

impl Marker {
    /// Derive the marker for a document: its trimmed display name, or its
    /// id when the name is blank.
    pub fn for_document(document: &Document) -> Self {
        let name = document.name.trim();
        if name.is_empty() {
            Self(document.id.as_str().to_string())
        } else {
            Self(name.to_string())
        }
    }

    /// Access the marker text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the marker, returning its text.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for Marker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::artifact::Artifact;
    use crate::identity::DocumentId;

    fn document(name: &str) -> Document {
        let now = Utc::now();
        Document {
            id: DocumentId::new("doc-7").unwrap(),
            uri: "http://example.org/documents/doc-7".into(),
            name: name.into(),
            artifact: Artifact {
                uri: "http://example.org/files/7".into(),
                id: "7".into(),
                file_name: "x.pdf".into(),
                format: None,
                extension: Some("pdf".into()),
                size: None,
                physical_uri: "share://7.pdf".into(),
                created: now,
                modified: now,
                derived_from: None,
            },
            derived: None,
            modified: now,
        }
    }

    #[test]
    fn marker_uses_trimmed_name() {
        let marker = Marker::for_document(&document("  VR 2024 0101 DOC.0001/1 "));
        assert_eq!(marker.as_str(), "VR 2024 0101 DOC.0001/1");
    }

    #[test]
    fn blank_name_falls_back_to_id() {
        assert_eq!(Marker::for_document(&document("  ")).as_str(), "doc-7");
    }

    #[test]
    fn marker_is_deterministic() {
        let doc = document("Nota");
        assert_eq!(Marker::for_document(&doc), Marker::for_document(&doc.clone()));
    }
}
