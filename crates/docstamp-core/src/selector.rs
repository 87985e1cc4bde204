//! # Candidate Selectors
//!
//! A selector names the documents a stamping request targets: either an
//! explicit set of document ids or a parent collection whose members the
//! catalog expands. Selectors are transient and never persisted.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::identity::{CollectionId, DocumentId};

/// The documents targeted by one stamping request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSelector {
    /// An explicit, duplicate-free list of document ids in request order.
    Documents(Vec<DocumentId>),
    /// A parent collection whose member documents are the candidates.
    Collection(CollectionId),
}

impl CandidateSelector {
    /// Build an explicit id selector.
    ///
    /// Duplicates are dropped keeping the first occurrence. An empty list
    /// is rejected with [`ValidationError::EmptySelector`].
    pub fn documents(ids: impl IntoIterator<Item = DocumentId>) -> Result<Self, ValidationError> {
        let mut unique: Vec<DocumentId> = Vec::new();
        for id in ids {
            if !unique.contains(&id) {
                unique.push(id);
            }
        }
        if unique.is_empty() {
            return Err(ValidationError::EmptySelector);
        }
        Ok(Self::Documents(unique))
    }

    /// Build a selector for a single document.
    pub fn document(id: DocumentId) -> Self {
        Self::Documents(vec![id])
    }

    /// Build a collection selector.
    pub fn collection(id: CollectionId) -> Self {
        Self::Collection(id)
    }
}

impl std::fmt::Display for CandidateSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Documents(ids) => {
                let joined: Vec<&str> = ids.iter().map(DocumentId::as_str).collect();
                write!(f, "documents [{}]", joined.join(", "))
            }
            Self::Collection(id) => write!(f, "collection {id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[&str]) -> Vec<DocumentId> {
        raw.iter().map(|s| DocumentId::new(*s).unwrap()).collect()
    }

    #[test]
    fn documents_selector_dedups_preserving_order() {
        let selector = CandidateSelector::documents(ids(&["b", "a", "b", "c", "a"])).unwrap();
        assert_eq!(selector, CandidateSelector::Documents(ids(&["b", "a", "c"])));
    }

    #[test]
    fn empty_documents_selector_is_rejected() {
        assert_eq!(
            CandidateSelector::documents(Vec::new()),
            Err(ValidationError::EmptySelector)
        );
    }

    #[test]
    fn display_names_the_selection() {
        let selector = CandidateSelector::documents(ids(&["doc-1", "doc-2"])).unwrap();
        assert_eq!(selector.to_string(), "documents [doc-1, doc-2]");
        let selector = CandidateSelector::collection(CollectionId::new("agenda-9").unwrap());
        assert_eq!(selector.to_string(), "collection agenda-9");
    }
}
