//! # In-Memory Collaborators
//!
//! [`MemoryCatalog`] and [`MemoryLedger`] back the service when no database
//! is configured, and serve as the collaborators in tests.
//!
//! All operations are synchronous under a `parking_lot::RwLock` that is never
//! held across an `.await`. Both types also keep a log of the mutating calls
//! they received, so callers can check how often the pipeline invoked them.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use docstamp_core::{Artifact, CollectionId, Document, DocumentId, JobId};
use docstamp_state::{JobError, JobOutcome, JobRecord, ProvenanceLink, Running, StampingJob};

use crate::collaborators::{Catalog, Ledger};
use crate::error::{CatalogError, LedgerError};

// ── Catalog ──────────────────────────────────────────────────────────

/// A recorded `mark_transformed` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkCall {
    /// The document that was marked.
    pub document: DocumentId,
    /// URI of the source artifact.
    pub source_uri: String,
    /// URI of the result artifact.
    pub result_uri: String,
}

#[derive(Debug, Default)]
struct CatalogData {
    /// Documents with an artifact, in insertion order.
    documents: Vec<Document>,
    /// Documents known to exist without any artifact.
    bare: HashSet<DocumentId>,
    collections: HashMap<CollectionId, Vec<DocumentId>>,
    /// Stamped-artifact records: source artifact URI to result artifact URI.
    stamped: HashMap<String, String>,
    marks: Vec<MarkCall>,
}

impl CatalogData {
    fn find(&self, id: &DocumentId) -> Option<&Document> {
        self.documents.iter().find(|d| &d.id == id)
    }

    fn eligible(&self, document: &Document) -> bool {
        document.artifact.is_pdf() && !self.stamped.contains_key(&document.artifact.uri)
    }

    fn resolve<'a>(&self, ids: impl IntoIterator<Item = &'a DocumentId>) -> Vec<Document> {
        let mut seen = HashSet::new();
        ids.into_iter()
            .filter(|id| seen.insert(*id))
            .filter_map(|id| self.find(id))
            .filter(|d| self.eligible(d))
            .cloned()
            .collect()
    }
}

/// Thread-safe, cloneable in-memory document catalog.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    data: Arc<RwLock<CatalogData>>,
}

impl MemoryCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a document.
    pub fn insert_document(&self, document: Document) {
        let mut data = self.data.write();
        data.bare.remove(&document.id);
        match data.documents.iter_mut().find(|d| d.id == document.id) {
            Some(existing) => *existing = document,
            None => data.documents.push(document),
        }
    }

    /// Register a document that exists but carries no artifact.
    pub fn insert_document_without_artifact(&self, id: DocumentId) {
        let mut data = self.data.write();
        data.documents.retain(|d| d.id != id);
        data.bare.insert(id);
    }

    /// Insert or replace a collection with its ordered members.
    pub fn insert_collection(&self, id: CollectionId, members: Vec<DocumentId>) {
        self.data.write().collections.insert(id, members);
    }

    /// Current state of a document.
    pub fn document(&self, id: &DocumentId) -> Option<Document> {
        self.data.read().find(id).cloned()
    }

    /// Whether a stamped-artifact record exists for this source URI.
    pub fn is_transformed(&self, source_uri: &str) -> bool {
        self.data.read().stamped.contains_key(source_uri)
    }

    /// Every `mark_transformed` call received, in order.
    pub fn mark_calls(&self) -> Vec<MarkCall> {
        self.data.read().marks.clone()
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn document_exists(&self, id: &DocumentId) -> Result<bool, CatalogError> {
        let data = self.data.read();
        Ok(data.find(id).is_some() || data.bare.contains(id))
    }

    async fn collection_exists(&self, id: &CollectionId) -> Result<bool, CatalogError> {
        Ok(self.data.read().collections.contains_key(id))
    }

    async fn resolve_by_ids(&self, ids: &[DocumentId]) -> Result<Vec<Document>, CatalogError> {
        Ok(self.data.read().resolve(ids))
    }

    async fn resolve_by_collection(
        &self,
        id: &CollectionId,
    ) -> Result<Vec<Document>, CatalogError> {
        let data = self.data.read();
        match data.collections.get(id) {
            Some(members) => Ok(data.resolve(members)),
            None => Ok(Vec::new()),
        }
    }

    async fn mark_transformed(
        &self,
        document: &DocumentId,
        source: &Artifact,
        result: &Artifact,
    ) -> Result<(), CatalogError> {
        let mut data = self.data.write();
        data.marks.push(MarkCall {
            document: document.clone(),
            source_uri: source.uri.clone(),
            result_uri: result.uri.clone(),
        });

        if let Some(previous) = data.stamped.get(&source.uri) {
            if previous == &result.uri {
                return Ok(());
            }
            return Err(CatalogError::Inconsistent(format!(
                "artifact {} already stamped into {previous}",
                source.uri
            )));
        }
        let index = data
            .documents
            .iter()
            .position(|d| &d.id == document)
            .ok_or_else(|| CatalogError::Inconsistent(format!("unknown document {document}")))?;
        data.stamped.insert(source.uri.clone(), result.uri.clone());

        let entry = &mut data.documents[index];
        entry.modified = Utc::now();
        if result.uri == source.uri {
            entry.artifact = result.clone();
        } else {
            entry.derived = Some(result.clone());
        }
        Ok(())
    }
}

// ── Ledger ───────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct LedgerData {
    jobs: HashMap<JobId, JobRecord>,
    links: Vec<ProvenanceLink>,
    attach_calls: usize,
    finalize_calls: Vec<JobId>,
}

/// Thread-safe, cloneable in-memory job ledger.
#[derive(Debug, Clone)]
pub struct MemoryLedger {
    resource_base: String,
    data: Arc<RwLock<LedgerData>>,
}

impl MemoryLedger {
    /// Create an empty ledger minting job URIs under `resource_base`.
    pub fn new(resource_base: impl Into<String>) -> Self {
        Self {
            resource_base: resource_base.into(),
            data: Arc::new(RwLock::new(LedgerData::default())),
        }
    }

    /// Number of jobs ever created.
    pub fn job_count(&self) -> usize {
        self.data.read().jobs.len()
    }

    /// Number of `attach_provenance` calls received, duplicates included.
    pub fn attach_calls(&self) -> usize {
        self.data.read().attach_calls
    }

    /// Jobs passed to `finalize`, in call order, rejected calls included.
    pub fn finalize_calls(&self) -> Vec<JobId> {
        self.data.read().finalize_calls.clone()
    }

    /// Every provenance link recorded, across all jobs.
    pub fn links(&self) -> Vec<ProvenanceLink> {
        self.data.read().links.clone()
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn create_job(&self) -> Result<StampingJob<Running>, LedgerError> {
        let job = StampingJob::start(&self.resource_base);
        self.data.write().jobs.insert(job.id(), job.record());
        Ok(job)
    }

    async fn finalize(
        &self,
        id: JobId,
        outcome: &JobOutcome,
        ended: DateTime<Utc>,
    ) -> Result<JobRecord, LedgerError> {
        let mut data = self.data.write();
        data.finalize_calls.push(id);
        let record = data.jobs.get_mut(&id).ok_or(LedgerError::UnknownJob(id))?;
        record
            .apply(outcome.clone(), ended)
            .map_err(|err| match err {
                JobError::AlreadyTerminal { id, status } => {
                    LedgerError::AlreadyFinalized { id, status }
                }
            })?;
        Ok(record.clone())
    }

    async fn attach_provenance(
        &self,
        job_uri: &str,
        source_uri: &str,
        result_uri: &str,
    ) -> Result<(), LedgerError> {
        let mut data = self.data.write();
        data.attach_calls += 1;
        if !data.jobs.values().any(|j| j.uri == job_uri) {
            return Err(LedgerError::Unavailable(format!("no job with uri {job_uri}")));
        }
        if !data
            .links
            .iter()
            .any(|l| l.same_pair(job_uri, source_uri, result_uri))
        {
            data.links
                .push(ProvenanceLink::new(job_uri, source_uri, result_uri));
        }
        Ok(())
    }

    async fn job(&self, id: JobId) -> Result<Option<JobRecord>, LedgerError> {
        Ok(self.data.read().jobs.get(&id).cloned())
    }

    async fn provenance(&self, id: JobId) -> Result<Vec<ProvenanceLink>, LedgerError> {
        let data = self.data.read();
        let record = data.jobs.get(&id).ok_or(LedgerError::UnknownJob(id))?;
        Ok(data
            .links
            .iter()
            .filter(|l| l.job_uri == record.uri)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use docstamp_core::{JobStatus, DEFAULT_RESOURCE_BASE};

    use super::*;

    fn doc(id: &str, extension: &str) -> Document {
        let now = Utc::now();
        Document {
            id: DocumentId::new(id).unwrap(),
            uri: format!("http://example.org/documents/{id}"),
            name: format!("Nota {id}"),
            artifact: Artifact {
                uri: format!("http://example.org/files/{id}"),
                id: id.into(),
                file_name: format!("{id}.{extension}"),
                format: None,
                extension: Some(extension.into()),
                size: None,
                physical_uri: format!("share://{id}.{extension}"),
                created: now,
                modified: now,
                derived_from: None,
            },
            derived: None,
            modified: now,
        }
    }

    fn derived_from(source: &Artifact) -> Artifact {
        Artifact {
            uri: format!("{}-stamped", source.uri),
            derived_from: Some(source.uri.clone()),
            ..source.clone()
        }
    }

    #[tokio::test]
    async fn resolution_filters_ineligible_documents() {
        let catalog = MemoryCatalog::new();
        catalog.insert_document(doc("a", "pdf"));
        catalog.insert_document(doc("b", "docx"));
        catalog.insert_document_without_artifact(DocumentId::new("c").unwrap());
        let ids: Vec<DocumentId> = ["c", "b", "a", "missing"]
            .into_iter()
            .map(|i| DocumentId::new(i).unwrap())
            .collect();

        let resolved = catalog.resolve_by_ids(&ids).await.unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].id.as_str(), "a");
        assert!(catalog.document_exists(&ids[0]).await.unwrap());
        assert!(!catalog.document_exists(&ids[3]).await.unwrap());
    }

    #[tokio::test]
    async fn collection_resolution_keeps_member_order() {
        let catalog = MemoryCatalog::new();
        for id in ["x", "y", "z"] {
            catalog.insert_document(doc(id, "pdf"));
        }
        let agenda = CollectionId::new("agenda-1").unwrap();
        catalog.insert_collection(
            agenda.clone(),
            ["z", "x"].into_iter().map(|i| DocumentId::new(i).unwrap()).collect(),
        );
        let resolved = catalog.resolve_by_collection(&agenda).await.unwrap();
        let ids: Vec<&str> = resolved.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, ["z", "x"]);
    }

    #[tokio::test]
    async fn mark_transformed_is_idempotent_and_excludes_document() {
        let catalog = MemoryCatalog::new();
        let a = doc("a", "pdf");
        catalog.insert_document(a.clone());
        let result = derived_from(&a.artifact);

        catalog.mark_transformed(&a.id, &a.artifact, &result).await.unwrap();
        catalog.mark_transformed(&a.id, &a.artifact, &result).await.unwrap();

        assert_eq!(catalog.mark_calls().len(), 2);
        assert!(catalog.is_transformed(&a.artifact.uri));
        assert_eq!(catalog.document(&a.id).unwrap().derived, Some(result));
        assert!(catalog.resolve_by_ids(&[a.id]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn mark_transformed_bumps_document_modified() {
        let catalog = MemoryCatalog::new();
        let mut a = doc("a", "pdf");
        a.modified = Utc::now() - chrono::Duration::hours(1);
        let before = a.modified;
        catalog.insert_document(a.clone());

        let result = derived_from(&a.artifact);
        catalog.mark_transformed(&a.id, &a.artifact, &result).await.unwrap();
        assert!(catalog.document(&a.id).unwrap().modified > before);
    }

    #[tokio::test]
    async fn in_place_mark_replaces_source_artifact() {
        let catalog = MemoryCatalog::new();
        let a = doc("a", "pdf");
        catalog.insert_document(a.clone());
        let mut result = a.artifact.clone();
        result.size = Some(2048);
        catalog.mark_transformed(&a.id, &a.artifact, &result).await.unwrap();
        let stored = catalog.document(&a.id).unwrap();
        assert_eq!(stored.artifact.size, Some(2048));
        assert!(stored.derived.is_none());
    }

    #[tokio::test]
    async fn ledger_finalizes_once() {
        let ledger = MemoryLedger::new(DEFAULT_RESOURCE_BASE);
        let job = ledger.create_job().await.unwrap();
        let id = job.id();

        let record = ledger
            .finalize(id, &JobOutcome::Success, Utc::now())
            .await
            .unwrap();
        assert_eq!(record.status, JobStatus::Success);

        let err = ledger
            .finalize(id, &JobOutcome::from_failures(vec!["x".into()]), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::AlreadyFinalized { status: JobStatus::Success, .. }));
        assert_eq!(ledger.job(id).await.unwrap().unwrap().status, JobStatus::Success);
        assert_eq!(ledger.finalize_calls().len(), 2);
    }

    #[tokio::test]
    async fn ledger_rejects_unknown_job() {
        let ledger = MemoryLedger::new(DEFAULT_RESOURCE_BASE);
        let err = ledger
            .finalize(JobId::new(), &JobOutcome::Success, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::UnknownJob(_)));
    }

    #[tokio::test]
    async fn provenance_attachment_is_idempotent() {
        let ledger = MemoryLedger::new(DEFAULT_RESOURCE_BASE);
        let job = ledger.create_job().await.unwrap();
        ledger.attach_provenance(job.uri(), "src", "res").await.unwrap();
        ledger.attach_provenance(job.uri(), "src", "res").await.unwrap();
        let links = ledger.provenance(job.id()).await.unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(ledger.attach_calls(), 2);
    }
}
