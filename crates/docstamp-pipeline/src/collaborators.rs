//! # Collaborator Contracts
//!
//! The pipeline owns no storage. It drives four collaborators through the
//! traits below: the document [`Catalog`], the job [`Ledger`], the physical
//! [`ArtifactStore`] and the [`Transformer`] that produces stamped bytes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use docstamp_core::{Artifact, CollectionId, Document, DocumentId, JobId, Marker};
use docstamp_pdf::PdfStamper;
use docstamp_state::{JobOutcome, JobRecord, ProvenanceLink, Running, StampingJob};

use crate::error::{CatalogError, LedgerError, StorageError, TransformError};

/// Document catalog: existence checks, eligibility-filtered resolution, and
/// the "already transformed" record.
///
/// Both resolution methods return only eligible documents: a PDF source
/// artifact whose URI has no stamped-artifact record.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Whether a document with this id exists, eligible or not.
    async fn document_exists(&self, id: &DocumentId) -> Result<bool, CatalogError>;

    /// Whether a collection with this id exists.
    async fn collection_exists(&self, id: &CollectionId) -> Result<bool, CatalogError>;

    /// Eligible documents among `ids`, in the order given.
    async fn resolve_by_ids(&self, ids: &[DocumentId]) -> Result<Vec<Document>, CatalogError>;

    /// Eligible members of a collection, in member order.
    async fn resolve_by_collection(&self, id: &CollectionId)
        -> Result<Vec<Document>, CatalogError>;

    /// Record that `source` of `document` was stamped into `result`.
    ///
    /// Idempotent: repeating the call with the same pair changes nothing.
    async fn mark_transformed(
        &self,
        document: &DocumentId,
        source: &Artifact,
        result: &Artifact,
    ) -> Result<(), CatalogError>;
}

/// Job ledger: job persistence, terminal transitions, and provenance.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Allocate and persist a new running job.
    ///
    /// Either the job is fully persisted or an error is returned and nothing
    /// is.
    async fn create_job(&self) -> Result<StampingJob<Running>, LedgerError>;

    /// Move a running job to its terminal status.
    ///
    /// Fails with [`LedgerError::AlreadyFinalized`] for a finalized job.
    async fn finalize(
        &self,
        id: JobId,
        outcome: &JobOutcome,
        ended: DateTime<Utc>,
    ) -> Result<JobRecord, LedgerError>;

    /// Record that a job used `source_uri` and generated `result_uri`.
    ///
    /// Idempotent on the `(job, source, result)` triple.
    async fn attach_provenance(
        &self,
        job_uri: &str,
        source_uri: &str,
        result_uri: &str,
    ) -> Result<(), LedgerError>;

    /// Look up a job.
    async fn job(&self, id: JobId) -> Result<Option<JobRecord>, LedgerError>;

    /// Provenance links attached to a job, in attachment order.
    async fn provenance(&self, id: JobId) -> Result<Vec<ProvenanceLink>, LedgerError>;
}

/// Physical artifact bytes.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Read the complete bytes of an artifact.
    async fn read(&self, artifact: &Artifact) -> Result<Vec<u8>, StorageError>;

    /// Store stamped bytes produced from `source` and describe the result.
    ///
    /// The bytes become visible only once fully written.
    async fn persist(&self, source: &Artifact, bytes: Vec<u8>) -> Result<Artifact, StorageError>;
}

/// Produces stamped bytes from source bytes and a marker.
///
/// Synchronous and CPU-bound; the pipeline runs it on a blocking worker.
pub trait Transformer: Send + Sync {
    /// Return complete new bytes with `marker` applied.
    fn apply(&self, source: &[u8], marker: &Marker) -> Result<Vec<u8>, TransformError>;
}

impl Transformer for PdfStamper {
    fn apply(&self, source: &[u8], marker: &Marker) -> Result<Vec<u8>, TransformError> {
        Ok(self.stamp(source, marker.as_str())?)
    }
}
