//! # Stamping Pipeline
//!
//! One invocation runs through:
//!
//! ```text
//! ensure_exists → resolve_candidates → create job → summarize
//!     → (detached) process_all → finalize
//! ```
//!
//! Everything up to `summarize` happens while the caller waits. Processing
//! runs on a detached task inside its own error boundary: a panic in the
//! per-document loop still finalizes the job.
//!
//! Documents are processed one at a time. Marking a document transformed
//! in the catalog is the last step, taken only after its provenance is
//! attached, so any earlier failure leaves the document eligible for the
//! next invocation.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::task::JoinHandle;

use docstamp_core::{CandidateSelector, Document, DocumentId, Marker};
use docstamp_state::{JobOutcome, JobRecord, Running, StampingJob};

use crate::collaborators::{ArtifactStore, Catalog, Ledger, Transformer};
use crate::error::{DocumentFailure, PipelineError};
use crate::summary::{summarize, FailedDocument, JobSummary, ProcessingSummary, StampedDocument};

/// A created job together with the documents it will attempt.
#[derive(Debug, Clone)]
pub struct PreparedJob {
    job: StampingJob<Running>,
    documents: Vec<Document>,
    summary: JobSummary,
}

impl PreparedJob {
    /// The caller-facing summary.
    pub fn summary(&self) -> &JobSummary {
        &self.summary
    }

    /// The candidates, in processing order.
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }
}

/// Orchestrates one discovery-to-completion cycle per invocation.
///
/// Cheap to clone: all collaborators are shared.
#[derive(Clone)]
pub struct StampingPipeline {
    catalog: Arc<dyn Catalog>,
    ledger: Arc<dyn Ledger>,
    store: Arc<dyn ArtifactStore>,
    transformer: Arc<dyn Transformer>,
}

impl std::fmt::Debug for StampingPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StampingPipeline").finish_non_exhaustive()
    }
}

impl StampingPipeline {
    /// Assemble a pipeline from its collaborators.
    pub fn new(
        catalog: Arc<dyn Catalog>,
        ledger: Arc<dyn Ledger>,
        store: Arc<dyn ArtifactStore>,
        transformer: Arc<dyn Transformer>,
    ) -> Self {
        Self {
            catalog,
            ledger,
            store,
            transformer,
        }
    }

    /// The document catalog.
    pub fn catalog(&self) -> &Arc<dyn Catalog> {
        &self.catalog
    }

    /// The job ledger.
    pub fn ledger(&self) -> &Arc<dyn Ledger> {
        &self.ledger
    }

    // ── Resolution ───────────────────────────────────────────────────

    /// Reject selectors that name no existing entity at all.
    ///
    /// For explicit ids one existing document is enough; unknown ids are
    /// dropped later by resolution.
    pub async fn ensure_exists(&self, selector: &CandidateSelector) -> Result<(), PipelineError> {
        match selector {
            CandidateSelector::Documents(ids) => {
                for id in ids {
                    if self.catalog.document_exists(id).await? {
                        return Ok(());
                    }
                }
                let missing: Vec<&str> = ids.iter().map(DocumentId::as_str).collect();
                return Err(PipelineError::NotFound {
                    kind: "documents",
                    id: missing.join(", "),
                });
            }
            CandidateSelector::Collection(id) => {
                if !self.catalog.collection_exists(id).await? {
                    return Err(PipelineError::NotFound {
                        kind: "agendas",
                        id: id.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Eligible documents for a selector. Empty means nothing to do.
    pub async fn resolve_candidates(
        &self,
        selector: &CandidateSelector,
    ) -> Result<Vec<Document>, PipelineError> {
        let documents = match selector {
            CandidateSelector::Documents(ids) => self.catalog.resolve_by_ids(ids).await?,
            CandidateSelector::Collection(id) => self.catalog.resolve_by_collection(id).await?,
        };
        tracing::debug!(selector = %selector, candidates = documents.len(), "resolved candidates");
        Ok(documents)
    }

    // ── Job creation ─────────────────────────────────────────────────

    /// Run the synchronous part of an invocation: pre-check, resolution and
    /// job creation. No job exists unless this returns `Ok`.
    pub async fn prepare(&self, selector: &CandidateSelector) -> Result<PreparedJob, PipelineError> {
        self.ensure_exists(selector).await?;
        let documents = self.resolve_candidates(selector).await?;
        if documents.is_empty() {
            tracing::info!(selector = %selector, "no documents to stamp");
            return Err(PipelineError::NoEligibleCandidates);
        }

        let job = self.ledger.create_job().await?;
        let summary = summarize(&job, documents.len());
        tracing::info!(
            job_id = %job.id(),
            selector = %selector,
            candidates = documents.len(),
            "created stamping job"
        );
        Ok(PreparedJob {
            job,
            documents,
            summary,
        })
    }

    /// Prepare a job and start processing it on a detached task.
    ///
    /// Returns as soon as the job exists. The handle resolves to the terminal
    /// record; dropping it does not stop the job.
    pub async fn submit(
        &self,
        selector: &CandidateSelector,
    ) -> Result<(JobSummary, JoinHandle<JobRecord>), PipelineError> {
        let prepared = self.prepare(selector).await?;
        let summary = prepared.summary.clone();
        Ok((summary, self.spawn(prepared)))
    }

    /// Prepare a job and process it before returning.
    pub async fn run_to_completion(
        &self,
        selector: &CandidateSelector,
    ) -> Result<(JobSummary, JobRecord), PipelineError> {
        let prepared = self.prepare(selector).await?;
        let summary = prepared.summary.clone();
        Ok((summary, self.run(prepared).await))
    }

    // ── Execution ────────────────────────────────────────────────────

    /// Process a prepared job on a detached task.
    pub fn spawn(&self, prepared: PreparedJob) -> JoinHandle<JobRecord> {
        let pipeline = self.clone();
        tokio::spawn(async move { pipeline.run(prepared).await })
    }

    /// Process every candidate and finalize the job.
    ///
    /// The loop runs on an inner task. If it panics, every document not
    /// confirmed as stamped is reported as failed.
    pub async fn run(&self, prepared: PreparedJob) -> JobRecord {
        let PreparedJob { job, documents, .. } = prepared;
        let confirmed = Arc::new(Mutex::new(HashSet::new()));

        let worker = self.clone();
        let worker_job = job.clone();
        let worker_documents = documents.clone();
        let worker_confirmed = Arc::clone(&confirmed);
        let inner = tokio::spawn(async move {
            worker
                .process_tracked(&worker_job, &worker_documents, &worker_confirmed)
                .await
        });

        let outcome = match inner.await {
            Ok(summary) => summary.outcome(),
            Err(e) => {
                let confirmed = confirmed.lock();
                let unconfirmed: Vec<String> = documents
                    .iter()
                    .filter(|d| !confirmed.contains(&d.id))
                    .map(|d| Marker::for_document(d).into_string())
                    .collect();
                tracing::error!(
                    job_id = %job.id(),
                    error = %e,
                    unconfirmed = unconfirmed.len(),
                    "stamping loop aborted"
                );
                JobOutcome::from_failures(unconfirmed)
            }
        };

        self.finalize(job, outcome).await
    }

    /// Attempt every document in order. A failing document never stops the
    /// loop.
    pub async fn process_all(
        &self,
        job: &StampingJob<Running>,
        documents: &[Document],
    ) -> ProcessingSummary {
        self.process_tracked(job, documents, &Mutex::new(HashSet::new()))
            .await
    }

    async fn process_tracked(
        &self,
        job: &StampingJob<Running>,
        documents: &[Document],
        confirmed: &Mutex<HashSet<DocumentId>>,
    ) -> ProcessingSummary {
        let mut summary = ProcessingSummary::default();
        for document in documents {
            let marker = Marker::for_document(document);
            match self.process_document(job.uri(), document, &marker).await {
                Ok(stamped) => {
                    tracing::info!(
                        job_id = %job.id(),
                        document_id = %document.id,
                        marker = %marker,
                        result = %stamped.result_uri,
                        "stamped document"
                    );
                    confirmed.lock().insert(document.id.clone());
                    summary.stamped.push(stamped);
                }
                Err(e) => {
                    tracing::warn!(
                        job_id = %job.id(),
                        document_id = %document.id,
                        marker = %marker,
                        error = %e,
                        "failed to stamp document"
                    );
                    summary.failed.push(FailedDocument {
                        document_id: document.id.clone(),
                        marker,
                        reason: e.to_string(),
                    });
                }
            }
        }
        summary
    }

    /// Read, transform, persist, link, mark. Catalog and ledger are only
    /// touched once complete stamped bytes are stored.
    async fn process_document(
        &self,
        job_uri: &str,
        document: &Document,
        marker: &Marker,
    ) -> Result<StampedDocument, DocumentFailure> {
        let source = &document.artifact;
        let bytes = self.store.read(source).await.map_err(DocumentFailure::Read)?;

        let transformer = Arc::clone(&self.transformer);
        let worker_marker = marker.clone();
        let stamped = tokio::task::spawn_blocking(move || transformer.apply(&bytes, &worker_marker))
            .await
            .map_err(|e| DocumentFailure::Worker(e.to_string()))??;

        let result = self
            .store
            .persist(source, stamped)
            .await
            .map_err(DocumentFailure::Persist)?;
        self.ledger
            .attach_provenance(job_uri, &source.uri, &result.uri)
            .await?;
        self.catalog
            .mark_transformed(&document.id, source, &result)
            .await?;

        Ok(StampedDocument {
            document_id: document.id.clone(),
            source_uri: source.uri.clone(),
            result_uri: result.uri,
        })
    }

    // ── Finalization ─────────────────────────────────────────────────

    /// Commit the terminal status. Best-effort: a ledger failure is logged
    /// and the locally computed record is returned.
    pub async fn finalize(&self, job: StampingJob<Running>, outcome: JobOutcome) -> JobRecord {
        let ended = Utc::now();
        match self.ledger.finalize(job.id(), &outcome, ended).await {
            Ok(record) => {
                match record.failure_detail() {
                    Some(detail) => tracing::warn!(job_id = %record.id, detail = %detail, "stamping job failed"),
                    None => tracing::info!(job_id = %record.id, "stamping job succeeded"),
                }
                record
            }
            Err(e) => {
                tracing::error!(
                    job_id = %job.id(),
                    status = outcome.status().label(),
                    error = %e,
                    "failed to finalize stamping job"
                );
                job.finish(outcome, ended)
            }
        }
    }
}
