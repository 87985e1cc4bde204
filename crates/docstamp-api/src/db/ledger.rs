//! Job ledger persistence operations.
//!
//! Jobs live in `stamping_jobs`, provenance in `job_provenance`. The single
//! terminal transition is enforced in SQL: `finalize` only updates a row
//! whose status is still Running, so two concurrent finalizations cannot
//! both succeed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use docstamp_core::{JobId, JobStatus};
use docstamp_pipeline::{Ledger, LedgerError};
use docstamp_state::{JobOutcome, JobRecord, ProvenanceLink, Running, StampingJob};

/// Postgres-backed job ledger.
#[derive(Debug, Clone)]
pub struct PgLedger {
    pool: PgPool,
    resource_base: String,
}

impl PgLedger {
    /// Wrap a connection pool; job URIs are minted under `resource_base`.
    pub fn new(pool: PgPool, resource_base: impl Into<String>) -> Self {
        Self {
            pool,
            resource_base: resource_base.into(),
        }
    }
}

fn unavailable(err: sqlx::Error) -> LedgerError {
    LedgerError::Unavailable(err.to_string())
}

const JOB_COLUMNS: &str = "id, uri, status, created, started, ended, failed_documents";

#[async_trait]
impl Ledger for PgLedger {
    async fn create_job(&self) -> Result<StampingJob<Running>, LedgerError> {
        let job = StampingJob::start(&self.resource_base);
        let record = job.record();
        sqlx::query(
            "INSERT INTO stamping_jobs (id, uri, status, created, started, ended, failed_documents)
             VALUES ($1, $2, $3, $4, $5, NULL, '{}')",
        )
        .bind(record.id.as_uuid())
        .bind(&record.uri)
        .bind(record.status.uri())
        .bind(record.created)
        .bind(record.started)
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;
        Ok(job)
    }

    async fn finalize(
        &self,
        id: JobId,
        outcome: &JobOutcome,
        ended: DateTime<Utc>,
    ) -> Result<JobRecord, LedgerError> {
        let failed_documents: Vec<String> = match outcome {
            JobOutcome::Success => Vec::new(),
            JobOutcome::Fail { failed_documents } => failed_documents.clone(),
        };
        let sql = format!(
            "UPDATE stamping_jobs SET status = $2, ended = $3, failed_documents = $4
             WHERE id = $1 AND status = $5
             RETURNING {JOB_COLUMNS}"
        );
        let row = sqlx::query_as::<_, JobRow>(&sql)
            .bind(id.as_uuid())
            .bind(outcome.status().uri())
            .bind(ended)
            .bind(&failed_documents)
            .bind(JobStatus::Running.uri())
            .fetch_optional(&self.pool)
            .await
            .map_err(unavailable)?;

        if let Some(row) = row {
            return row.into_record();
        }

        let current = sqlx::query_scalar::<_, String>("SELECT status FROM stamping_jobs WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(unavailable)?;
        match current {
            None => Err(LedgerError::UnknownJob(id)),
            Some(status) => Err(LedgerError::AlreadyFinalized {
                id,
                status: parse_status(&status)?,
            }),
        }
    }

    async fn attach_provenance(
        &self,
        job_uri: &str,
        source_uri: &str,
        result_uri: &str,
    ) -> Result<(), LedgerError> {
        let inserted = sqlx::query(
            "INSERT INTO job_provenance (job_id, source_uri, result_uri, recorded_at)
             SELECT id, $2, $3, $4 FROM stamping_jobs WHERE uri = $1
             ON CONFLICT (job_id, source_uri, result_uri) DO NOTHING",
        )
        .bind(job_uri)
        .bind(source_uri)
        .bind(result_uri)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;

        if inserted.rows_affected() == 0 {
            let known = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS (SELECT 1 FROM stamping_jobs WHERE uri = $1)",
            )
            .bind(job_uri)
            .fetch_one(&self.pool)
            .await
            .map_err(unavailable)?;
            if !known {
                return Err(LedgerError::Unavailable(format!("no job with uri {job_uri}")));
            }
        }
        Ok(())
    }

    async fn job(&self, id: JobId) -> Result<Option<JobRecord>, LedgerError> {
        let sql = format!("SELECT {JOB_COLUMNS} FROM stamping_jobs WHERE id = $1");
        let row = sqlx::query_as::<_, JobRow>(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(unavailable)?;
        row.map(JobRow::into_record).transpose()
    }

    async fn provenance(&self, id: JobId) -> Result<Vec<ProvenanceLink>, LedgerError> {
        let rows = sqlx::query_as::<_, ProvenanceRow>(
            "SELECT j.uri AS job_uri, p.source_uri, p.result_uri, p.recorded_at
             FROM job_provenance p JOIN stamping_jobs j ON j.id = p.job_id
             WHERE p.job_id = $1
             ORDER BY p.seq",
        )
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(unavailable)?;

        if rows.is_empty() && self.job(id).await?.is_none() {
            return Err(LedgerError::UnknownJob(id));
        }
        Ok(rows.into_iter().map(ProvenanceRow::into_link).collect())
    }
}

fn parse_status(status: &str) -> Result<JobStatus, LedgerError> {
    JobStatus::from_uri(status)
        .ok_or_else(|| LedgerError::Unavailable(format!("unrecognized job status '{status}'")))
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct JobRow {
    id: Uuid,
    uri: String,
    status: String,
    created: DateTime<Utc>,
    started: DateTime<Utc>,
    ended: Option<DateTime<Utc>>,
    failed_documents: Vec<String>,
}

impl JobRow {
    fn into_record(self) -> Result<JobRecord, LedgerError> {
        let status = parse_status(&self.status)?;
        Ok(JobRecord {
            id: JobId::from_uuid(self.id),
            uri: self.uri,
            status,
            created: self.created,
            started: self.started,
            ended: self.ended,
            failed_documents: self.failed_documents,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ProvenanceRow {
    job_uri: String,
    source_uri: String,
    result_uri: String,
    recorded_at: DateTime<Utc>,
}

impl ProvenanceRow {
    fn into_link(self) -> ProvenanceLink {
        ProvenanceLink {
            job_uri: self.job_uri,
            source_uri: self.source_uri,
            result_uri: self.result_uri,
            recorded_at: self.recorded_at,
        }
    }
}
