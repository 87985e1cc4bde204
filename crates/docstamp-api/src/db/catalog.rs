//! Catalog persistence operations.
//!
//! Reads documents, agendas (collections) and artifacts, and records stamped
//! artifacts. Eligibility has two parts. The "not yet stamped" check runs in
//! SQL against `stamped_artifacts`. The PDF check runs in Rust through
//! [`Artifact::is_pdf`], so both catalogs share one definition.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};

use docstamp_core::{Artifact, CollectionId, Document, DocumentId};
use docstamp_pipeline::{Catalog, CatalogError};

/// Postgres-backed document catalog.
#[derive(Debug, Clone)]
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    /// Wrap a connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn unavailable(err: sqlx::Error) -> CatalogError {
    CatalogError::Unavailable(err.to_string())
}

/// Columns of a candidate row: the document, its source artifact (`a_*`)
/// and its derived artifact (`r_*`, all NULL when absent).
const CANDIDATE_COLUMNS: &str = "
    d.id, d.uri, d.name, d.modified,
    a.uri AS a_uri, a.id AS a_id, a.file_name AS a_file_name, a.format AS a_format,
    a.extension AS a_extension, a.size AS a_size, a.physical_uri AS a_physical_uri,
    a.created AS a_created, a.modified AS a_modified, a.derived_from AS a_derived_from,
    r.uri AS r_uri, r.id AS r_id, r.file_name AS r_file_name, r.format AS r_format,
    r.extension AS r_extension, r.size AS r_size, r.physical_uri AS r_physical_uri,
    r.created AS r_created, r.modified AS r_modified, r.derived_from AS r_derived_from";

const CANDIDATE_JOINS: &str = "
    JOIN artifacts a ON a.uri = d.artifact_uri
    LEFT JOIN artifacts r ON r.uri = d.derived_uri
    WHERE NOT EXISTS (SELECT 1 FROM stamped_artifacts s WHERE s.source_uri = a.uri)";

#[async_trait]
impl Catalog for PgCatalog {
    async fn document_exists(&self, id: &DocumentId) -> Result<bool, CatalogError> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM documents WHERE id = $1)")
            .bind(id.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(unavailable)
    }

    async fn collection_exists(&self, id: &CollectionId) -> Result<bool, CatalogError> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM collections WHERE id = $1)")
            .bind(id.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(unavailable)
    }

    async fn resolve_by_ids(&self, ids: &[DocumentId]) -> Result<Vec<Document>, CatalogError> {
        let ids: Vec<String> = ids.iter().map(|id| id.as_str().to_string()).collect();
        let sql = format!(
            "SELECT {CANDIDATE_COLUMNS} FROM documents d {CANDIDATE_JOINS}
             AND d.id = ANY($1)
             ORDER BY array_position($1, d.id)"
        );
        let rows = sqlx::query_as::<_, CandidateRow>(&sql)
            .bind(&ids)
            .fetch_all(&self.pool)
            .await
            .map_err(unavailable)?;
        into_candidates(rows)
    }

    async fn resolve_by_collection(
        &self,
        id: &CollectionId,
    ) -> Result<Vec<Document>, CatalogError> {
        let sql = format!(
            "SELECT {CANDIDATE_COLUMNS} FROM collection_members m
             JOIN documents d ON d.id = m.document_id {CANDIDATE_JOINS}
             AND m.collection_id = $1
             ORDER BY m.position"
        );
        let rows = sqlx::query_as::<_, CandidateRow>(&sql)
            .bind(id.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(unavailable)?;
        into_candidates(rows)
    }

    async fn mark_transformed(
        &self,
        document: &DocumentId,
        source: &Artifact,
        result: &Artifact,
    ) -> Result<(), CatalogError> {
        let mut tx = self.pool.begin().await.map_err(unavailable)?;

        let previous = sqlx::query_scalar::<_, String>(
            "SELECT result_uri FROM stamped_artifacts WHERE source_uri = $1 FOR UPDATE",
        )
        .bind(&source.uri)
        .fetch_optional(&mut *tx)
        .await
        .map_err(unavailable)?;
        match previous {
            Some(previous) if previous == result.uri => return Ok(()),
            Some(previous) => {
                return Err(CatalogError::Inconsistent(format!(
                    "artifact {} already stamped into {previous}",
                    source.uri
                )))
            }
            None => {}
        }

        upsert_artifact(&mut tx, result).await?;

        sqlx::query(
            "INSERT INTO stamped_artifacts (source_uri, result_uri, document_id, stamped_at)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(&source.uri)
        .bind(&result.uri)
        .bind(document.as_str())
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(unavailable)?;

        let in_place = result.uri == source.uri;
        let updated = sqlx::query(
            "UPDATE documents
             SET derived_uri = CASE WHEN $2 THEN derived_uri ELSE $3 END, modified = $4
             WHERE id = $1",
        )
        .bind(document.as_str())
        .bind(in_place)
        .bind(&result.uri)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(unavailable)?;
        if updated.rows_affected() == 0 {
            return Err(CatalogError::Inconsistent(format!(
                "unknown document {document}"
            )));
        }

        tx.commit().await.map_err(unavailable)
    }
}

/// Insert a result artifact, or refresh size and modification time when the
/// artifact already exists (in-place stamping).
async fn upsert_artifact(
    tx: &mut Transaction<'_, Postgres>,
    artifact: &Artifact,
) -> Result<(), CatalogError> {
    sqlx::query(
        "INSERT INTO artifacts
             (uri, id, file_name, format, extension, size, physical_uri, created, modified, derived_from)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
         ON CONFLICT (uri) DO UPDATE SET size = EXCLUDED.size, modified = EXCLUDED.modified",
    )
    .bind(&artifact.uri)
    .bind(&artifact.id)
    .bind(&artifact.file_name)
    .bind(&artifact.format)
    .bind(&artifact.extension)
    .bind(artifact.size.and_then(|s| i64::try_from(s).ok()))
    .bind(&artifact.physical_uri)
    .bind(artifact.created)
    .bind(artifact.modified)
    .bind(&artifact.derived_from)
    .execute(&mut **tx)
    .await
    .map_err(unavailable)?;
    Ok(())
}

fn into_candidates(rows: Vec<CandidateRow>) -> Result<Vec<Document>, CatalogError> {
    let mut documents = Vec::with_capacity(rows.len());
    for row in rows {
        let document = row.into_document()?;
        if document.artifact.is_pdf() {
            documents.push(document);
        }
    }
    Ok(documents)
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct CandidateRow {
    id: String,
    uri: String,
    name: String,
    modified: DateTime<Utc>,
    a_uri: String,
    a_id: String,
    a_file_name: String,
    a_format: Option<String>,
    a_extension: Option<String>,
    a_size: Option<i64>,
    a_physical_uri: String,
    a_created: DateTime<Utc>,
    a_modified: DateTime<Utc>,
    a_derived_from: Option<String>,
    r_uri: Option<String>,
    r_id: Option<String>,
    r_file_name: Option<String>,
    r_format: Option<String>,
    r_extension: Option<String>,
    r_size: Option<i64>,
    r_physical_uri: Option<String>,
    r_created: Option<DateTime<Utc>>,
    r_modified: Option<DateTime<Utc>>,
    r_derived_from: Option<String>,
}

impl CandidateRow {
    fn into_document(self) -> Result<Document, CatalogError> {
        let id = DocumentId::new(self.id)
            .map_err(|e| CatalogError::Inconsistent(format!("document row: {e}")))?;

        let artifact = Artifact {
            uri: self.a_uri,
            id: self.a_id,
            file_name: self.a_file_name,
            format: self.a_format,
            extension: self.a_extension,
            size: self.a_size.and_then(|s| u64::try_from(s).ok()),
            physical_uri: self.a_physical_uri,
            created: self.a_created,
            modified: self.a_modified,
            derived_from: self.a_derived_from,
        };

        let derived = match (
            self.r_uri,
            self.r_id,
            self.r_file_name,
            self.r_physical_uri,
            self.r_created,
            self.r_modified,
        ) {
            (Some(uri), Some(id), Some(file_name), Some(physical_uri), Some(created), Some(modified)) => {
                Some(Artifact {
                    uri,
                    id,
                    file_name,
                    format: self.r_format,
                    extension: self.r_extension,
                    size: self.r_size.and_then(|s| u64::try_from(s).ok()),
                    physical_uri,
                    created,
                    modified,
                    derived_from: self.r_derived_from,
                })
            }
            _ => None,
        };

        Ok(Document {
            id,
            uri: self.uri,
            name: self.name,
            artifact,
            derived,
            modified: self.modified,
        })
    }
}
