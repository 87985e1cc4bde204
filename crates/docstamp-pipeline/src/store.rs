//! # Artifact Stores
//!
//! Physical locations use the `share://` scheme, resolved relative to a
//! storage root. [`FsArtifactStore`] writes every file through a temporary
//! sibling that is renamed into place only after a full flush, so readers
//! never observe a partially written artifact.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use docstamp_core::{resource_uri, Artifact, PDF_EXTENSION, PDF_FORMAT};

use crate::collaborators::ArtifactStore;
use crate::error::{StorageError, UnknownStorageMode};

/// URI scheme of physical artifact locations.
pub const SHARE_SCHEME: &str = "share://";

/// Where stamped bytes go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StorageMode {
    /// Write a new file and describe it as a new artifact derived from the
    /// source. The source bytes are kept.
    #[default]
    Derived,
    /// Replace the source file's bytes. The artifact keeps its identity.
    InPlace,
}

impl StorageMode {
    /// Configuration name of the mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Derived => "derived",
            Self::InPlace => "in-place",
        }
    }
}

impl FromStr for StorageMode {
    type Err = UnknownStorageMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "derived" => Ok(Self::Derived),
            "in-place" | "in_place" | "inplace" => Ok(Self::InPlace),
            other => Err(UnknownStorageMode(other.to_string())),
        }
    }
}

impl std::fmt::Display for StorageMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strip the `share://` scheme and reject anything that could escape the
/// storage root.
fn relative_location(physical_uri: &str) -> Result<&Path, StorageError> {
    let invalid = || StorageError::InvalidLocation(physical_uri.to_string());
    let relative = Path::new(physical_uri.strip_prefix(SHARE_SCHEME).ok_or_else(invalid)?);
    let mut components = relative.components().peekable();
    if components.peek().is_none() {
        return Err(invalid());
    }
    if components.all(|c| matches!(c, Component::Normal(_))) {
        Ok(relative)
    } else {
        Err(invalid())
    }
}

/// Describe a new artifact derived from `source`.
fn derived_artifact(source: &Artifact, resource_base: &str, id: Uuid, size: u64) -> Artifact {
    let now = Utc::now();
    Artifact {
        uri: resource_uri(resource_base, "files", id),
        id: id.to_string(),
        file_name: source.file_name.clone(),
        format: Some(PDF_FORMAT.to_string()),
        extension: Some(PDF_EXTENSION.to_string()),
        size: Some(size),
        physical_uri: format!("{SHARE_SCHEME}{id}.{PDF_EXTENSION}"),
        created: now,
        modified: now,
        derived_from: Some(source.uri.clone()),
    }
}

/// Describe `source` after its bytes were replaced.
fn rewritten_artifact(source: &Artifact, size: u64) -> Artifact {
    Artifact {
        size: Some(size),
        modified: Utc::now(),
        ..source.clone()
    }
}

// ── Filesystem ───────────────────────────────────────────────────────

/// Artifact store over a local directory, typically a shared volume.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
    mode: StorageMode,
    resource_base: String,
}

impl FsArtifactStore {
    /// Create a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>, mode: StorageMode, resource_base: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            mode,
            resource_base: resource_base.into(),
        }
    }

    /// The storage root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The configured storage mode.
    pub fn mode(&self) -> StorageMode {
        self.mode
    }

    /// Resolve a `share://` location to a path under the root.
    pub fn resolve(&self, physical_uri: &str) -> Result<PathBuf, StorageError> {
        Ok(self.root.join(relative_location(physical_uri)?))
    }

    /// Write `bytes` to `path` through a temporary sibling file.
    async fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| StorageError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let temp = path.with_file_name(format!(".{file_name}.{}.tmp", Uuid::new_v4()));

        let written = async {
            let mut file = tokio::fs::File::create(&temp).await?;
            file.write_all(bytes).await?;
            file.sync_all().await?;
            tokio::fs::rename(&temp, path).await
        }
        .await;

        if let Err(source) = written {
            if let Err(e) = tokio::fs::remove_file(&temp).await {
                tracing::debug!(path = %temp.display(), error = %e, "temporary file not removed");
            }
            return Err(StorageError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn read(&self, artifact: &Artifact) -> Result<Vec<u8>, StorageError> {
        let path = self.resolve(&artifact.physical_uri)?;
        let read = tokio::fs::read(&path).await;
        read.map_err(|source| StorageError::Io { path, source })
    }

    async fn persist(&self, source: &Artifact, bytes: Vec<u8>) -> Result<Artifact, StorageError> {
        let size = bytes.len() as u64;
        match self.mode {
            StorageMode::Derived => {
                let id = Uuid::new_v4();
                let artifact = derived_artifact(source, &self.resource_base, id, size);
                let path = self.resolve(&artifact.physical_uri)?;
                self.write_atomic(&path, &bytes).await?;
                tracing::debug!(path = %path.display(), size, "wrote derived artifact");
                Ok(artifact)
            }
            StorageMode::InPlace => {
                let path = self.resolve(&source.physical_uri)?;
                self.write_atomic(&path, &bytes).await?;
                tracing::debug!(path = %path.display(), size, "rewrote artifact in place");
                Ok(rewritten_artifact(source, size))
            }
        }
    }
}

// ── In-Memory ────────────────────────────────────────────────────────

/// Artifact store holding bytes in memory, keyed by physical location.
#[derive(Debug, Clone)]
pub struct MemoryArtifactStore {
    files: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    mode: StorageMode,
    resource_base: String,
}

impl MemoryArtifactStore {
    /// Create an empty store.
    pub fn new(mode: StorageMode, resource_base: impl Into<String>) -> Self {
        Self {
            files: Arc::new(RwLock::new(HashMap::new())),
            mode,
            resource_base: resource_base.into(),
        }
    }

    /// Store bytes at a physical location.
    pub fn put(&self, physical_uri: impl Into<String>, bytes: Vec<u8>) {
        self.files.write().insert(physical_uri.into(), bytes);
    }

    /// Bytes at a physical location.
    pub fn get(&self, physical_uri: &str) -> Option<Vec<u8>> {
        self.files.read().get(physical_uri).cloned()
    }

    /// Number of stored files.
    pub fn len(&self) -> usize {
        self.files.read().len()
    }

    /// Whether no file is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn read(&self, artifact: &Artifact) -> Result<Vec<u8>, StorageError> {
        relative_location(&artifact.physical_uri)?;
        self.get(&artifact.physical_uri).ok_or_else(|| StorageError::Io {
            path: PathBuf::from(&artifact.physical_uri),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such artifact"),
        })
    }

    async fn persist(&self, source: &Artifact, bytes: Vec<u8>) -> Result<Artifact, StorageError> {
        let size = bytes.len() as u64;
        let artifact = match self.mode {
            StorageMode::Derived => derived_artifact(source, &self.resource_base, Uuid::new_v4(), size),
            StorageMode::InPlace => rewritten_artifact(source, size),
        };
        relative_location(&artifact.physical_uri)?;
        self.put(artifact.physical_uri.clone(), bytes);
        Ok(artifact)
    }
}
