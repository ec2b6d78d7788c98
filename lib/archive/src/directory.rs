//! On-disk, content-addressed archive.
//!
//! Layout under `<root>/<namespace>/`:
//!
//! ```text
//! blobs/<sha256-hex>   immutable content, one file per distinct blob
//! files.json           {"files": ["<digest of file 0>", ...]}
//! ```
//!
//! Blobs and the index are written to a uniquely named temporary file and
//! renamed into place, so readers see either the old or the new version.
//! Index updates hold an exclusive lock on `files.lock` and re-read
//! `files.json` first, so several processes can share one namespace.

use crate::error::StorageError;
use crate::sink::{
    AddedFile, ArchiveObserver, ArchiveSink, ContentRef, ContentResolver, CreatedFile, FileId,
    Observers,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

const INDEX_FILE: &str = "files.json";
const LOCK_FILE: &str = "files.lock";
const BLOBS_DIR: &str = "blobs";

#[derive(Debug, Default, Serialize, Deserialize)]
struct FileIndex {
    files: Vec<ContentRef>,
}

/// An archive stored in a directory tree.
#[derive(Debug)]
pub struct DirectoryArchive {
    namespace: String,
    author: String,
    base: PathBuf,
    /// Serializes index read-modify-write cycles within this handle.
    writer: Mutex<()>,
    observers: Observers,
}

fn validate_namespace(namespace: &str) -> Result<(), StorageError> {
    let reason = if namespace.is_empty() {
        Some("must not be empty")
    } else if namespace == "." || namespace == ".." {
        Some("must not be a relative path component")
    } else if !namespace
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        Some("may only contain ASCII letters, digits, '-', '_' and '.'")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(StorageError::InvalidNamespace {
            namespace: namespace.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}

/// Writes `bytes` to a fresh temporary file in `dir` and renames it to `target`.
fn replace_file(dir: &Path, target: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(target).map_err(|e| e.error)?;
    Ok(())
}

/// Blocks until this process holds the exclusive lock on `path`.
/// The lock is released when the returned file is dropped.
fn lock_exclusive(path: &Path) -> std::io::Result<File> {
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(path)?;
    file.lock()?;
    Ok(file)
}

impl DirectoryArchive {
    /// Opens (creating if needed) the archive for `namespace` under `root`.
    ///
    /// # Errors
    ///
    /// Fails if the namespace is not a safe directory name, the directories
    /// cannot be created, or an existing index does not decode.
    #[instrument(skip(root), fields(dir = %root.as_ref().display()))]
    pub async fn open(root: impl AsRef<Path>, namespace: &str) -> Result<Self, StorageError> {
        validate_namespace(namespace)?;
        let base = root.as_ref().join(namespace);

        fs::create_dir_all(base.join(BLOBS_DIR))
            .await
            .map_err(|e| StorageError::WriteFailed {
                reason: format!("creating {}: {e}", base.display()),
            })?;

        let archive = Self {
            namespace: namespace.to_string(),
            author: namespace.to_string(),
            base,
            writer: Mutex::new(()),
            observers: Observers::default(),
        };
        let index = archive.load_index().await?;
        info!(files = index.files.len(), "archive opened");

        Ok(archive)
    }

    /// Sets the author recorded on `AddedFile` events.
    #[must_use]
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    /// Attaches an observer notified on every `create`.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn ArchiveObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Directory holding this namespace.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.base
    }

    fn blob_path(&self, content_ref: &ContentRef) -> PathBuf {
        self.base.join(BLOBS_DIR).join(content_ref.digest())
    }

    /// Reads the index as currently persisted. A missing index is empty.
    async fn load_index(&self) -> Result<FileIndex, StorageError> {
        match fs::read(self.base.join(INDEX_FILE)).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| StorageError::Corrupt {
                reason: format!("{INDEX_FILE}: {e}"),
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(FileIndex::default()),
            Err(e) => Err(StorageError::ReadFailed {
                reason: format!("{INDEX_FILE}: {e}"),
            }),
        }
    }

    /// Takes the cross-process index lock. Hold the returned file until the
    /// index has been persisted.
    async fn lock_index(&self) -> Result<File, StorageError> {
        let path = self.base.join(LOCK_FILE);
        tokio::task::spawn_blocking(move || lock_exclusive(&path))
            .await
            .map_err(|e| StorageError::WriteFailed {
                reason: format!("{LOCK_FILE}: {e}"),
            })?
            .map_err(|e| StorageError::WriteFailed {
                reason: format!("{LOCK_FILE}: {e}"),
            })
    }

    async fn replace(
        &self,
        dir: PathBuf,
        target: PathBuf,
        bytes: Vec<u8>,
    ) -> Result<(), StorageError> {
        let shown = target.display().to_string();
        tokio::task::spawn_blocking(move || replace_file(&dir, &target, &bytes))
            .await
            .map_err(|e| StorageError::WriteFailed {
                reason: format!("{shown}: {e}"),
            })?
            .map_err(|e| StorageError::WriteFailed {
                reason: format!("{shown}: {e}"),
            })
    }

    async fn write_blob(&self, content: &str) -> Result<ContentRef, StorageError> {
        let content_ref = ContentRef::for_content(content);
        let path = self.blob_path(&content_ref);

        if fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(content_ref);
        }

        // A concurrent writer of the same content renames identical bytes
        // over the same target, so either rename leaves a valid blob.
        self.replace(
            self.base.join(BLOBS_DIR),
            path,
            content.as_bytes().to_vec(),
        )
        .await?;

        Ok(content_ref)
    }

    async fn persist_index(&self, index: &FileIndex) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec_pretty(index).map_err(|e| StorageError::WriteFailed {
            reason: format!("encoding {INDEX_FILE}: {e}"),
        })?;
        self.replace(self.base.clone(), self.base.join(INDEX_FILE), bytes)
            .await
    }
}

#[async_trait]
impl ContentResolver for DirectoryArchive {
    #[instrument(skip(self), fields(namespace = %self.namespace))]
    async fn resolve(&self, content_ref: &ContentRef) -> Result<String, StorageError> {
        match fs::read_to_string(self.blob_path(content_ref)).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::ContentNotFound {
                content_ref: content_ref.clone(),
            }),
            Err(e) => Err(StorageError::ReadFailed {
                reason: format!("{content_ref}: {e}"),
            }),
        }
    }
}

#[async_trait]
impl ArchiveSink for DirectoryArchive {
    fn source_id(&self) -> &str {
        &self.namespace
    }

    #[instrument(skip(self, content), fields(namespace = %self.namespace, bytes = content.len()))]
    async fn create(&self, content: &str) -> Result<CreatedFile, StorageError> {
        let content_ref = self.write_blob(content).await?;

        let file_id = {
            let _writer = self.writer.lock().await;
            let _lock = self.lock_index().await?;
            let mut index = self.load_index().await?;
            let file_id = FileId::new(index.files.len() as u64);
            index.files.push(content_ref.clone());
            self.persist_index(&index).await?;
            file_id
        };
        debug!(%file_id, %content_ref, "file created");

        let event = AddedFile {
            file_id,
            content_ref: content_ref.clone(),
            by: self.author.clone(),
        };
        self.observers.notify(&self.namespace, &event).await;

        Ok(CreatedFile {
            file_id,
            content_ref,
        })
    }

    #[instrument(skip(self), fields(namespace = %self.namespace))]
    async fn read(&self, file_id: FileId) -> Result<String, StorageError> {
        let index = self.load_index().await?;
        let content_ref = usize::try_from(file_id.get())
            .ok()
            .and_then(|i| index.files.get(i))
            .cloned()
            .ok_or(StorageError::NotFound { file_id })?;

        self.resolve(&content_ref).await.map_err(|e| match e {
            StorageError::ContentNotFound { content_ref } => StorageError::Corrupt {
                reason: format!("file {file_id} points at missing content {content_ref}"),
            },
            other => other,
        })
    }

    #[instrument(skip(self, content), fields(namespace = %self.namespace, bytes = content.len()))]
    async fn update(&self, file_id: FileId, content: &str) -> Result<ContentRef, StorageError> {
        let _writer = self.writer.lock().await;
        let _lock = self.lock_index().await?;
        let mut index = self.load_index().await?;
        let slot = usize::try_from(file_id.get())
            .ok()
            .filter(|i| *i < index.files.len())
            .ok_or(StorageError::NotFound { file_id })?;

        let content_ref = self.write_blob(content).await?;
        index.files[slot] = content_ref.clone();
        self.persist_index(&index).await?;
        debug!(%file_id, %content_ref, "file updated");

        Ok(content_ref)
    }
}
