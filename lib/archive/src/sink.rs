//! The archive interface and its value types.

use crate::error::StorageError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Scheme prefix of every content reference.
pub const CONTENT_REF_SCHEME: &str = "ipfs://";

/// Handle of a mutable archived file.
///
/// Handles are allocated sequentially from zero per namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(u64);

impl FileId {
    /// Wraps a raw handle.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw handle.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for FileId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

/// Reference to an immutable piece of content, `ipfs://<sha256-hex>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentRef(String);

impl ContentRef {
    /// Computes the reference for `content`. Equal content yields equal references.
    #[must_use]
    pub fn for_content(content: &str) -> Self {
        let digest = Sha256::digest(content.as_bytes());
        Self(format!("{CONTENT_REF_SCHEME}{}", hex::encode(digest)))
    }

    /// Returns the digest part, without the scheme.
    #[must_use]
    pub fn digest(&self) -> &str {
        &self.0[CONTENT_REF_SCHEME.len()..]
    }

    /// Returns the full reference string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ContentRef {
    type Err = StorageError;

    /// Accepts `ipfs://<hex>` or a bare hex digest.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digest = s.strip_prefix(CONTENT_REF_SCHEME).unwrap_or(s);
        let valid = digest.len() == 64 && digest.bytes().all(|b| b.is_ascii_hexdigit());
        if !valid {
            return Err(StorageError::InvalidContentRef {
                value: s.to_string(),
            });
        }
        Ok(Self(format!(
            "{CONTENT_REF_SCHEME}{}",
            digest.to_ascii_lowercase()
        )))
    }
}

impl TryFrom<String> for ContentRef {
    type Error = StorageError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ContentRef> for String {
    fn from(value: ContentRef) -> Self {
        value.0
    }
}

/// Result of a successful `create`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedFile {
    /// Handle for later reads and updates.
    pub file_id: FileId,
    /// Reference to the content as written.
    pub content_ref: ContentRef,
}

/// Emitted once per successful `create`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddedFile {
    /// Handle of the new file.
    pub file_id: FileId,
    /// Reference to its content.
    pub content_ref: ContentRef,
    /// Who wrote it.
    pub by: String,
}

/// Resolves content references to their text.
#[async_trait]
pub trait ContentResolver: Send + Sync {
    /// Fetches the content stored under `content_ref`.
    async fn resolve(&self, content_ref: &ContentRef) -> Result<String, StorageError>;
}

/// Persistence service for transcripts and memory blobs.
///
/// `update` replaces a file's content wholesale; the last writer wins and
/// there is no conflict detection between a `read` and a later `update`.
#[async_trait]
pub trait ArchiveSink: ContentResolver {
    /// Identifier of this archive, used as the notification source.
    fn source_id(&self) -> &str;

    /// Stores new content under a fresh handle.
    async fn create(&self, content: &str) -> Result<CreatedFile, StorageError>;

    /// Returns the current content of a file.
    async fn read(&self, file_id: FileId) -> Result<String, StorageError>;

    /// Replaces the content of a file, returning the new content reference.
    async fn update(&self, file_id: FileId, content: &str) -> Result<ContentRef, StorageError>;
}

/// Hook invoked after a file is created.
#[async_trait]
pub trait ArchiveObserver: Send + Sync {
    /// Called once per created file, after the write is durable.
    async fn file_added(&self, source: &str, event: &AddedFile);
}

/// The set of observers attached to an archive.
#[derive(Clone, Default)]
pub struct Observers(Vec<Arc<dyn ArchiveObserver>>);

impl Observers {
    /// Attaches another observer.
    pub fn push(&mut self, observer: Arc<dyn ArchiveObserver>) {
        self.0.push(observer);
    }

    /// Number of attached observers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if nothing is attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Notifies every observer in attachment order.
    pub async fn notify(&self, source: &str, event: &AddedFile) {
        for observer in &self.0 {
            observer.file_added(source, event).await;
        }
    }
}

impl fmt::Debug for Observers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Observers").field(&self.0.len()).finish()
    }
}
