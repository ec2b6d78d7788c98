//! Process-local archive.

use crate::error::StorageError;
use crate::sink::{
    AddedFile, ArchiveObserver, ArchiveSink, ContentRef, ContentResolver, CreatedFile, FileId,
    Observers,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

#[derive(Debug, Default)]
struct Inner {
    /// Current content ref per file; index is the file id.
    files: Vec<ContentRef>,
    blobs: HashMap<ContentRef, String>,
}

/// An archive held entirely in memory.
///
/// Writes can be switched off with [`InMemoryArchive::fail_writes`] to
/// exercise storage failure paths.
#[derive(Debug)]
pub struct InMemoryArchive {
    source: String,
    author: String,
    inner: Mutex<Inner>,
    observers: Observers,
    reject_writes: AtomicBool,
}

impl InMemoryArchive {
    /// Creates an empty archive identified by `source`.
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        Self {
            author: source.clone(),
            source,
            inner: Mutex::new(Inner::default()),
            observers: Observers::default(),
            reject_writes: AtomicBool::new(false),
        }
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

    /// Makes every subsequent `create`/`update` fail (or succeed again).
    pub fn fail_writes(&self, fail: bool) {
        self.reject_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of files created so far.
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.lock().files.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_writable(&self) -> Result<(), StorageError> {
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(StorageError::WriteFailed {
                reason: "archive is rejecting writes".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ContentResolver for InMemoryArchive {
    async fn resolve(&self, content_ref: &ContentRef) -> Result<String, StorageError> {
        self.lock()
            .blobs
            .get(content_ref)
            .cloned()
            .ok_or_else(|| StorageError::ContentNotFound {
                content_ref: content_ref.clone(),
            })
    }
}

#[async_trait]
impl ArchiveSink for InMemoryArchive {
    fn source_id(&self) -> &str {
        &self.source
    }

    async fn create(&self, content: &str) -> Result<CreatedFile, StorageError> {
        self.check_writable()?;
        let content_ref = ContentRef::for_content(content);

        let file_id = {
            let mut inner = self.lock();
            let file_id = FileId::new(inner.files.len() as u64);
            inner
                .blobs
                .insert(content_ref.clone(), content.to_string());
            inner.files.push(content_ref.clone());
            file_id
        };
        debug!(%file_id, %content_ref, "file created");

        let event = AddedFile {
            file_id,
            content_ref: content_ref.clone(),
            by: self.author.clone(),
        };
        self.observers.notify(&self.source, &event).await;

        Ok(CreatedFile {
            file_id,
            content_ref,
        })
    }

    async fn read(&self, file_id: FileId) -> Result<String, StorageError> {
        let inner = self.lock();
        let content_ref = usize::try_from(file_id.get())
            .ok()
            .and_then(|i| inner.files.get(i))
            .ok_or(StorageError::NotFound { file_id })?;
        inner
            .blobs
            .get(content_ref)
            .cloned()
            .ok_or_else(|| StorageError::Corrupt {
                reason: format!("file {file_id} points at missing content {content_ref}"),
            })
    }

    async fn update(&self, file_id: FileId, content: &str) -> Result<ContentRef, StorageError> {
        self.check_writable()?;
        let content_ref = ContentRef::for_content(content);

        let mut inner = self.lock();
        let slot = usize::try_from(file_id.get())
            .ok()
            .filter(|i| *i < inner.files.len())
            .ok_or(StorageError::NotFound { file_id })?;
        inner
            .blobs
            .insert(content_ref.clone(), content.to_string());
        inner.files[slot] = content_ref.clone();
        debug!(%file_id, %content_ref, "file updated");

        Ok(content_ref)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<(String, AddedFile)>>);

    #[async_trait]
    impl ArchiveObserver for Recorder {
        async fn file_added(&self, source: &str, event: &AddedFile) {
            self.0
                .lock()
                .unwrap()
                .push((source.to_string(), event.clone()));
        }
    }

    #[tokio::test]
    async fn create_read_update() {
        let archive = InMemoryArchive::new("demo");

        let created = archive.create("Hello World").await.unwrap();
        assert_eq!(created.file_id, FileId::new(0));
        assert_eq!(archive.read(created.file_id).await.unwrap(), "Hello World");

        let new_ref = archive
            .update(created.file_id, "Hello World 2")
            .await
            .unwrap();
        assert_ne!(new_ref, created.content_ref);
        assert_eq!(archive.read(created.file_id).await.unwrap(), "Hello World 2");

        // The old content stays resolvable by reference.
        assert_eq!(
            archive.resolve(&created.content_ref).await.unwrap(),
            "Hello World"
        );
    }

    #[tokio::test]
    async fn handles_are_sequential() {
        let archive = InMemoryArchive::new("demo");
        let a = archive.create("a").await.unwrap();
        let b = archive.create("a").await.unwrap();
        assert_eq!(a.file_id.get() + 1, b.file_id.get());
        assert_eq!(a.content_ref, b.content_ref);
        assert_eq!(archive.file_count(), 2);
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let archive = InMemoryArchive::new("demo");
        assert_eq!(
            archive.read(FileId::new(3)).await.unwrap_err(),
            StorageError::NotFound {
                file_id: FileId::new(3)
            }
        );
        assert!(archive.update(FileId::new(0), "x").await.is_err());
    }

    #[tokio::test]
    async fn rejected_writes_fail() {
        let archive = InMemoryArchive::new("demo");
        archive.fail_writes(true);
        assert!(matches!(
            archive.create("x").await,
            Err(StorageError::WriteFailed { .. })
        ));
        archive.fail_writes(false);
        assert!(archive.create("x").await.is_ok());
    }

    #[tokio::test]
    async fn observers_see_creates_only() {
        let recorder = Arc::new(Recorder::default());
        let archive = InMemoryArchive::new("portal-1")
            .with_author("alice")
            .with_observer(recorder.clone());

        let created = archive.create("first").await.unwrap();
        archive.update(created.file_id, "second").await.unwrap();

        let seen = recorder.0.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "portal-1");
        assert_eq!(seen[0].1.file_id, created.file_id);
        assert_eq!(seen[0].1.by, "alice");
    }
}
