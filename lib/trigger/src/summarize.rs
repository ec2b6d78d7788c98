//! Summarize a file as soon as an archive announces it.

use crate::error::TriggerError;
use crate::notification::{Notification, SourceFilter};
use crate::once::once;
use crate::trigger::EventTrigger;
use roundtable_ai::Participant;
use roundtable_archive::{ArchiveSink, ContentResolver, CreatedFile};
use std::fmt;
use std::sync::Arc;
use tracing::{info, instrument};

/// Builds the prompt asking for a summary of `content`.
#[must_use]
pub fn summary_request(content: &str) -> String {
    format!("Summarise this in 5 sentences: {content}")
}

/// The result of handling one notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventOutcome {
    /// The notification that fired.
    pub notification: Notification,
    /// The participant's summary.
    pub summary: String,
    /// Where the summary was archived.
    pub created: CreatedFile,
}

/// Watches one archive and summarizes the first file it announces.
pub struct SummarizeOnEvent {
    archive: Arc<dyn ArchiveSink>,
    resolver: Option<Arc<dyn ContentResolver>>,
    participant: Participant,
}

impl fmt::Debug for SummarizeOnEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SummarizeOnEvent")
            .field("source", &self.archive.source_id())
            .field("external_resolver", &self.resolver.is_some())
            .field("participant", &self.participant)
            .finish()
    }
}

impl SummarizeOnEvent {
    /// Summarizes files announced by `archive`, fetching them from it too.
    #[must_use]
    pub fn new(archive: Arc<dyn ArchiveSink>, participant: Participant) -> Self {
        Self {
            archive,
            resolver: None,
            participant,
        }
    }

    /// Fetches announced content through `resolver` (e.g. a gateway) instead.
    #[must_use]
    pub fn with_resolver(mut self, resolver: Arc<dyn ContentResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// The filter selecting this archive's announcements.
    #[must_use]
    pub fn filter(&self) -> SourceFilter {
        SourceFilter::new(self.archive.source_id())
    }

    /// Waits for one announcement from the archive and handles it.
    ///
    /// The trigger is unsubscribed before the summary is archived, so the
    /// summary's own announcement is never picked up.
    ///
    /// # Errors
    ///
    /// Returns the first failure from subscribing, fetching, summarizing
    /// or archiving.
    pub async fn run_once<T>(&self, trigger: &T) -> Result<EventOutcome, TriggerError>
    where
        T: EventTrigger + ?Sized,
    {
        let notification = once(trigger, &self.filter()).await?;
        self.handle(notification).await
    }

    /// Fetches the announced content, summarizes it and archives the summary.
    ///
    /// # Errors
    ///
    /// Returns `Fetch`, `Summarize` or `Persist` depending on which step failed.
    #[instrument(skip(self, notification), fields(file_id = %notification.event.file_id))]
    pub async fn handle(&self, notification: Notification) -> Result<EventOutcome, TriggerError> {
        let content_ref = notification.content_ref();
        let fetched = match &self.resolver {
            Some(resolver) => resolver.resolve(content_ref).await,
            None => self.archive.resolve(content_ref).await,
        };
        let content = fetched.map_err(|source| TriggerError::Fetch {
            content_ref: content_ref.clone(),
            source,
        })?;
        info!(chars = content.len(), "announced content fetched");

        let summary = self
            .participant
            .respond(&summary_request(&content))
            .await
            .map_err(|source| TriggerError::Summarize { source })?;

        let created = self
            .archive
            .create(&summary)
            .await
            .map_err(|source| TriggerError::Persist { source })?;
        info!(summary_file = %created.file_id, "summary archived");

        Ok(EventOutcome {
            notification,
            summary,
            created,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::tests::added;
    use roundtable_ai::ScriptedBackend;
    use roundtable_archive::{InMemoryArchive, StorageError};

    #[test]
    fn request_wording() {
        assert_eq!(
            summary_request("Hello World"),
            "Summarise this in 5 sentences: Hello World"
        );
    }

    #[tokio::test]
    async fn handle_summarizes_and_archives() {
        let archive = Arc::new(InMemoryArchive::new("portal"));
        let source = archive.create("Hello World").await.unwrap();
        let backend = Arc::new(ScriptedBackend::replies("qwen3:0.6b", ["A greeting."]));
        let flow = SummarizeOnEvent::new(archive.clone(), Participant::seated(0, backend.clone()));

        let notification = Notification::new(
            "portal",
            roundtable_archive::AddedFile {
                file_id: source.file_id,
                content_ref: source.content_ref.clone(),
                by: "0xagent".to_string(),
            },
        );
        let outcome = flow.handle(notification).await.unwrap();

        assert_eq!(outcome.summary, "A greeting.");
        assert_eq!(
            archive.read(outcome.created.file_id).await.unwrap(),
            "A greeting."
        );
        assert_eq!(
            backend.prompts(),
            vec!["Summarise this in 5 sentences: Hello World"]
        );
    }

    #[tokio::test]
    async fn unknown_content_is_fetch_error() {
        let archive = Arc::new(InMemoryArchive::new("portal"));
        let backend = Arc::new(ScriptedBackend::echo("qwen3:0.6b"));
        let flow = SummarizeOnEvent::new(archive.clone(), Participant::seated(0, backend.clone()));

        let err = flow
            .handle(added("portal", 0, "never stored"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TriggerError::Fetch {
                source: StorageError::ContentNotFound { .. },
                ..
            }
        ));
        assert_eq!(backend.calls(), 0);
        assert_eq!(archive.file_count(), 0);
    }

    #[tokio::test]
    async fn external_resolver_is_preferred() {
        let archive = Arc::new(InMemoryArchive::new("portal"));
        let gateway = Arc::new(InMemoryArchive::new("gateway"));
        let stored = gateway.create("remote text").await.unwrap();

        let backend = Arc::new(ScriptedBackend::echo("qwen3:0.6b"));
        let flow = SummarizeOnEvent::new(archive, Participant::seated(0, backend.clone()))
            .with_resolver(gateway);

        let mut notification = added("portal", 0, "remote text");
        notification.event.content_ref = stored.content_ref;
        flow.handle(notification).await.unwrap();

        assert_eq!(
            backend.prompts(),
            vec!["Summarise this in 5 sentences: remote text"]
        );
    }
}
