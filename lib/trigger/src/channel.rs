//! In-process notification fan-out.
//!
//! Registered as an archive observer, a `ChannelTrigger` loops the
//! archive's own announcements back to local subscribers.

use crate::error::TriggerError;
use crate::notification::{Notification, SourceFilter};
use crate::trigger::{EventTrigger, Subscription};
use async_trait::async_trait;
use roundtable_archive::{AddedFile, ArchiveObserver};
use tokio::sync::broadcast;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tracing::{debug, instrument, warn};

/// Default number of undelivered notifications kept per subscriber.
pub const DEFAULT_CAPACITY: usize = 64;

/// A notification bus backed by a tokio broadcast channel.
#[derive(Debug, Clone)]
pub struct ChannelTrigger {
    tx: broadcast::Sender<Notification>,
}

impl ChannelTrigger {
    /// Creates a bus holding up to `capacity` notifications per lagging subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Sends `notification` to every live subscription.
    ///
    /// Returns how many subscriptions received it; zero when nobody listens.
    pub fn send(&self, notification: Notification) -> usize {
        self.tx.send(notification).unwrap_or(0)
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ChannelTrigger {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[async_trait]
impl EventTrigger for ChannelTrigger {
    #[instrument(skip(self), fields(source = %filter.source()))]
    async fn subscribe(&self, filter: &SourceFilter) -> Result<Subscription, TriggerError> {
        let wanted = filter.clone();
        let stream = BroadcastStream::new(self.tx.subscribe()).filter_map(move |item| match item {
            Ok(notification) if wanted.matches(&notification) => Some(notification),
            Ok(_) => None,
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                warn!(skipped, "subscriber lagged, notifications dropped");
                None
            }
        });

        Ok(Subscription::new(filter.clone(), Box::pin(stream)))
    }

    async fn publish(&self, notification: &Notification) -> Result<(), TriggerError> {
        let delivered = self.send(notification.clone());
        debug!(delivered, source = %notification.source, "notification sent");
        Ok(())
    }
}

#[async_trait]
impl ArchiveObserver for ChannelTrigger {
    async fn file_added(&self, source: &str, event: &AddedFile) {
        self.send(Notification::new(source, event.clone()));
    }
}
