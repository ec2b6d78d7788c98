//! NATS notification bridge.
//!
//! Notifications travel as JSON on `<prefix>.<source>`, one subject per
//! archive source. Publishing and subscribing use the same subject, so a
//! `NatsTrigger` registered as an archive observer lets any process on the
//! bus react to that archive's new files.

use crate::error::TriggerError;
use crate::notification::{Notification, SourceFilter};
use crate::trigger::{EventTrigger, Subscription};
use async_trait::async_trait;
use futures::StreamExt;
use roundtable_archive::{AddedFile, ArchiveObserver};
use tracing::{debug, instrument, warn};

/// Subject prefix used when none is configured.
pub const DEFAULT_SUBJECT_PREFIX: &str = "roundtable.files";

/// A trigger backed by core NATS publish/subscribe.
#[derive(Debug, Clone)]
pub struct NatsTrigger {
    client: async_nats::Client,
    prefix: String,
}

impl NatsTrigger {
    /// Connects to the NATS server at `url`.
    ///
    /// # Errors
    ///
    /// Returns `TriggerError::Connect` if the server cannot be reached.
    pub async fn connect(url: &str, prefix: impl Into<String>) -> Result<Self, TriggerError> {
        let client = async_nats::connect(url)
            .await
            .map_err(|e| TriggerError::Connect {
                reason: e.to_string(),
            })?;

        Ok(Self::with_client(client, prefix))
    }

    /// Wraps an existing client.
    #[must_use]
    pub fn with_client(client: async_nats::Client, prefix: impl Into<String>) -> Self {
        Self {
            client,
            prefix: prefix.into(),
        }
    }

    /// The subject notifications from `source` travel on.
    #[must_use]
    pub fn subject_for(&self, source: &str) -> String {
        subject(&self.prefix, source)
    }
}

fn subject(prefix: &str, source: &str) -> String {
    format!("{}.{source}", prefix.trim_end_matches('.'))
}

fn encode(notification: &Notification) -> Result<Vec<u8>, TriggerError> {
    serde_json::to_vec(notification).map_err(|e| TriggerError::Codec {
        reason: e.to_string(),
    })
}

fn decode(payload: &[u8]) -> Result<Notification, TriggerError> {
    serde_json::from_slice(payload).map_err(|e| TriggerError::Codec {
        reason: e.to_string(),
    })
}

#[async_trait]
impl EventTrigger for NatsTrigger {
    #[instrument(skip(self), fields(source = %filter.source()))]
    async fn subscribe(&self, filter: &SourceFilter) -> Result<Subscription, TriggerError> {
        let subject = self.subject_for(filter.source());
        let subscriber =
            self.client
                .subscribe(subject.clone())
                .await
                .map_err(|e| TriggerError::Subscribe {
                    reason: e.to_string(),
                })?;
        // The server must have registered the SUB before publishes from
        // other connections are routed to it.
        self.client
            .flush()
            .await
            .map_err(|e| TriggerError::Subscribe {
                reason: e.to_string(),
            })?;
        debug!(subject = %subject, "subscribed");

        let wanted = filter.clone();
        let stream = subscriber.filter_map(move |message| {
            let notification = match decode(&message.payload) {
                Ok(n) if wanted.matches(&n) => Some(n),
                Ok(n) => {
                    warn!(source = %n.source, "notification on wrong subject, ignored");
                    None
                }
                Err(e) => {
                    warn!(error = %e, "undecodable notification, ignored");
                    None
                }
            };
            futures::future::ready(notification)
        });

        Ok(Subscription::new(filter.clone(), Box::pin(stream)))
    }

    #[instrument(skip(self, notification), fields(source = %notification.source))]
    async fn publish(&self, notification: &Notification) -> Result<(), TriggerError> {
        let payload = encode(notification)?;
        let subject = self.subject_for(&notification.source);

        self.client
            .publish(subject, payload.into())
            .await
            .map_err(|e| TriggerError::Publish {
                reason: e.to_string(),
            })?;
        self.client.flush().await.map_err(|e| TriggerError::Publish {
            reason: e.to_string(),
        })?;

        Ok(())
    }
}

#[async_trait]
impl ArchiveObserver for NatsTrigger {
    async fn file_added(&self, source: &str, event: &AddedFile) {
        let notification = Notification::new(source, event.clone());
        if let Err(e) = self.publish(&notification).await {
            warn!(error = %e, file_id = %event.file_id, "failed to announce file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::tests::added;

    #[test]
    fn subject_per_source() {
        assert_eq!(
            subject(DEFAULT_SUBJECT_PREFIX, "portal-a"),
            "roundtable.files.portal-a"
        );
        assert_eq!(subject("custom.", "p"), "custom.p");
    }

    #[test]
    fn payload_codec() {
        let n = added("portal-a", 2, "content");
        let bytes = encode(&n).unwrap();
        assert_eq!(decode(&bytes).unwrap(), n);
    }

    #[test]
    fn garbage_payload_is_codec_error() {
        assert!(matches!(
            decode(b"not json"),
            Err(TriggerError::Codec { .. })
        ));
        assert!(matches!(
            decode(br#"{"source":"p","event":{"file_id":1}}"#),
            Err(TriggerError::Codec { .. })
        ));
    }
}
