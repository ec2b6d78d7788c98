//! Error types for triggers and event-driven flows.

use roundtable_ai::ParticipantError;
use roundtable_archive::{ContentRef, StorageError};
use std::fmt;

/// Errors from subscribing to, delivering, or acting on notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerError {
    /// The notification stream ended before a matching notification arrived.
    StreamClosed { source: String },
    /// Connecting to the notification transport failed.
    Connect { reason: String },
    /// Registering the subscription failed.
    Subscribe { reason: String },
    /// Delivering a notification failed.
    Publish { reason: String },
    /// A notification payload could not be encoded or decoded.
    Codec { reason: String },
    /// The announced content could not be fetched.
    Fetch {
        content_ref: ContentRef,
        source: StorageError,
    },
    /// The summarizing participant failed.
    Summarize { source: ParticipantError },
    /// The summary could not be archived.
    Persist { source: StorageError },
}

impl fmt::Display for TriggerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StreamClosed { source } => {
                write!(f, "notification stream for '{source}' closed before any event")
            }
            Self::Connect { reason } => write!(f, "failed to connect to notifier: {reason}"),
            Self::Subscribe { reason } => write!(f, "failed to subscribe: {reason}"),
            Self::Publish { reason } => write!(f, "failed to publish notification: {reason}"),
            Self::Codec { reason } => write!(f, "malformed notification: {reason}"),
            Self::Fetch {
                content_ref,
                source,
            } => write!(f, "failed to fetch {content_ref}: {source}"),
            Self::Summarize { source } => write!(f, "summarization failed: {source}"),
            Self::Persist { source } => write!(f, "failed to archive summary: {source}"),
        }
    }
}

impl std::error::Error for TriggerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Fetch { source, .. } | Self::Persist { source } => Some(source),
            Self::Summarize { source } => Some(source),
            _ => None,
        }
    }
}
