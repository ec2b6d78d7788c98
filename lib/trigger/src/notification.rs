//! Notifications and source filters.

use roundtable_archive::{AddedFile, ContentRef};
use serde::{Deserialize, Serialize};

/// A file-added announcement from one archive source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// The archive that created the file.
    pub source: String,
    /// What was created.
    pub event: AddedFile,
}

impl Notification {
    /// Creates a notification for `event` from `source`.
    #[must_use]
    pub fn new(source: impl Into<String>, event: AddedFile) -> Self {
        Self {
            source: source.into(),
            event,
        }
    }

    /// The reference to the announced content.
    #[must_use]
    pub fn content_ref(&self) -> &ContentRef {
        &self.event.content_ref
    }
}

/// Selects notifications from exactly one source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceFilter {
    source: String,
}

impl SourceFilter {
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns true if `notification` came from this filter's source.
    #[must_use]
    pub fn matches(&self, notification: &Notification) -> bool {
        notification.source == self.source
    }
}
