//! Error types for the archive crate.

use crate::sink::{ContentRef, FileId};
use std::fmt;

/// Errors from archive operations.
///
/// None of these are retried by the archive itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// No file with this handle exists.
    NotFound { file_id: FileId },
    /// No content is stored under this reference.
    ContentNotFound { content_ref: ContentRef },
    /// The namespace cannot be used as a storage location.
    InvalidNamespace { namespace: String, reason: String },
    /// The content reference is not in a recognised form.
    InvalidContentRef { value: String },
    /// Writing content or the file index failed.
    WriteFailed { reason: String },
    /// Reading content or the file index failed.
    ReadFailed { reason: String },
    /// Stored data did not decode.
    Corrupt { reason: String },
    /// The HTTP gateway could not serve the content.
    Gateway { url: String, reason: String },
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { file_id } => write!(f, "file not found: {file_id}"),
            Self::ContentNotFound { content_ref } => {
                write!(f, "content not found: {content_ref}")
            }
            Self::InvalidNamespace { namespace, reason } => {
                write!(f, "invalid namespace '{namespace}': {reason}")
            }
            Self::InvalidContentRef { value } => {
                write!(f, "invalid content reference: {value}")
            }
            Self::WriteFailed { reason } => write!(f, "archive write failed: {reason}"),
            Self::ReadFailed { reason } => write!(f, "archive read failed: {reason}"),
            Self::Corrupt { reason } => write!(f, "archive data corrupt: {reason}"),
            Self::Gateway { url, reason } => {
                write!(f, "gateway fetch of '{url}' failed: {reason}")
            }
        }
    }
}

impl std::error::Error for StorageError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display() {
        let err = StorageError::NotFound {
            file_id: FileId::new(7),
        };
        assert_eq!(err.to_string(), "file not found: 7");
    }

    #[test]
    fn gateway_display_names_url() {
        let err = StorageError::Gateway {
            url: "https://gw.example/ipfs/abc".to_string(),
            reason: "HTTP 504".to_string(),
        };
        assert!(err.to_string().contains("gw.example"));
        assert!(err.to_string().contains("504"));
    }
}
