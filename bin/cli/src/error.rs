//! Error types for the command-line driver.
//!
//! Library errors are wrapped with `.context()` into one of these
//! variants, naming the step of the command that failed.

use std::fmt;

/// Errors from running a `roundtable` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliError {
    /// Configuration could not be loaded or failed validation.
    Configuration,
    /// The archive could not be opened or an archive call failed.
    Storage { operation: &'static str },
    /// An inference backend could not be set up.
    Backend { model: String },
    /// A turn-taking session aborted.
    Session,
    /// The memory loop failed.
    Memory,
    /// The event-triggered flow failed.
    Trigger,
    /// Command-line arguments were accepted by the parser but are unusable.
    InvalidArgument { name: &'static str, reason: String },
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "invalid configuration"),
            Self::Storage { operation } => write!(f, "archive {operation} failed"),
            Self::Backend { model } => write!(f, "failed to set up backend for model '{model}'"),
            Self::Session => write!(f, "conversation aborted"),
            Self::Memory => write!(f, "memory loop failed"),
            Self::Trigger => write!(f, "event-triggered summarization failed"),
            Self::InvalidArgument { name, reason } => {
                write!(f, "invalid --{name}: {reason}")
            }
        }
    }
}

impl std::error::Error for CliError {}
