//! Error types for the conversation crate.
//!
//! - `SessionError`: why a turn-taking session could not start or finish
//! - `SessionAborted`: a failed session together with the turns it completed
//! - `MemoryError`: a memory loop failure, tagged with the stage it hit

use crate::memory::MemoryState;
use crate::turn::Transcript;
use roundtable_ai::ParticipantError;
use roundtable_archive::StorageError;
use std::fmt;

/// Errors from turn-taking sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// A session needs at least one participant.
    NoParticipants,
    /// A participant call failed; the session stopped at this seat.
    ParticipantFailed {
        round: u32,
        participant_index: usize,
        label: String,
        source: ParticipantError,
    },
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoParticipants => write!(f, "a session needs at least one participant"),
            Self::ParticipantFailed {
                round,
                participant_index,
                label,
                source,
            } => write!(
                f,
                "{label} (seat {participant_index}) failed in round {}: {source}",
                round + 1
            ),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::NoParticipants => None,
            Self::ParticipantFailed { source, .. } => Some(source),
        }
    }
}

/// A session that stopped early.
///
/// Carries every turn completed before the failure so callers can still
/// report or archive them.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionAborted {
    /// What stopped the session.
    pub error: SessionError,
    /// Turns completed before the failure.
    pub partial: Transcript,
}

impl fmt::Display for SessionAborted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "session {} aborted after {} turn(s): {}",
            self.partial.session_id(),
            self.partial.len(),
            self.error
        )
    }
}

impl std::error::Error for SessionAborted {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Errors from the memory loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    /// An archive call failed.
    Storage {
        stage: MemoryState,
        source: StorageError,
    },
    /// The answering turn failed.
    Session {
        stage: MemoryState,
        source: SessionError,
    },
    /// The summarizing participant failed.
    Participant {
        stage: MemoryState,
        source: ParticipantError,
    },
}

impl MemoryError {
    /// The state the loop was in when the failure happened.
    #[must_use]
    pub fn stage(&self) -> MemoryState {
        match self {
            Self::Storage { stage, .. }
            | Self::Session { stage, .. }
            | Self::Participant { stage, .. } => *stage,
        }
    }
}

impl fmt::Display for MemoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Storage { stage, source } => {
                write!(f, "memory loop storage failure while {stage}: {source}")
            }
            Self::Session { stage, source } => {
                write!(f, "memory loop turn failure while {stage}: {source}")
            }
            Self::Participant { stage, source } => {
                write!(f, "memory loop participant failure while {stage}: {source}")
            }
        }
    }
}

impl std::error::Error for MemoryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Storage { source, .. } => Some(source),
            Self::Session { source, .. } => Some(source),
            Self::Participant { source, .. } => Some(source),
        }
    }
}
