//! Turns and transcripts.

use chrono::{DateTime, Utc};
use roundtable_core::SessionId;
use serde::Serialize;

/// One participant's response within one round.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Turn {
    /// Zero-based round number.
    pub round: u32,
    /// Seat of the responding participant.
    pub participant_index: usize,
    /// Display label of the responding participant.
    pub participant_label: String,
    /// Model identifier of the responding participant.
    pub model: String,
    /// The context the participant was asked to respond to.
    pub input_context: String,
    /// What it answered.
    pub output_text: String,
    /// When the answer was recorded.
    pub recorded_at: DateTime<Utc>,
}

/// The ordered record of a session's turns.
///
/// Turns are kept in generation order, which is strictly
/// `(round, participant_index)` ascending with no gaps. Only the engine
/// appends to a transcript, so that ordering holds for every value a
/// caller can observe.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transcript {
    session_id: SessionId,
    participant_count: usize,
    turns: Vec<Turn>,
}

impl Transcript {
    pub(crate) fn new(session_id: SessionId, participant_count: usize) -> Self {
        Self {
            session_id,
            participant_count,
            turns: Vec::new(),
        }
    }

    /// The `(round, participant_index)` the next turn must carry.
    #[must_use]
    pub fn next_position(&self) -> (u32, usize) {
        let len = self.turns.len();
        let round = u32::try_from(len / self.participant_count).unwrap_or(u32::MAX);
        (round, len % self.participant_count)
    }

    pub(crate) fn push(&mut self, turn: Turn) {
        debug_assert_eq!(
            (turn.round, turn.participant_index),
            self.next_position(),
            "turns must be appended in (round, participant) order"
        );
        self.turns.push(turn);
    }

    /// The session that produced this transcript.
    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Number of seats in the session.
    #[must_use]
    pub fn participant_count(&self) -> usize {
        self.participant_count
    }

    /// All turns in generation order.
    #[must_use]
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Number of completed turns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Returns true if no turn completed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// The most recent turn, if any.
    #[must_use]
    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// Turns grouped by round. The last group is short if the session aborted mid-round.
    pub fn rounds(&self) -> impl Iterator<Item = &[Turn]> {
        self.turns.chunks(self.participant_count)
    }

    /// Consumes the transcript, returning its turns.
    #[must_use]
    pub fn into_turns(self) -> Vec<Turn> {
        self.turns
    }
}
