//! The turn-taking engine.
//!
//! Participants are visited strictly in seat order, every round, with one
//! call in flight at a time: each turn's input is composed from the
//! previous turn's output, so there is nothing to run in parallel.

use crate::compose::{ContextComposer, LabelledEcho};
use crate::error::{SessionAborted, SessionError};
use crate::turn::{Transcript, Turn};
use chrono::Utc;
use roundtable_ai::Participant;
use roundtable_core::SessionId;
use tracing::{info, instrument, warn};

/// Drives an ordered, fixed set of participants through sequential turns.
#[derive(Debug)]
pub struct TurnEngine<C = LabelledEcho> {
    participants: Vec<Participant>,
    composer: C,
}

impl TurnEngine<LabelledEcho> {
    /// Creates an engine owning `participants`, re-seated by their order.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoParticipants` if `participants` is empty.
    pub fn new(participants: Vec<Participant>) -> Result<Self, SessionError> {
        if participants.is_empty() {
            return Err(SessionError::NoParticipants);
        }

        let participants = participants
            .into_iter()
            .enumerate()
            .map(|(i, p)| p.at_position(i))
            .collect();

        Ok(Self {
            participants,
            composer: LabelledEcho,
        })
    }
}

impl<C: ContextComposer> TurnEngine<C> {
    /// Replaces the context composer.
    #[must_use]
    pub fn with_composer<D: ContextComposer>(self, composer: D) -> TurnEngine<D> {
        TurnEngine {
            participants: self.participants,
            composer,
        }
    }

    /// The seated participants.
    #[must_use]
    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    /// Runs `rounds` full rounds starting from `seed_prompt`.
    ///
    /// Makes exactly `rounds × participants` calls on success. Zero rounds
    /// is valid and yields an empty transcript without calling anyone.
    ///
    /// # Errors
    ///
    /// Stops at the first failing participant and returns the error
    /// together with every turn completed before it.
    #[instrument(skip(self, seed_prompt), fields(session = tracing::field::Empty, participants = self.participants.len()))]
    pub async fn run_session(
        &self,
        seed_prompt: &str,
        rounds: u32,
    ) -> Result<Transcript, SessionAborted> {
        let session_id = SessionId::new();
        tracing::Span::current().record("session", tracing::field::display(session_id));

        let mut transcript = Transcript::new(session_id, self.participants.len());
        let mut context = seed_prompt.to_string();

        for round in 0..rounds {
            for (index, participant) in self.participants.iter().enumerate() {
                let output = match participant.respond(&context).await {
                    Ok(output) => output,
                    Err(source) => {
                        warn!(round = round + 1, participant = %participant.label(), error = %source, "turn failed, aborting session");
                        return Err(SessionAborted {
                            error: SessionError::ParticipantFailed {
                                round,
                                participant_index: index,
                                label: participant.label().to_string(),
                                source,
                            },
                            partial: transcript,
                        });
                    }
                };

                info!(
                    round = round + 1,
                    rounds,
                    participant = %participant.label(),
                    model = %participant.model(),
                    "Discussion progress"
                );

                let next = self.composer.compose(&output);
                transcript.push(Turn {
                    round,
                    participant_index: index,
                    participant_label: participant.label().to_string(),
                    model: participant.model().to_string(),
                    input_context: std::mem::replace(&mut context, next),
                    output_text: output,
                    recorded_at: Utc::now(),
                });
            }
        }

        Ok(transcript)
    }
}

/// Runs a single turn: one participant answers one prompt.
///
/// # Errors
///
/// Returns the participant's failure with an empty partial transcript.
pub async fn respond_once(
    participant: &Participant,
    prompt: &str,
) -> Result<Transcript, SessionAborted> {
    let engine = TurnEngine::new(vec![participant.clone()]).map_err(|error| SessionAborted {
        error,
        partial: Transcript::new(SessionId::new(), 1),
    })?;
    engine.run_session(prompt, 1).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::TopicContinuation;
    use roundtable_ai::{LlmError, ParticipantError, ScriptedBackend};
    use std::sync::Arc;

    fn echo_participants(models: &[&str]) -> (Vec<Participant>, Vec<Arc<ScriptedBackend>>) {
        let backends: Vec<_> = models
            .iter()
            .map(|m| Arc::new(ScriptedBackend::echo(*m)))
            .collect();
        let participants = backends
            .iter()
            .enumerate()
            .map(|(i, b)| Participant::seated(i, b.clone()))
            .collect();
        (participants, backends)
    }

    #[test]
    fn empty_roster_is_rejected() {
        assert_eq!(
            TurnEngine::new(Vec::new()).unwrap_err(),
            SessionError::NoParticipants
        );
    }

    #[test]
    fn participants_are_reseated_by_order() {
        let backend: Arc<ScriptedBackend> = Arc::new(ScriptedBackend::echo("m"));
        let engine = TurnEngine::new(vec![
            Participant::new(7, "A", backend.clone()),
            Participant::new(7, "B", backend),
        ])
        .unwrap();
        let seats: Vec<_> = engine.participants().iter().map(Participant::position).collect();
        assert_eq!(seats, vec![0, 1]);
    }

    #[tokio::test]
    async fn zero_rounds_makes_no_calls() {
        let (participants, backends) = echo_participants(&["a", "b"]);
        let engine = TurnEngine::new(participants).unwrap();

        let transcript = engine.run_session("X", 0).await.unwrap();
        assert!(transcript.is_empty());
        assert!(backends.iter().all(|b| b.calls() == 0));
    }

    #[tokio::test]
    async fn turn_count_and_order() {
        for count in 1..=3usize {
            for rounds in 0..=3u32 {
                let models: Vec<String> = (0..count).map(|i| format!("m{i}")).collect();
                let refs: Vec<&str> = models.iter().map(String::as_str).collect();
                let (participants, _) = echo_participants(&refs);
                let engine = TurnEngine::new(participants).unwrap();

                let transcript = engine.run_session("seed", rounds).await.unwrap();
                assert_eq!(transcript.len(), rounds as usize * count);

                let positions: Vec<_> = transcript
                    .turns()
                    .iter()
                    .map(|t| (t.round, t.participant_index))
                    .collect();
                let expected: Vec<_> = (0..rounds)
                    .flat_map(|r| (0..count).map(move |i| (r, i)))
                    .collect();
                assert_eq!(positions, expected);
            }
        }
    }

    #[tokio::test]
    async fn two_participants_two_rounds_thread_context() {
        let a = Arc::new(ScriptedBackend::replies("A", ["a0", "a1"]));
        let b = Arc::new(ScriptedBackend::replies("B", ["b0", "b1"]));
        let engine = TurnEngine::new(vec![
            Participant::new(0, "A", a.clone()),
            Participant::new(1, "B", b.clone()),
        ])
        .unwrap();

        let transcript = engine.run_session("X", 2).await.unwrap();
        let inputs: Vec<_> = transcript
            .turns()
            .iter()
            .map(|t| (t.round, t.participant_label.as_str(), t.input_context.as_str()))
            .collect();

        assert_eq!(
            inputs,
            vec![
                (0, "A", "X"),
                (0, "B", "Previous response: a0"),
                (1, "A", "Previous response: b0"),
                (1, "B", "Previous response: a1"),
            ]
        );
        assert_eq!(a.prompts(), vec!["X", "Previous response: b0"]);
        assert_eq!(transcript.last().unwrap().output_text, "b1");
    }

    #[tokio::test]
    async fn topic_continuation_threads_topic() {
        let (participants, backends) = echo_participants(&["smollm:360m"]);
        let topic = TopicContinuation::new("why is sky blue?");
        let seed = topic.seed_prompt();
        let engine = TurnEngine::new(participants).unwrap().with_composer(topic);

        engine.run_session(&seed, 2).await.unwrap();

        let prompts = backends[0].prompts();
        assert_eq!(prompts[0], seed);
        assert!(prompts[1].starts_with("Previous response: smollm:360m says: Let's discuss"));
        assert!(prompts[1].ends_with("Please continue the discussion about why is sky blue?."));
    }

    #[tokio::test]
    async fn failure_keeps_partial_transcript() {
        // Seat 1 fails in round 1 (its second call): 1 × 2 + 1 turns complete.
        let a = Arc::new(ScriptedBackend::echo("A"));
        let b = Arc::new(
            ScriptedBackend::echo("B")
                .then_reply("b0")
                .then_fail(LlmError::Timeout),
        );
        let engine = TurnEngine::new(vec![
            Participant::seated(0, a.clone()),
            Participant::seated(1, b),
        ])
        .unwrap();

        let aborted = engine.run_session("X", 3).await.unwrap_err();
        assert_eq!(aborted.partial.len(), 3);
        match aborted.error {
            SessionError::ParticipantFailed {
                round,
                participant_index,
                ref label,
                ref source,
            } => {
                assert_eq!((round, participant_index), (1, 1));
                assert_eq!(label, "Model 2");
                assert!(matches!(source, ParticipantError::BackendUnavailable { .. }));
            }
            ref other => panic!("unexpected error: {other}"),
        }
        // Nothing after the failing seat was called.
        assert_eq!(a.calls(), 2);
    }

    #[tokio::test]
    async fn first_call_failure_yields_empty_partial() {
        let a = Arc::new(ScriptedBackend::replies("A", [""]));
        let engine = TurnEngine::new(vec![Participant::seated(0, a)]).unwrap();

        let aborted = engine.run_session("X", 1).await.unwrap_err();
        assert!(aborted.partial.is_empty());
        assert!(matches!(
            aborted.error,
            SessionError::ParticipantFailed {
                round: 0,
                participant_index: 0,
                source: ParticipantError::BackendError { .. },
                ..
            }
        ));
    }

    #[tokio::test]
    async fn respond_once_is_a_single_turn() {
        let backend = Arc::new(ScriptedBackend::replies("qwen3:0.6b", ["Simmer tomatoes."]));
        let participant = Participant::seated(0, backend);

        let transcript = respond_once(&participant, "How to make tomato soup?")
            .await
            .unwrap();
        assert_eq!(transcript.len(), 1);
        let turn = &transcript.turns()[0];
        assert_eq!(turn.input_context, "How to make tomato soup?");
        assert_eq!(turn.output_text, "Simmer tomatoes.");
    }
}
