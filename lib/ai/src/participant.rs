//! Conversation participants.
//!
//! A participant is a named, stateless request/response text endpoint.
//! It holds no state across calls and never retries; callers that need
//! resilience wrap the backend instead.

use crate::backend::{LlmBackend, LlmRequest};
use crate::error::ParticipantError;
use roundtable_core::InvocationId;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Models used for multi-participant conversations, in seating order.
pub const CONVERSATION_MODELS: &[&str] = &["smollm:360m", "qwen3:0.6b"];

/// Models used for single-prompt, memory and event-triggered flows.
pub const SINGLE_PROMPT_MODELS: &[&str] = &["qwen3:0.6b", "smollm:360m"];

/// Returns the first `count` models of `roster`.
///
/// Asking for more models than the roster holds returns the whole roster.
#[must_use]
pub fn default_models(roster: &[&str], count: usize) -> Vec<String> {
    roster.iter().take(count).map(|m| (*m).to_string()).collect()
}

/// A model-backed text responder with a fixed seat in a session.
#[derive(Clone)]
pub struct Participant {
    position: usize,
    label: String,
    backend: Arc<dyn LlmBackend>,
}

impl fmt::Debug for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Participant")
            .field("position", &self.position)
            .field("label", &self.label)
            .field("model", &self.backend.model())
            .finish()
    }
}

impl Participant {
    /// Creates a participant seated at `position`.
    #[must_use]
    pub fn new(position: usize, label: impl Into<String>, backend: Arc<dyn LlmBackend>) -> Self {
        Self {
            position,
            label: label.into(),
            backend,
        }
    }

    /// Creates a participant labelled by its seat, e.g. `Model 1` for position 0.
    #[must_use]
    pub fn seated(position: usize, backend: Arc<dyn LlmBackend>) -> Self {
        Self::new(position, format!("Model {}", position + 1), backend)
    }

    /// Returns a copy of this participant moved to another seat.
    #[must_use]
    pub fn at_position(mut self, position: usize) -> Self {
        self.position = position;
        self
    }

    /// Zero-based seat in the session.
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Display name.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Model identifier of the wrapped backend.
    #[must_use]
    pub fn model(&self) -> &str {
        self.backend.model()
    }

    /// Sends `prompt` to the backend and returns its text.
    ///
    /// # Errors
    ///
    /// Returns `BackendUnavailable` when the backend cannot be reached and
    /// `BackendError` when it fails or answers with empty text.
    #[instrument(skip(self, prompt), fields(participant = %self.label, model = %self.model(), invocation = tracing::field::Empty))]
    pub async fn respond(&self, prompt: &str) -> Result<String, ParticipantError> {
        let invocation = InvocationId::new();
        tracing::Span::current().record("invocation", tracing::field::display(invocation));

        let response = self
            .backend
            .generate(&LlmRequest::new(prompt))
            .await
            .map_err(|e| ParticipantError::from_llm(self.model(), &e))?;

        if response.content.trim().is_empty() {
            return Err(ParticipantError::BackendError {
                model: self.model().to_string(),
                reason: "empty response".to_string(),
            });
        }

        debug!(chars = response.content.len(), "participant responded");
        Ok(response.content)
    }
}
