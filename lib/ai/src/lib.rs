//! Inference primitives for roundtable.
//!
//! - **Backend**: the `LlmBackend` trait and its request/response types
//! - **Ollama**: an HTTP backend talking to a local Ollama daemon
//! - **Participant**: a named, stateless request/response text endpoint
//!   wrapping one backend connection
//! - **Scripted**: a deterministic backend for tests and dry runs

pub mod backend;
pub mod error;
pub mod ollama;
pub mod participant;
pub mod scripted;

pub use backend::{LlmBackend, LlmProvider, LlmRequest, LlmResponse, TokenUsage};
pub use error::{LlmError, ParticipantError};
pub use ollama::{OllamaBackend, OllamaConfig};
pub use participant::{
    CONVERSATION_MODELS, Participant, SINGLE_PROMPT_MODELS, default_models,
};
pub use scripted::ScriptedBackend;
