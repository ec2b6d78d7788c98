//! Error types for the AI crate.
//!
//! - `LlmError`: low-level backend failures, as reported by a transport
//! - `ParticipantError`: the two-way split callers act on (could the
//!   backend be reached at all, or did it answer with something unusable)

use std::fmt;

/// Errors from LLM backend operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    /// Provider is unavailable.
    ProviderUnavailable { provider: String, reason: String },
    /// Request failed.
    RequestFailed { reason: String },
    /// Response parsing failed.
    ResponseParseFailed { reason: String },
    /// Timeout waiting for response.
    Timeout,
    /// Invalid configuration.
    InvalidConfig { reason: String },
}

impl LlmError {
    /// Returns true if the backend could not be reached at all.
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::ProviderUnavailable { .. } | Self::Timeout)
    }
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProviderUnavailable { provider, reason } => {
                write!(f, "LLM provider '{provider}' unavailable: {reason}")
            }
            Self::RequestFailed { reason } => {
                write!(f, "LLM request failed: {reason}")
            }
            Self::ResponseParseFailed { reason } => {
                write!(f, "failed to parse LLM response: {reason}")
            }
            Self::Timeout => write!(f, "LLM request timed out"),
            Self::InvalidConfig { reason } => {
                write!(f, "invalid LLM configuration: {reason}")
            }
        }
    }
}

impl std::error::Error for LlmError {}

/// Errors from a participant's `respond` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParticipantError {
    /// The inference backend could not be reached.
    BackendUnavailable { model: String, reason: String },
    /// The backend answered, but with an error or an unusable result.
    BackendError { model: String, reason: String },
}

impl ParticipantError {
    /// Classifies a backend failure for the given model.
    #[must_use]
    pub fn from_llm(model: &str, error: &LlmError) -> Self {
        if error.is_unavailable() {
            Self::BackendUnavailable {
                model: model.to_string(),
                reason: error.to_string(),
            }
        } else {
            Self::BackendError {
                model: model.to_string(),
                reason: error.to_string(),
            }
        }
    }

    /// Returns the model the failing call was addressed to.
    #[must_use]
    pub fn model(&self) -> &str {
        match self {
            Self::BackendUnavailable { model, .. } | Self::BackendError { model, .. } => model,
        }
    }
}

impl fmt::Display for ParticipantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BackendUnavailable { model, reason } => {
                write!(f, "backend for '{model}' unavailable: {reason}")
            }
            Self::BackendError { model, reason } => {
                write!(f, "backend for '{model}' returned an error: {reason}")
            }
        }
    }
}

impl std::error::Error for ParticipantError {}
