//! A deterministic backend for tests and offline runs.

use crate::backend::{LlmBackend, LlmProvider, LlmRequest, LlmResponse, TokenUsage};
use crate::error::LlmError;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

/// What to do once the queued steps run out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fallback {
    /// Answer `"<model> says: <prompt>"`.
    Echo,
    /// Fail with `RequestFailed`.
    Exhausted,
}

#[derive(Debug, Default)]
struct ScriptState {
    steps: VecDeque<Result<String, LlmError>>,
    prompts: Vec<String>,
}

/// A backend that plays back queued replies and records every prompt.
#[derive(Debug)]
pub struct ScriptedBackend {
    model: String,
    fallback: Fallback,
    state: Mutex<ScriptState>,
}

impl ScriptedBackend {
    fn with_fallback(model: impl Into<String>, fallback: Fallback) -> Self {
        Self {
            model: model.into(),
            fallback,
            state: Mutex::new(ScriptState::default()),
        }
    }

    /// A backend that echoes every prompt back, prefixed by the model name.
    #[must_use]
    pub fn echo(model: impl Into<String>) -> Self {
        Self::with_fallback(model, Fallback::Echo)
    }

    /// A backend that answers with `replies` in order, then fails.
    #[must_use]
    pub fn replies<I, S>(model: impl Into<String>, replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        replies
            .into_iter()
            .fold(Self::with_fallback(model, Fallback::Exhausted), |b, r| {
                b.then_reply(r)
            })
    }

    /// A backend whose first call fails with `error`.
    #[must_use]
    pub fn failing(model: impl Into<String>, error: LlmError) -> Self {
        Self::with_fallback(model, Fallback::Exhausted).then_fail(error)
    }

    /// Queues a successful reply.
    #[must_use]
    pub fn then_reply(self, reply: impl Into<String>) -> Self {
        self.push(Ok(reply.into()));
        self
    }

    /// Queues a failure.
    #[must_use]
    pub fn then_fail(self, error: LlmError) -> Self {
        self.push(Err(error));
        self
    }

    fn push(&self, step: Result<String, LlmError>) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .steps
            .push_back(step);
    }

    /// Every prompt received so far, in call order.
    #[must_use]
    pub fn prompts(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .prompts
            .clone()
    }

    /// Number of calls received so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .prompts
            .len()
    }
}

#[async_trait]
impl LlmBackend for ScriptedBackend {
    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let step = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.prompts.push(request.prompt.clone());
            state.steps.pop_front()
        };

        let content = match (step, self.fallback) {
            (Some(step), _) => step?,
            (None, Fallback::Echo) => format!("{} says: {}", self.model, request.prompt),
            (None, Fallback::Exhausted) => {
                return Err(LlmError::RequestFailed {
                    reason: format!("script for '{}' exhausted", self.model),
                });
            }
        };

        Ok(LlmResponse {
            content,
            usage: TokenUsage::default(),
            model: self.model.clone(),
        })
    }

    fn provider(&self) -> LlmProvider {
        LlmProvider::Scripted
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn echo_prefixes_model() {
        let backend = ScriptedBackend::echo("smollm:360m");
        let response = backend.generate(&LlmRequest::new("hi")).await.unwrap();
        assert_eq!(response.content, "smollm:360m says: hi");
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn replies_then_exhausted() {
        let backend = ScriptedBackend::replies("m", ["one"]);
        assert_eq!(
            backend.generate(&LlmRequest::new("a")).await.unwrap().content,
            "one"
        );
        let err = backend.generate(&LlmRequest::new("b")).await.unwrap_err();
        assert!(err.to_string().contains("exhausted"));
        assert_eq!(backend.prompts(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn queued_failure_then_echo() {
        let backend = ScriptedBackend::echo("m").then_fail(LlmError::Timeout);
        assert_eq!(
            backend.generate(&LlmRequest::new("a")).await.unwrap_err(),
            LlmError::Timeout
        );
        assert!(backend.generate(&LlmRequest::new("b")).await.is_ok());
    }
}
