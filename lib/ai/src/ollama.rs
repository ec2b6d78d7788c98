//! Ollama chat backend.
//!
//! Talks to `POST {base_url}/api/chat` with streaming disabled, sending a
//! single user turn per request.

use crate::backend::{LlmBackend, LlmProvider, LlmRequest, LlmResponse, TokenUsage};
use crate::error::LlmError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Default Ollama endpoint.
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Default per-request timeout in seconds. Small local models on CPU are slow.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Connection settings for an Ollama daemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Base URL of the daemon.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl OllamaConfig {
    /// Returns the chat endpoint URL.
    #[must_use]
    pub fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatTurn<'a>; 1],
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatTurn<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    model: String,
    message: ChatMessage,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

/// An `LlmBackend` bound to one Ollama model.
#[derive(Debug, Clone)]
pub struct OllamaBackend {
    client: reqwest::Client,
    config: OllamaConfig,
    model: String,
}

impl OllamaBackend {
    /// Creates a backend for `model` using the given connection settings.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::InvalidConfig` if the HTTP client cannot be built.
    pub fn new(config: OllamaConfig, model: impl Into<String>) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::InvalidConfig {
                reason: e.to_string(),
            })?;

        Ok(Self::with_client(client, config, model))
    }

    /// Creates a backend sharing an existing HTTP client.
    #[must_use]
    pub fn with_client(
        client: reqwest::Client,
        config: OllamaConfig,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            config,
            model: model.into(),
        }
    }

    fn chat_request<'a>(&'a self, request: &'a LlmRequest) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: [ChatTurn {
                role: "user",
                content: &request.prompt,
            }],
            stream: false,
        }
    }

    fn classify_transport_error(&self, error: &reqwest::Error) -> LlmError {
        if error.is_timeout() {
            LlmError::Timeout
        } else if error.is_connect() {
            LlmError::ProviderUnavailable {
                provider: LlmProvider::Ollama.to_string(),
                reason: format!("{}: {error}", self.config.base_url),
            }
        } else {
            LlmError::RequestFailed {
                reason: error.to_string(),
            }
        }
    }
}

fn into_response(body: ChatResponse) -> LlmResponse {
    LlmResponse {
        content: body.message.content,
        usage: TokenUsage {
            input_tokens: body.prompt_eval_count.unwrap_or_default(),
            output_tokens: body.eval_count.unwrap_or_default(),
        },
        model: body.model,
    }
}

#[async_trait]
impl LlmBackend for OllamaBackend {
    #[instrument(skip(self, request), fields(model = %self.model, prompt_len = request.prompt.len()))]
    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let url = self.config.chat_url();
        let response = self
            .client
            .post(&url)
            .json(&self.chat_request(request))
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, endpoint = %url, "Ollama request failed");
                self.classify_transport_error(&e)
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Ollama returned error status");
            return Err(LlmError::RequestFailed {
                reason: format!("HTTP {status}: {body}"),
            });
        }

        let body: ChatResponse =
            response
                .json()
                .await
                .map_err(|e| LlmError::ResponseParseFailed {
                    reason: e.to_string(),
                })?;

        let response = into_response(body);
        debug!(
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "Ollama chat completed"
        );
        Ok(response)
    }

    fn provider(&self) -> LlmProvider {
        LlmProvider::Ollama
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = OllamaConfig::default();
        assert_eq!(config.base_url, "http://localhost:11434");
        assert_eq!(config.timeout_secs, 120);
        assert_eq!(config.chat_url(), "http://localhost:11434/api/chat");
    }

    #[test]
    fn chat_url_trims_trailing_slash() {
        let config = OllamaConfig {
            base_url: "http://gpu-box:11434/".to_string(),
            ..OllamaConfig::default()
        };
        assert_eq!(config.chat_url(), "http://gpu-box:11434/api/chat");
    }

    #[test]
    fn chat_request_body_shape() {
        let backend = OllamaBackend::new(OllamaConfig::default(), "qwen3:0.6b").expect("client");
        let request = LlmRequest::new("How to make tomato soup?");
        let body = serde_json::to_value(backend.chat_request(&request)).expect("serialize");

        assert_eq!(
            body,
            serde_json::json!({
                "model": "qwen3:0.6b",
                "messages": [{"role": "user", "content": "How to make tomato soup?"}],
                "stream": false
            })
        );
    }

    #[test]
    fn chat_response_parses() {
        let body: ChatResponse = serde_json::from_str(
            r#"{
                "model": "smollm:360m",
                "created_at": "2025-01-01T00:00:00Z",
                "message": {"role": "assistant", "content": "Rayleigh scattering."},
                "done": true,
                "prompt_eval_count": 12,
                "eval_count": 4
            }"#,
        )
        .expect("parse");

        let response = into_response(body);
        assert_eq!(response.content, "Rayleigh scattering.");
        assert_eq!(response.model, "smollm:360m");
        assert_eq!(response.usage.total(), 16);
    }

    #[test]
    fn chat_response_without_counts() {
        let body: ChatResponse = serde_json::from_str(
            r#"{"model": "m", "message": {"role": "assistant", "content": "ok"}}"#,
        )
        .expect("parse");
        assert_eq!(into_response(body).usage, TokenUsage::default());
    }

    #[tokio::test]
    async fn unreachable_daemon_is_provider_unavailable() {
        let config = OllamaConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            timeout_secs: 5,
        };
        let backend = OllamaBackend::new(config, "qwen3:0.6b").expect("client");

        let err = backend
            .generate(&LlmRequest::new("hello"))
            .await
            .expect_err("nothing listens on port 1");
        assert!(err.is_unavailable(), "unexpected error: {err}");
    }
}
