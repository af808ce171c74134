//! CompletionClient trait — the abstraction over LLM backends.
//!
//! A CompletionClient knows how to send one composed prompt to an LLM and
//! get a single completion back. Multi-step tool loops and streaming are
//! deliberately out of scope: the pipeline composes exactly one instruction
//! block per turn and consumes exactly one response.
//!
//! Implementations: OpenAI-compatible endpoints (Groq, OpenRouter, OpenAI,
//! Ollama, custom).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::ProviderError;

/// Parameters for a single-turn completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// The model to use (e.g., "openai/gpt-oss-20b")
    pub model: String,

    /// The composed prompt, sent as a single user message
    pub prompt: String,

    /// Temperature (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

fn default_temperature() -> f32 {
    0.7
}

impl CompletionRequest {
    /// Create a request with default sampling parameters.
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            temperature: default_temperature(),
            max_tokens: None,
        }
    }
}

/// A completion from a provider.
///
/// `content` is `None` when the provider returned something other than
/// text (the validator substitutes an apology in that case).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// The generated text, if the provider produced any
    pub content: Option<String>,

    /// Which model actually responded (may differ from requested)
    pub model: String,

    /// Token usage statistics
    pub usage: Option<Usage>,
}

/// Token usage information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// The core CompletionClient trait.
///
/// Every LLM backend implements this trait. The pipeline calls `complete()`
/// without knowing which provider is being used.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// A human-readable name for this client (e.g., "groq", "openrouter").
    fn name(&self) -> &str;

    /// Send a composed prompt and get a single completion.
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> std::result::Result<CompletionResponse, ProviderError>;

    /// List available models for this provider.
    async fn list_models(&self) -> std::result::Result<Vec<String>, ProviderError> {
        Ok(Vec::new())
    }

    /// Health check — can we reach the provider?
    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_request_defaults() {
        let req = CompletionRequest::new("openai/gpt-oss-20b", "Hello");
        assert!((req.temperature - 0.7).abs() < f32::EPSILON);
        assert!(req.max_tokens.is_none());
        assert_eq!(req.prompt, "Hello");
    }

    #[test]
    fn completion_response_serialization() {
        let resp = CompletionResponse {
            content: Some("Hi!".into()),
            model: "openai/gpt-oss-20b".into(),
            usage: Some(Usage {
                prompt_tokens: 12,
                completion_tokens: 3,
                total_tokens: 15,
            }),
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("gpt-oss-20b"));
        let parsed: CompletionResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.content.as_deref(), Some("Hi!"));
        assert_eq!(parsed.usage.unwrap().total_tokens, 15);
    }
}
