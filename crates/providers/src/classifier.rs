//! CompletionClassifier — binds the TextClassifier capability to an LLM.
//!
//! Classification prompts are answered by a completion call pinned to
//! deterministic settings (temperature 0, a tiny output budget). The
//! verdict is still probabilistic across runs; callers treat anything that
//! is not an explicit YES as NO.

use async_trait::async_trait;
use parley_core::error::ProviderError;
use parley_core::provider::{CompletionClient, CompletionRequest};
use parley_core::TextClassifier;
use std::sync::Arc;
use tracing::debug;

/// Output budget for classification replies. YES/NO fits in one token;
/// the headroom absorbs models that add punctuation.
const CLASSIFY_MAX_TOKENS: u32 = 8;

/// A TextClassifier backed by a completion client.
pub struct CompletionClassifier {
    completion: Arc<dyn CompletionClient>,
    model: String,
}

impl CompletionClassifier {
    /// Create a classifier using the given client and model.
    pub fn new(completion: Arc<dyn CompletionClient>, model: impl Into<String>) -> Self {
        Self {
            completion,
            model: model.into(),
        }
    }
}

#[async_trait]
impl TextClassifier for CompletionClassifier {
    async fn answer(&self, prompt: &str) -> std::result::Result<String, ProviderError> {
        let request = CompletionRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            temperature: 0.0,
            max_tokens: Some(CLASSIFY_MAX_TOKENS),
        };

        let response = self.completion.complete(request).await?;
        let reply = response.content.unwrap_or_default();
        debug!(model = %self.model, reply = %reply, "Classification reply");
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::provider::CompletionResponse;
    use std::sync::Mutex;

    /// Records the request it receives and returns a canned reply.
    struct RecordingCompletion {
        reply: Option<String>,
        last_request: Mutex<Option<CompletionRequest>>,
    }

    #[async_trait]
    impl CompletionClient for RecordingCompletion {
        fn name(&self) -> &str {
            "recording"
        }

        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> std::result::Result<CompletionResponse, ProviderError> {
            *self.last_request.lock().unwrap() = Some(request.clone());
            Ok(CompletionResponse {
                content: self.reply.clone(),
                model: request.model,
                usage: None,
            })
        }
    }

    #[tokio::test]
    async fn uses_deterministic_sampling() {
        let inner = Arc::new(RecordingCompletion {
            reply: Some("YES".into()),
            last_request: Mutex::new(None),
        });
        let classifier = CompletionClassifier::new(inner.clone(), "test-model");

        let reply = classifier.answer("Is this a question?").await.unwrap();
        assert_eq!(reply, "YES");

        let request = inner.last_request.lock().unwrap().clone().unwrap();
        assert_eq!(request.temperature, 0.0);
        assert_eq!(request.max_tokens, Some(CLASSIFY_MAX_TOKENS));
        assert_eq!(request.model, "test-model");
    }

    #[tokio::test]
    async fn missing_content_maps_to_empty_reply() {
        let inner = Arc::new(RecordingCompletion {
            reply: None,
            last_request: Mutex::new(None),
        });
        let classifier = CompletionClassifier::new(inner, "test-model");

        let reply = classifier.answer("Anything").await.unwrap();
        assert!(reply.is_empty());
    }
}
