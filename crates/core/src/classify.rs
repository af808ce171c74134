//! TextClassifier trait — a short-text classification capability.
//!
//! Both binary gates in the pipeline (does this turn need prior history?
//! does it warrant a web search?) are phrased as YES/NO questions to this
//! capability. The production binding routes the prompt through an LLM with
//! deterministic sampling; tests substitute fixed-answer fakes.
//!
//! The verdict interpretation (normalize, look for "YES") lives with the
//! callers — this trait only moves text.

use async_trait::async_trait;
use crate::error::ProviderError;

/// A text-in / short-text-out decision capability.
#[async_trait]
pub trait TextClassifier: Send + Sync {
    /// Answer a classification prompt with a short reply.
    async fn answer(&self, prompt: &str) -> std::result::Result<String, ProviderError>;
}
