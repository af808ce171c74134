//! Relevance classification — does this turn need prior history?
//!
//! A single YES/NO classification request decides whether the context
//! assembler runs in extended or minimal mode. The verdict is probabilistic
//! (an LLM answers it in production), so it is deliberately forgiving to
//! read: anything that is not an explicit YES counts as NO.

use parley_core::error::ProviderError;
use parley_core::TextClassifier;
use std::sync::Arc;
use tracing::debug;

/// Decides whether the current turn requires prior conversational context.
pub struct RelevanceClassifier {
    classifier: Arc<dyn TextClassifier>,
}

impl RelevanceClassifier {
    pub fn new(classifier: Arc<dyn TextClassifier>) -> Self {
        Self { classifier }
    }

    /// Classify the current turn. Failures propagate — without a verdict
    /// the pipeline cannot pick a context shape.
    pub async fn needs_history(&self, current_text: &str) -> Result<bool, ProviderError> {
        let prompt = Self::build_prompt(current_text);
        let reply = self.classifier.answer(&prompt).await?;
        let verdict = Self::verdict(&reply);
        debug!(verdict, reply = %reply.trim(), "Relevance classification");
        Ok(verdict)
    }

    /// Presence of "YES" in the normalized reply; anything else is NO.
    pub fn verdict(reply: &str) -> bool {
        reply.trim().to_uppercase().contains("YES")
    }

    fn build_prompt(current_text: &str) -> String {
        format!(
            "You decide whether a chat message depends on earlier turns of the conversation.\n\
             Answer with exactly one word: YES or NO.\n\n\
             Answer YES when the message:\n\
             - explicitly references earlier turns or content (\"the previous answer\", \"that document\", \"as you said\")\n\
             - relies on pronouns whose referents live in earlier turns (\"why does it do that?\")\n\
             - asks to elaborate on, continue, or summarize something already discussed\n\n\
             Answer NO when the message:\n\
             - is an acknowledgment or greeting (\"thanks\", \"hello\")\n\
             - is a self-contained question that stands entirely on its own\n\n\
             Message: {current_text}"
        )
    }
}
