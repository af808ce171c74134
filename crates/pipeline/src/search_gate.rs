//! The web-search gate.
//!
//! The user opts in per request; opting in does not force a search. A
//! second lightweight YES/NO classification decides whether this message
//! actually warrants one before a search call is spent. Every failure on
//! this path — classification or search — degrades to "no result": a lost
//! search must never fail the whole turn.

use parley_core::error::ProviderError;
use parley_core::search::SearchAnswer;
use parley_core::{SearchClient, TextClassifier};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::relevance::RelevanceClassifier;

/// Gates and performs the optional web search for a turn.
pub struct SearchGate {
    classifier: Arc<dyn TextClassifier>,
    search: Arc<dyn SearchClient>,
}

impl SearchGate {
    pub fn new(classifier: Arc<dyn TextClassifier>, search: Arc<dyn SearchClient>) -> Self {
        Self { classifier, search }
    }

    /// Maybe search the web for the current turn.
    ///
    /// Returns `None` without invoking any capability when the user did
    /// not opt in.
    pub async fn maybe_search(
        &self,
        current_text: &str,
        search_requested: bool,
    ) -> Option<SearchAnswer> {
        if !search_requested {
            return None;
        }

        match self.should_search(current_text).await {
            Ok(false) => {
                debug!("Search requested but not warranted for this message");
                return None;
            }
            Ok(true) => {}
            Err(e) => {
                warn!(error = %e, "Search-necessity classification failed, skipping search");
                return None;
            }
        }

        match self.search.search(current_text).await {
            Ok(answer) => {
                if answer.is_none() {
                    debug!("Web search returned no usable answer");
                }
                answer
            }
            Err(e) => {
                warn!(error = %e, "Web search failed, continuing without results");
                None
            }
        }
    }

    async fn should_search(&self, current_text: &str) -> Result<bool, ProviderError> {
        let prompt = Self::build_prompt(current_text);
        let reply = self.classifier.answer(&prompt).await?;
        Ok(RelevanceClassifier::verdict(&reply))
    }

    fn build_prompt(current_text: &str) -> String {
        format!(
            "You decide whether answering a chat message requires searching the web for\n\
             current or external information (news, weather, prices, live facts).\n\
             Answer with exactly one word: YES or NO.\n\n\
             Answer NO for greetings, opinions, creative writing, and questions answerable\n\
             from general knowledge.\n\n\
             Message: {current_text}"
        )
    }
}
