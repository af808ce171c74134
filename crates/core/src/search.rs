//! SearchClient trait — the web search capability.
//!
//! The pipeline consumes search as a request/response function: a query in,
//! a synthesized answer plus references out, or `None` when the provider
//! has no usable answer. Results are transient and never persisted.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::SearchError;

/// One cited source backing a search answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchReference {
    /// Page title
    pub title: String,
    /// Page URL
    pub url: String,
    /// Short content excerpt
    #[serde(default)]
    pub snippet: String,
}

/// A synthesized web search answer with its sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchAnswer {
    /// The synthesized answer text
    pub answer: String,
    /// Ordered references backing the answer
    pub references: Vec<SearchReference>,
}

/// The web search capability.
#[async_trait]
pub trait SearchClient: Send + Sync {
    /// A human-readable name for this client (e.g., "tavily").
    fn name(&self) -> &str;

    /// Search the web. `Ok(None)` signals "no usable answer".
    async fn search(
        &self,
        query: &str,
    ) -> std::result::Result<Option<SearchAnswer>, SearchError>;
}
