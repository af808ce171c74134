//! Tavily web search client.
//!
//! Calls the Tavily search API with `include_answer` so the response
//! carries a synthesized answer alongside the raw results. A response
//! without an answer is reported as "no usable answer" (`Ok(None)`), not
//! an error — the search gate degrades gracefully either way.
//!
//! API reference: https://docs.tavily.com/reference/search

use async_trait::async_trait;
use parley_core::error::SearchError;
use parley_core::search::{SearchAnswer, SearchClient, SearchReference};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Queries shorter than this (after trimming) are rejected outright.
const MIN_QUERY_LEN: usize = 2;

/// A Tavily-backed web search client.
pub struct TavilyClient {
    api_key: String,
    base_url: String,
    max_results: usize,
    client: reqwest::Client,
}

impl TavilyClient {
    /// Create a new Tavily client.
    pub fn new(api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            api_key: api_key.into(),
            base_url: "https://api.tavily.com".into(),
            max_results: 5,
            client,
        }
    }

    /// Override the API base URL (for tests or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Override the number of results requested per search.
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }
}

#[async_trait]
impl SearchClient for TavilyClient {
    fn name(&self) -> &str {
        "tavily"
    }

    async fn search(
        &self,
        query: &str,
    ) -> std::result::Result<Option<SearchAnswer>, SearchError> {
        let query = query.trim();
        if query.len() < MIN_QUERY_LEN {
            return Err(SearchError::InvalidQuery(
                "query must be at least 2 characters".into(),
            ));
        }
        if self.api_key.is_empty() {
            return Err(SearchError::NotConfigured(
                "missing Tavily API key".into(),
            ));
        }

        let url = format!("{}/search", self.base_url);
        let body = TavilyRequest {
            query: query.to_string(),
            max_results: self.max_results,
            include_answer: true,
        };

        debug!(query = %query, "Sending web search request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| SearchError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Search API returned error");
            return Err(SearchError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let api_response: TavilyResponse =
            response.json().await.map_err(|e| SearchError::ApiError {
                status_code: 200,
                message: format!("Failed to parse search response: {e}"),
            })?;

        Ok(api_response.into_answer())
    }
}

// --- Tavily API types (internal) ---

#[derive(Debug, Serialize)]
struct TavilyRequest {
    query: String,
    max_results: usize,
    include_answer: bool,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    content: Option<String>,
}

impl TavilyResponse {
    /// Map the API response to the domain type. No answer → no result.
    fn into_answer(self) -> Option<SearchAnswer> {
        let answer = self.answer.filter(|a| !a.trim().is_empty())?;

        let references = self
            .results
            .into_iter()
            .map(|r| SearchReference {
                title: r.title.unwrap_or_else(|| "No title".into()),
                url: r.url.unwrap_or_default(),
                snippet: r.content.unwrap_or_default(),
            })
            .collect();

        Some(SearchAnswer { answer, references })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn short_query_rejected() {
        let client = TavilyClient::new("tvly-test");
        let err = client.search(" a ").await.unwrap_err();
        assert!(matches!(err, SearchError::InvalidQuery(_)));
    }

    #[tokio::test]
    async fn missing_api_key_rejected() {
        let client = TavilyClient::new("");
        let err = client.search("weather in Lisbon").await.unwrap_err();
        assert!(matches!(err, SearchError::NotConfigured(_)));
    }

    #[test]
    fn response_without_answer_is_no_result() {
        let data = r#"{"results": [{"title": "A page", "url": "https://a.example", "content": "text"}]}"#;
        let parsed: TavilyResponse = serde_json::from_str(data).unwrap();
        assert!(parsed.into_answer().is_none());
    }

    #[test]
    fn response_maps_to_domain_types() {
        let data = r#"{
            "answer": "It is sunny in Lisbon.",
            "results": [
                {"title": "Weather.com", "url": "https://weather.com/lisbon", "content": "Lisbon forecast"},
                {"url": "https://no-title.example", "content": "untitled"}
            ]
        }"#;
        let parsed: TavilyResponse = serde_json::from_str(data).unwrap();
        let answer = parsed.into_answer().unwrap();
        assert_eq!(answer.answer, "It is sunny in Lisbon.");
        assert_eq!(answer.references.len(), 2);
        assert_eq!(answer.references[0].title, "Weather.com");
        assert_eq!(answer.references[1].title, "No title");
        assert_eq!(answer.references[1].snippet, "untitled");
    }

    #[test]
    fn request_serialization() {
        let req = TavilyRequest {
            query: "weather in Lisbon".into(),
            max_results: 5,
            include_answer: true,
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("max_results"));
        assert!(json.contains("include_answer"));
    }
}
