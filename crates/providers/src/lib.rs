//! Capability client implementations for Parley.
//!
//! - [`OpenAiCompatClient`] — single-turn completions against any
//!   OpenAI-compatible endpoint (Groq, OpenRouter, OpenAI, Ollama, custom)
//! - [`CompletionClassifier`] — binds the [`TextClassifier`] capability to a
//!   completion client with deterministic sampling
//! - [`TavilyClient`] — web search via the Tavily API
//!
//! [`TextClassifier`]: parley_core::TextClassifier

pub mod classifier;
pub mod openai_compat;
pub mod tavily;

pub use classifier::CompletionClassifier;
pub use openai_compat::OpenAiCompatClient;
pub use tavily::TavilyClient;

use parley_core::{CompletionClient, SearchClient, TextClassifier};
use std::sync::Arc;

/// The three capability clients the pipeline consumes, built from config.
pub struct Capabilities {
    pub completion: Arc<dyn CompletionClient>,
    pub classifier: Arc<dyn TextClassifier>,
    pub search: Arc<dyn SearchClient>,
}

/// Build capability clients from configuration.
pub fn build_from_config(config: &parley_config::AppConfig) -> Capabilities {
    let api_key = config.api_key.clone().unwrap_or_default();
    let base_url = default_base_url(&config.default_provider);

    let completion: Arc<dyn CompletionClient> = Arc::new(OpenAiCompatClient::new(
        &config.default_provider,
        &base_url,
        &api_key,
    ));

    let classifier: Arc<dyn TextClassifier> = Arc::new(CompletionClassifier::new(
        completion.clone(),
        config.classifier_model(),
    ));

    let search: Arc<dyn SearchClient> = Arc::new(
        TavilyClient::new(config.search.api_key.clone().unwrap_or_default())
            .with_base_url(&config.search.base_url)
            .with_max_results(config.search.max_results),
    );

    Capabilities {
        completion,
        classifier,
        search,
    }
}

/// Get the default base URL for well-known providers.
pub fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "groq" => "https://api.groq.com/openai/v1".into(),
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "openai" => "https://api.openai.com/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "deepseek" => "https://api.deepseek.com/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        "fireworks" => "https://api.fireworks.ai/inference/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        _ => format!("https://{provider_name}.api.example.com/v1"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groq_is_the_default_base_url() {
        let config = parley_config::AppConfig::default();
        assert_eq!(config.default_provider, "groq");
        assert!(default_base_url(&config.default_provider).contains("api.groq.com"));
    }

    #[test]
    fn capabilities_build_from_default_config() {
        let config = parley_config::AppConfig::default();
        let caps = build_from_config(&config);
        assert_eq!(caps.completion.name(), "groq");
        assert_eq!(caps.search.name(), "tavily");
    }
}
