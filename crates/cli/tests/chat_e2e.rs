//! End-to-end pipeline scenarios with deterministic capability fakes.
//!
//! These exercise the full turn flow — classification, search gating,
//! context assembly, prompt composition, completion, validation, and
//! persistence — with every external collaborator substituted.

use async_trait::async_trait;
use parley_core::error::{ProviderError, SearchError};
use parley_core::message::{Turn, TurnRole};
use parley_core::provider::{CompletionClient, CompletionRequest, CompletionResponse};
use parley_core::search::{SearchAnswer, SearchClient, SearchReference};
use parley_core::{ChatStore, TextClassifier};
use parley_pipeline::{ChatPipeline, ChatRequest, ModeFlags};
use parley_store::InMemoryStore;
use std::sync::{Arc, Mutex};

/// Routes YES/NO by inspecting which gate is asking.
struct RoutingClassifier {
    history_verdict: &'static str,
    search_verdict: &'static str,
}

#[async_trait]
impl TextClassifier for RoutingClassifier {
    async fn answer(&self, prompt: &str) -> Result<String, ProviderError> {
        if prompt.contains("searching the web") {
            Ok(self.search_verdict.to_string())
        } else {
            Ok(self.history_verdict.to_string())
        }
    }
}

/// Captures the composed prompt and returns a canned completion.
struct CapturingCompletion {
    reply: &'static str,
    prompts: Mutex<Vec<String>>,
}

impl CapturingCompletion {
    fn new(reply: &'static str) -> Arc<Self> {
        Arc::new(Self {
            reply,
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn last_prompt(&self) -> String {
        self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl CompletionClient for CapturingCompletion {
    fn name(&self) -> &str {
        "capturing"
    }

    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        self.prompts.lock().unwrap().push(request.prompt);
        Ok(CompletionResponse {
            content: Some(self.reply.to_string()),
            model: request.model,
            usage: None,
        })
    }
}

struct StubSearch(Option<SearchAnswer>);

#[async_trait]
impl SearchClient for StubSearch {
    fn name(&self) -> &str {
        "stub"
    }

    async fn search(&self, _query: &str) -> Result<Option<SearchAnswer>, SearchError> {
        Ok(self.0.clone())
    }
}

fn request(conversation_id: &parley_core::ConversationId, text: &str, flags: ModeFlags) -> ChatRequest {
    ChatRequest {
        owner_id: "user_1".into(),
        conversation_id: conversation_id.clone(),
        text: text.into(),
        file_names: vec![],
        document_data: String::new(),
        flags,
    }
}

/// A follow-up about a prior exchange flows through the history-aware
/// template and persists a complete exchange.
#[tokio::test]
async fn elaboration_follow_up_uses_extended_history() {
    let store = Arc::new(InMemoryStore::new());
    let conv = store.create("user_1", "").await.unwrap();
    store
        .append(
            &conv.id,
            vec![
                Turn::user("What is quantum entanglement?"),
                Turn::assistant("Quantum entanglement correlates particle states across distance."),
            ],
        )
        .await
        .unwrap();

    let completion = CapturingCompletion::new("Elaborating: entangled particles share a state.");
    let pipeline = ChatPipeline::new(
        completion.clone(),
        Arc::new(RoutingClassifier {
            history_verdict: "YES",
            search_verdict: "NO",
        }),
        Arc::new(StubSearch(None)),
        store.clone(),
        "test-model",
    );

    let outcome = pipeline
        .run(request(&conv.id, "Can you elaborate on that?", ModeFlags::default()))
        .await
        .unwrap();

    // Verdict YES → extended context with the prior exchange inlined
    assert!(outcome.used_history);
    let prompt = completion.last_prompt();
    assert!(prompt.contains("=== CONVERSATION HISTORY ==="));
    assert!(prompt.contains("Exchange 1:\nUser: What is quantum entanglement?"));
    assert!(prompt.contains("Assistant: Quantum entanglement correlates particle states"));
    assert!(prompt.contains("referring to previous messages"));
    assert!(prompt.contains("Current User Message: Can you elaborate on that?"));

    // The validated turn is well-formed and persisted with its user turn
    assert_eq!(outcome.assistant_turn.role, TurnRole::Assistant);
    assert!(!outcome.assistant_turn.content.is_empty());

    let stored = store.find("user_1", &conv.id).await.unwrap().unwrap();
    assert_eq!(stored.turns.len(), 4);
    assert_eq!(stored.turns[2].content, "Can you elaborate on that?");
    assert_eq!(stored.turns[3].content, "Elaborating: entangled particles share a state.");
}

/// A search-opted weather question flows through the web-augmented
/// template with a 1-indexed sources list.
#[tokio::test]
async fn weather_question_uses_web_augmented_template() {
    let store = Arc::new(InMemoryStore::new());
    let conv = store.create("user_1", "").await.unwrap();

    let completion = CapturingCompletion::new("Sunny today.\n\nSources:\n[1]: [Weather.com](https://weather.com/lisbon)");
    let pipeline = ChatPipeline::new(
        completion.clone(),
        Arc::new(RoutingClassifier {
            history_verdict: "NO",
            search_verdict: "YES",
        }),
        Arc::new(StubSearch(Some(SearchAnswer {
            answer: "Sunny, 24°C in Lisbon.".into(),
            references: vec![SearchReference {
                title: "Weather.com".into(),
                url: "https://weather.com/lisbon".into(),
                snippet: "Lisbon forecast".into(),
            }],
        }))),
        store,
        "test-model",
    );

    let outcome = pipeline
        .run(request(
            &conv.id,
            "What's the weather in Lisbon?",
            ModeFlags {
                search_requested: true,
                deep_reasoning_requested: false,
            },
        ))
        .await
        .unwrap();

    assert!(!outcome.used_history);
    let prompt = completion.last_prompt();
    assert!(prompt.contains("Web Search Answer:\nSunny, 24°C in Lisbon."));
    assert!(prompt.contains("Sources to include:\n[1]: [Weather.com](https://weather.com/lisbon)"));
    assert!(prompt.contains("\"Sources:\" section"));
    assert_eq!(outcome.assistant_turn.role, TurnRole::Assistant);
}

/// Without opt-in, the same question never reaches the search client and
/// composes the standalone template.
#[tokio::test]
async fn search_is_strictly_opt_in() {
    let store = Arc::new(InMemoryStore::new());
    let conv = store.create("user_1", "").await.unwrap();

    let completion = CapturingCompletion::new("From general knowledge: mild.");
    let pipeline = ChatPipeline::new(
        completion.clone(),
        Arc::new(RoutingClassifier {
            history_verdict: "NO",
            search_verdict: "YES", // would search, but the user did not opt in
        }),
        Arc::new(StubSearch(Some(SearchAnswer {
            answer: "should never appear".into(),
            references: vec![],
        }))),
        store,
        "test-model",
    );

    pipeline
        .run(request(&conv.id, "What's the weather in Lisbon?", ModeFlags::default()))
        .await
        .unwrap();

    let prompt = completion.last_prompt();
    assert!(!prompt.contains("Web Search Answer"));
    assert!(!prompt.contains("should never appear"));
    assert!(prompt.contains("answer the user's question directly"));
    // Minimal context renders empty slots as null
    assert!(prompt.contains("LastMessage: null\nSecondLastMessage: null"));
}

/// Deep-reasoning requests append the report-format contract to the prompt.
#[tokio::test]
async fn deep_reasoning_adds_report_contract() {
    let store = Arc::new(InMemoryStore::new());
    let conv = store.create("user_1", "").await.unwrap();

    let completion = CapturingCompletion::new("# Report");
    let pipeline = ChatPipeline::new(
        completion.clone(),
        Arc::new(RoutingClassifier {
            history_verdict: "NO",
            search_verdict: "NO",
        }),
        Arc::new(StubSearch(None)),
        store,
        "test-model",
    );

    pipeline
        .run(request(
            &conv.id,
            "Compare solar and wind power",
            ModeFlags {
                search_requested: false,
                deep_reasoning_requested: true,
            },
        ))
        .await
        .unwrap();

    let prompt = completion.last_prompt();
    assert!(prompt.contains("Agent mode is enabled"));
    assert!(prompt.contains("Executive Summary"));
    assert!(prompt.contains("Recommendations"));
}
