//! The turn pipeline runner.
//!
//! Wires the stages together for one request:
//! find conversation → classify relevance → gate search → assemble context
//! → compose prompt → complete → validate → append both turns atomically.

use parley_core::error::Error;
use parley_core::message::{ConversationId, Turn};
use parley_core::provider::CompletionRequest;
use parley_core::{ChatStore, CompletionClient, SearchClient, TextClassifier};
use std::sync::Arc;
use tracing::{debug, info};

use crate::compose::{ComposeInput, ModeFlags, PromptComposer};
use crate::context::ContextAssembler;
use crate::relevance::RelevanceClassifier;
use crate::search_gate::SearchGate;
use crate::validate::ResponseValidator;

/// One logical chat request.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// The resolved principal
    pub owner_id: String,
    /// Which conversation to continue
    pub conversation_id: ConversationId,
    /// The current user message
    pub text: String,
    /// Names of files uploaded with this turn
    pub file_names: Vec<String>,
    /// Extracted document text (may be empty)
    pub document_data: String,
    /// Per-request mode flags
    pub flags: ModeFlags,
}

/// The successful result of one pipeline run.
#[derive(Debug, Clone)]
pub struct ChatOutcome {
    /// The validated, persisted assistant turn
    pub assistant_turn: Turn,
    /// Whether extended conversational memory was injected
    pub used_history: bool,
    /// Which model actually answered
    pub model_used: String,
}

/// The turn pipeline. Capabilities are injected so tests can substitute
/// deterministic fakes for every external collaborator.
pub struct ChatPipeline {
    completion: Arc<dyn CompletionClient>,
    store: Arc<dyn ChatStore>,
    relevance: RelevanceClassifier,
    search_gate: SearchGate,
    assembler: ContextAssembler,
    composer: PromptComposer,
    validator: ResponseValidator,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl ChatPipeline {
    /// Create a pipeline over the four capabilities.
    pub fn new(
        completion: Arc<dyn CompletionClient>,
        classifier: Arc<dyn TextClassifier>,
        search: Arc<dyn SearchClient>,
        store: Arc<dyn ChatStore>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            completion,
            store,
            relevance: RelevanceClassifier::new(classifier.clone()),
            search_gate: SearchGate::new(classifier, search),
            assembler: ContextAssembler::new(),
            composer: PromptComposer::new(),
            validator: ResponseValidator::new(),
            model: model.into(),
            temperature: 0.7,
            max_tokens: None,
        }
    }

    /// Set the sampling temperature for the main completion call.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the max tokens for the main completion call.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Run one request through the pipeline.
    ///
    /// Classifier and model failures abort the request. Search failures
    /// have already degraded to "no result" inside the gate. The user turn
    /// and the assistant turn are appended in a single atomic batch, so a
    /// failure anywhere above leaves the conversation untouched.
    pub async fn run(&self, request: ChatRequest) -> parley_core::Result<ChatOutcome> {
        let text = request.text.trim();
        if text.is_empty() {
            return Err(Error::EmptyPrompt);
        }

        let conversation = self
            .store
            .find(&request.owner_id, &request.conversation_id)
            .await?
            .ok_or_else(|| Error::ConversationNotFound(request.conversation_id.to_string()))?;

        info!(
            conversation_id = %conversation.id,
            turns = conversation.turns.len(),
            search_requested = request.flags.search_requested,
            deep = request.flags.deep_reasoning_requested,
            "Processing chat turn"
        );

        let user_turn = Turn::user(text)
            .with_files(request.file_names.clone())
            .with_document(request.document_data.clone());

        let needs_history = self.relevance.needs_history(text).await?;

        let search_answer = self
            .search_gate
            .maybe_search(text, request.flags.search_requested)
            .await;

        let context_text = self.assembler.assemble(&conversation.turns, needs_history);

        let prompt = self.composer.compose(&ComposeInput {
            context_text: &context_text,
            needs_history,
            document_data: &request.document_data,
            search: search_answer.as_ref(),
            deep_reasoning: request.flags.deep_reasoning_requested,
            current_text: text,
        });

        debug!(
            prompt_chars = prompt.len(),
            needs_history,
            has_search = search_answer.is_some(),
            "Prompt composed"
        );

        let response = self
            .completion
            .complete(CompletionRequest {
                model: self.model.clone(),
                prompt,
                temperature: self.temperature,
                max_tokens: self.max_tokens,
            })
            .await?;

        let model_used = response.model.clone();
        let assistant_turn = self.validator.validate(response.content);

        self.store
            .append(
                &conversation.id,
                vec![user_turn, assistant_turn.clone()],
            )
            .await?;

        Ok(ChatOutcome {
            assistant_turn,
            used_history: needs_history,
            model_used,
        })
    }
}
