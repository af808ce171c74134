//! The Parley turn pipeline — the heart of the orchestration layer.
//!
//! One request flows through six stages, strictly in order (each stage
//! depends on the previous stage's decision):
//!
//! 1. **Relevance classification** — does this turn need prior history?
//! 2. **Search gate** — if the user opted in, is a web search warranted?
//! 3. **Context assembly** — extended or minimal conversational memory
//! 4. **Prompt composition** — one instruction block via a fixed branch table
//! 5. **Completion + validation** — a well-formed assistant turn, always
//! 6. **Persistence** — user turn and assistant turn appended together
//!
//! Classifier and model failures abort the request; search failures degrade
//! to "no search". There is no automatic retry.

pub mod compose;
pub mod context;
pub mod relevance;
pub mod runner;
pub mod search_gate;
pub mod validate;

pub use compose::{ComposeInput, ModeFlags, PromptComposer};
pub use context::ContextAssembler;
pub use relevance::RelevanceClassifier;
pub use runner::{ChatOutcome, ChatPipeline, ChatRequest};
pub use search_gate::SearchGate;
pub use validate::ResponseValidator;
