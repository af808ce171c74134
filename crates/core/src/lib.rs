//! # Parley Core
//!
//! Domain types, capability traits, and error definitions for the Parley
//! chat orchestration layer. This crate has **zero framework dependencies**
//! — it defines the domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator (completion provider, classifier, web
//! search, conversation store) is defined as a trait here. Implementations
//! live in their respective crates. This enables:
//! - Swapping implementations via configuration
//! - Deterministic fakes in tests (the two classification gates are
//!   probabilistic in production, so every pipeline test substitutes one)
//! - Clean dependency graph (all crates depend inward on core)

pub mod classify;
pub mod error;
pub mod message;
pub mod provider;
pub mod search;
pub mod store;

// Re-export key types at crate root for ergonomics
pub use classify::TextClassifier;
pub use error::{Error, Result};
pub use message::{Conversation, ConversationId, Turn, TurnRole};
pub use provider::{CompletionClient, CompletionRequest, CompletionResponse, Usage};
pub use search::{SearchAnswer, SearchClient, SearchReference};
pub use store::ChatStore;
