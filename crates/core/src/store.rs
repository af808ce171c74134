//! ChatStore trait — persisted conversation storage.
//!
//! The core only creates, finds, appends to, and renames conversations; it
//! never edits or deletes individual turns. `append` is the load-bearing
//! operation: it must be atomic and ordered, so that the user turn and the
//! assistant turn it produced become visible together or not at all, and
//! concurrent appends to the same conversation never interleave a batch.
//!
//! Implementations: SQLite (production), in-memory (tests, ephemeral).

use async_trait::async_trait;
use crate::error::StoreError;
use crate::message::{Conversation, ConversationId, Turn};

/// The conversation store capability.
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// The backend name (e.g., "sqlite", "in_memory").
    fn name(&self) -> &str;

    /// Create a new conversation for the given owner.
    async fn create(
        &self,
        owner_id: &str,
        name: &str,
    ) -> std::result::Result<Conversation, StoreError>;

    /// Find a conversation by (owner, id). `Ok(None)` when absent or owned
    /// by someone else.
    async fn find(
        &self,
        owner_id: &str,
        id: &ConversationId,
    ) -> std::result::Result<Option<Conversation>, StoreError>;

    /// List an owner's conversations, most recently updated first.
    async fn list(&self, owner_id: &str) -> std::result::Result<Vec<Conversation>, StoreError>;

    /// Atomically append a batch of turns in order.
    async fn append(
        &self,
        id: &ConversationId,
        turns: Vec<Turn>,
    ) -> std::result::Result<(), StoreError>;

    /// Rename a conversation. Returns `false` when absent or not owned.
    async fn rename(
        &self,
        owner_id: &str,
        id: &ConversationId,
        name: &str,
    ) -> std::result::Result<bool, StoreError>;

    /// Delete a conversation. Returns `false` when absent or not owned.
    async fn delete(
        &self,
        owner_id: &str,
        id: &ConversationId,
    ) -> std::result::Result<bool, StoreError>;
}
