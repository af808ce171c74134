//! In-memory store — useful for testing and ephemeral sessions.

use async_trait::async_trait;
use parley_core::error::StoreError;
use parley_core::message::{Conversation, ConversationId, Turn};
use parley_core::store::ChatStore;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// An in-memory store keyed by conversation ID.
///
/// The whole `append` batch is applied under a single write lock, which
/// gives the same atomic-append guarantee the SQLite backend provides
/// with a transaction.
pub struct InMemoryStore {
    conversations: Arc<RwLock<HashMap<String, Conversation>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            conversations: Arc::new(RwLock::new(HashMap::new())),
        }
    }

}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatStore for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn create(&self, owner_id: &str, name: &str) -> Result<Conversation, StoreError> {
        let mut conversation = Conversation::new(owner_id);
        if !name.is_empty() {
            conversation.name = name.to_string();
        }
        self.conversations
            .write()
            .await
            .insert(conversation.id.to_string(), conversation.clone());
        Ok(conversation)
    }

    async fn find(
        &self,
        owner_id: &str,
        id: &ConversationId,
    ) -> Result<Option<Conversation>, StoreError> {
        let conversations = self.conversations.read().await;
        Ok(conversations
            .get(&id.to_string())
            .filter(|c| c.owner_id == owner_id)
            .cloned())
    }

    async fn list(&self, owner_id: &str) -> Result<Vec<Conversation>, StoreError> {
        let conversations = self.conversations.read().await;
        let mut owned: Vec<Conversation> = conversations
            .values()
            .filter(|c| c.owner_id == owner_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(owned)
    }

    async fn append(&self, id: &ConversationId, turns: Vec<Turn>) -> Result<(), StoreError> {
        let mut conversations = self.conversations.write().await;
        let conversation = conversations
            .get_mut(&id.to_string())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        for turn in turns {
            conversation.push(turn);
        }
        Ok(())
    }

    async fn rename(
        &self,
        owner_id: &str,
        id: &ConversationId,
        name: &str,
    ) -> Result<bool, StoreError> {
        let mut conversations = self.conversations.write().await;
        match conversations
            .get_mut(&id.to_string())
            .filter(|c| c.owner_id == owner_id)
        {
            Some(conversation) => {
                conversation.name = name.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, owner_id: &str, id: &ConversationId) -> Result<bool, StoreError> {
        let mut conversations = self.conversations.write().await;
        let owned = conversations
            .get(&id.to_string())
            .is_some_and(|c| c.owner_id == owner_id);
        if owned {
            conversations.remove(&id.to_string());
        }
        Ok(owned)
    }
}
