//! SQLite store backend.
//!
//! Uses a single SQLite database file with two tables:
//! - `conversations` — one row per conversation
//! - `turns` — append-only turn log, ordered by an autoincrement rowid
//!
//! `append` wraps the whole batch in one transaction, so the user turn and
//! the assistant turn it produced become visible together or not at all,
//! and concurrent appends to the same conversation cannot interleave a
//! batch.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parley_core::error::StoreError;
use parley_core::message::{Conversation, ConversationId, Turn, TurnRole};
use parley_core::store::ChatStore;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};

/// A production SQLite conversation store.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a new SQLite store from a file path.
    ///
    /// The database and all tables/indexes are created automatically.
    /// Pass `"sqlite::memory:"` for an in-process ephemeral database
    /// (useful for tests).
    pub async fn new(path: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| StoreError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .pragma("foreign_keys", "ON");

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("SQLite conversation store initialized at {path}");
        Ok(store)
    }

    /// Run schema migrations — creates tables and indexes.
    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS conversations (
                id          TEXT PRIMARY KEY,
                owner_id    TEXT NOT NULL,
                name        TEXT NOT NULL,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("conversations table: {e}")))?;

        // Integer rowid preserves append order within a conversation.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS turns (
                iid             INTEGER PRIMARY KEY AUTOINCREMENT,
                conversation_id TEXT NOT NULL REFERENCES conversations(id) ON DELETE CASCADE,
                turn_id         TEXT NOT NULL,
                role            TEXT NOT NULL,
                content         TEXT NOT NULL,
                timestamp_ms    INTEGER NOT NULL,
                files           TEXT NOT NULL DEFAULT '[]',
                has_files       INTEGER NOT NULL DEFAULT 0,
                document_data   TEXT NOT NULL DEFAULT ''
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("turns table: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_turns_conversation ON turns(conversation_id, iid)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("turns index: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_conversations_owner ON conversations(owner_id, updated_at DESC)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("conversations index: {e}")))?;

        debug!("SQLite migrations complete");
        Ok(())
    }

    /// Parse a `Turn` from a SQLite row.
    fn row_to_turn(row: &sqlx::sqlite::SqliteRow) -> Result<Turn, StoreError> {
        let turn_id: String = row
            .try_get("turn_id")
            .map_err(|e| StoreError::QueryFailed(format!("turn_id column: {e}")))?;
        let role_str: String = row
            .try_get("role")
            .map_err(|e| StoreError::QueryFailed(format!("role column: {e}")))?;
        let content: String = row
            .try_get("content")
            .map_err(|e| StoreError::QueryFailed(format!("content column: {e}")))?;
        let timestamp_ms: i64 = row
            .try_get("timestamp_ms")
            .map_err(|e| StoreError::QueryFailed(format!("timestamp_ms column: {e}")))?;
        let files_json: String = row
            .try_get("files")
            .map_err(|e| StoreError::QueryFailed(format!("files column: {e}")))?;
        let has_files: bool = row
            .try_get("has_files")
            .map_err(|e| StoreError::QueryFailed(format!("has_files column: {e}")))?;
        let document_data: String = row
            .try_get("document_data")
            .map_err(|e| StoreError::QueryFailed(format!("document_data column: {e}")))?;

        let role = match role_str.as_str() {
            "user" => TurnRole::User,
            _ => TurnRole::Assistant,
        };

        let files: Vec<String> = serde_json::from_str(&files_json).unwrap_or_default();

        let timestamp = Utc
            .timestamp_millis_opt(timestamp_ms)
            .single()
            .unwrap_or_else(Utc::now);

        Ok(Turn {
            id: turn_id,
            role,
            content,
            timestamp,
            files,
            has_files,
            document_data,
        })
    }

    /// Parse a conversation header row (without turns).
    fn row_to_conversation(row: &sqlx::sqlite::SqliteRow) -> Result<Conversation, StoreError> {
        let id: String = row
            .try_get("id")
            .map_err(|e| StoreError::QueryFailed(format!("id column: {e}")))?;
        let owner_id: String = row
            .try_get("owner_id")
            .map_err(|e| StoreError::QueryFailed(format!("owner_id column: {e}")))?;
        let name: String = row
            .try_get("name")
            .map_err(|e| StoreError::QueryFailed(format!("name column: {e}")))?;
        let created_at_str: String = row
            .try_get("created_at")
            .map_err(|e| StoreError::QueryFailed(format!("created_at column: {e}")))?;
        let updated_at_str: String = row
            .try_get("updated_at")
            .map_err(|e| StoreError::QueryFailed(format!("updated_at column: {e}")))?;

        Ok(Conversation {
            id: ConversationId(id),
            owner_id,
            name,
            turns: Vec::new(),
            created_at: parse_rfc3339(&created_at_str),
            updated_at: parse_rfc3339(&updated_at_str),
        })
    }

    /// Load the turn log for a conversation, in append order.
    async fn load_turns(&self, id: &ConversationId) -> Result<Vec<Turn>, StoreError> {
        let rows = sqlx::query(
            "SELECT turn_id, role, content, timestamp_ms, files, has_files, document_data
             FROM turns WHERE conversation_id = ? ORDER BY iid",
        )
        .bind(id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("load turns: {e}")))?;

        rows.iter().map(Self::row_to_turn).collect()
    }
}

fn parse_rfc3339(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[async_trait]
impl ChatStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn create(&self, owner_id: &str, name: &str) -> Result<Conversation, StoreError> {
        let mut conversation = Conversation::new(owner_id);
        if !name.is_empty() {
            conversation.name = name.to_string();
        }

        sqlx::query(
            "INSERT INTO conversations (id, owner_id, name, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(conversation.id.to_string())
        .bind(&conversation.owner_id)
        .bind(&conversation.name)
        .bind(conversation.created_at.to_rfc3339())
        .bind(conversation.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("create conversation: {e}")))?;

        Ok(conversation)
    }

    async fn find(
        &self,
        owner_id: &str,
        id: &ConversationId,
    ) -> Result<Option<Conversation>, StoreError> {
        let row = sqlx::query(
            "SELECT id, owner_id, name, created_at, updated_at
             FROM conversations WHERE id = ? AND owner_id = ?",
        )
        .bind(id.to_string())
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("find conversation: {e}")))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut conversation = Self::row_to_conversation(&row)?;
        conversation.turns = self.load_turns(id).await?;
        Ok(Some(conversation))
    }

    async fn list(&self, owner_id: &str) -> Result<Vec<Conversation>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, owner_id, name, created_at, updated_at
             FROM conversations WHERE owner_id = ? ORDER BY updated_at DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("list conversations: {e}")))?;

        let mut conversations = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut conversation = Self::row_to_conversation(row)?;
            conversation.turns = self.load_turns(&conversation.id).await?;
            conversations.push(conversation);
        }
        Ok(conversations)
    }

    async fn append(&self, id: &ConversationId, turns: Vec<Turn>) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Storage(format!("begin append: {e}")))?;

        // The updated_at bump doubles as the existence check.
        let updated = sqlx::query("UPDATE conversations SET updated_at = ? WHERE id = ?")
            .bind(Utc::now().to_rfc3339())
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("touch conversation: {e}")))?;

        if updated.rows_affected() == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }

        for turn in &turns {
            sqlx::query(
                "INSERT INTO turns
                 (conversation_id, turn_id, role, content, timestamp_ms, files, has_files, document_data)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(id.to_string())
            .bind(&turn.id)
            .bind(turn.role.to_string())
            .bind(&turn.content)
            .bind(turn.timestamp.timestamp_millis())
            .bind(serde_json::to_string(&turn.files).unwrap_or_else(|_| "[]".into()))
            .bind(turn.has_files)
            .bind(&turn.document_data)
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("insert turn: {e}")))?;
        }

        tx.commit()
            .await
            .map_err(|e| StoreError::Storage(format!("commit append: {e}")))?;

        debug!(conversation_id = %id, count = turns.len(), "Appended turn batch");
        Ok(())
    }

    async fn rename(
        &self,
        owner_id: &str,
        id: &ConversationId,
        name: &str,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE conversations SET name = ?, updated_at = ? WHERE id = ? AND owner_id = ?",
        )
        .bind(name)
        .bind(Utc::now().to_rfc3339())
        .bind(id.to_string())
        .bind(owner_id)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("rename conversation: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, owner_id: &str, id: &ConversationId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM conversations WHERE id = ? AND owner_id = ?")
            .bind(id.to_string())
            .bind(owner_id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("delete conversation: {e}")))?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> SqliteStore {
        SqliteStore::new("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn create_and_find_roundtrip() {
        let store = test_store().await;
        let conv = store.create("user_1", "My Chat").await.unwrap();
        assert_eq!(conv.name, "My Chat");

        let found = store.find("user_1", &conv.id).await.unwrap().unwrap();
        assert_eq!(found.name, "My Chat");
        assert_eq!(found.owner_id, "user_1");
        assert!(found.turns.is_empty());
    }

    #[tokio::test]
    async fn find_is_owner_scoped() {
        let store = test_store().await;
        let conv = store.create("user_1", "").await.unwrap();
        assert!(store.find("user_2", &conv.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn append_preserves_order_and_fields() {
        let store = test_store().await;
        let conv = store.create("user_1", "").await.unwrap();

        let user_turn = Turn::user("What is in the report?")
            .with_files(vec!["report.pdf".into()])
            .with_document("Quarterly figures...");
        let assistant_turn = Turn::assistant("The report covers Q3 figures.");

        store
            .append(&conv.id, vec![user_turn.clone(), assistant_turn])
            .await
            .unwrap();

        let found = store.find("user_1", &conv.id).await.unwrap().unwrap();
        assert_eq!(found.turns.len(), 2);
        assert_eq!(found.turns[0].role, TurnRole::User);
        assert_eq!(found.turns[0].files, vec!["report.pdf"]);
        assert!(found.turns[0].has_files);
        assert_eq!(found.turns[0].document_data, "Quarterly figures...");
        assert_eq!(
            found.turns[0].timestamp.timestamp_millis(),
            user_turn.timestamp.timestamp_millis()
        );
        assert_eq!(found.turns[1].role, TurnRole::Assistant);
    }

    #[tokio::test]
    async fn append_to_missing_conversation_fails() {
        let store = test_store().await;
        let result = store
            .append(&ConversationId::from("missing"), vec![Turn::user("hi")])
            .await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn list_orders_by_recency() {
        let store = test_store().await;
        let first = store.create("user_1", "first").await.unwrap();
        let _second = store.create("user_1", "second").await.unwrap();

        store.append(&first.id, vec![Turn::user("bump")]).await.unwrap();

        let listed = store.list("user_1").await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].name, "first");
    }

    #[tokio::test]
    async fn delete_cascades_turns() {
        let store = test_store().await;
        let conv = store.create("user_1", "").await.unwrap();
        store
            .append(&conv.id, vec![Turn::user("a"), Turn::assistant("b")])
            .await
            .unwrap();

        assert!(store.delete("user_1", &conv.id).await.unwrap());

        let orphans = sqlx::query("SELECT COUNT(*) AS n FROM turns WHERE conversation_id = ?")
            .bind(conv.id.to_string())
            .fetch_one(&store.pool)
            .await
            .unwrap();
        let n: i64 = orphans.try_get("n").unwrap();
        assert_eq!(n, 0);
    }

    #[tokio::test]
    async fn rename_updates_name() {
        let store = test_store().await;
        let conv = store.create("user_1", "").await.unwrap();
        assert!(store.rename("user_1", &conv.id, "Renamed").await.unwrap());
        let found = store.find("user_1", &conv.id).await.unwrap().unwrap();
        assert_eq!(found.name, "Renamed");
    }
}
