//! Turn and Conversation domain types.
//!
//! These are the core value objects that flow through the entire system:
//! User sends a turn → pipeline composes a prompt → provider generates a
//! response → validator produces the assistant turn → both are persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The role of a turn's author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    /// The end user
    User,
    /// The AI assistant
    Assistant,
}

impl std::fmt::Display for TurnRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// A single turn in a conversation. Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    /// Unique turn ID
    pub id: String,

    /// Who authored this turn
    pub role: TurnRole,

    /// The text content
    pub content: String,

    /// Timestamp, serialized as integer epoch milliseconds
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,

    /// Names of files uploaded with this turn
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,

    /// Whether any files were uploaded with this turn
    #[serde(default)]
    pub has_files: bool,

    /// Extracted text of uploaded documents (may be empty)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub document_data: String,
}

impl Turn {
    /// Create a new user turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: TurnRole::User,
            content: content.into(),
            timestamp: Utc::now(),
            files: Vec::new(),
            has_files: false,
            document_data: String::new(),
        }
    }

    /// Create a new assistant turn.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: TurnRole::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
            files: Vec::new(),
            has_files: false,
            document_data: String::new(),
        }
    }

    /// Attach uploaded file names. Sets `has_files` accordingly.
    pub fn with_files(mut self, files: Vec<String>) -> Self {
        self.has_files = !files.is_empty();
        self.files = files;
        self
    }

    /// Attach extracted document text.
    pub fn with_document(mut self, document_data: impl Into<String>) -> Self {
        self.document_data = document_data.into();
        self
    }
}

/// A conversation is an ordered, append-only sequence of turns owned by one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique conversation ID
    pub id: ConversationId,

    /// The owning user's ID
    pub owner_id: String,

    /// Display name (user-set or default)
    pub name: String,

    /// Ordered turns, chronological
    pub turns: Vec<Turn>,

    /// When this conversation was created
    pub created_at: DateTime<Utc>,

    /// When the last turn was appended
    pub updated_at: DateTime<Utc>,
}

/// Default display name for a freshly created conversation.
pub const DEFAULT_CONVERSATION_NAME: &str = "New Chat";

impl Conversation {
    /// Create a new empty conversation for the given owner.
    pub fn new(owner_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: ConversationId::new(),
            owner_id: owner_id.into(),
            name: DEFAULT_CONVERSATION_NAME.into(),
            turns: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Append a turn, bumping `updated_at`.
    pub fn push(&mut self, turn: Turn) {
        self.updated_at = Utc::now();
        self.turns.push(turn);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_user_turn() {
        let turn = Turn::user("Hello there");
        assert_eq!(turn.role, TurnRole::User);
        assert_eq!(turn.content, "Hello there");
        assert!(!turn.has_files);
        assert!(turn.document_data.is_empty());
    }

    #[test]
    fn with_files_sets_flag() {
        let turn = Turn::user("See attached").with_files(vec!["report.pdf".into()]);
        assert!(turn.has_files);
        assert_eq!(turn.files, vec!["report.pdf"]);

        let bare = Turn::user("no files").with_files(vec![]);
        assert!(!bare.has_files);
    }

    #[test]
    fn conversation_tracks_updates() {
        let mut conv = Conversation::new("user_1");
        let created = conv.created_at;

        conv.push(Turn::user("First turn"));
        assert_eq!(conv.turns.len(), 1);
        assert!(conv.updated_at >= created);
        assert_eq!(conv.name, DEFAULT_CONVERSATION_NAME);
    }

    #[test]
    fn turn_timestamp_serializes_as_epoch_ms() {
        let turn = Turn::user("timestamped");
        let json = serde_json::to_value(&turn).unwrap();
        assert!(json["timestamp"].is_i64());
        assert_eq!(
            json["timestamp"].as_i64().unwrap(),
            turn.timestamp.timestamp_millis()
        );
    }

    #[test]
    fn turn_serialization_roundtrip() {
        let turn = Turn::user("Test turn")
            .with_files(vec!["a.txt".into(), "b.txt".into()])
            .with_document("extracted text");
        let json = serde_json::to_string(&turn).unwrap();
        let deserialized: Turn = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.content, "Test turn");
        assert_eq!(deserialized.role, TurnRole::User);
        assert_eq!(deserialized.files.len(), 2);
        assert!(deserialized.has_files);
        assert_eq!(deserialized.document_data, "extracted text");
    }
}
