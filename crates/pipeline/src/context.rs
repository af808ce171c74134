//! Conversational context assembly.
//!
//! Builds the textual context block from stored history in one of two
//! shapes, chosen by the relevance verdict:
//!
//! - **Extended** — the last [`HISTORY_WINDOW`] turns, positionally paired
//!   into user/assistant exchanges, rendered as numbered `Exchange N`
//!   blocks between literal history markers. At most [`MAX_EXCHANGES`]
//!   pairs survive.
//! - **Minimal** — the last two user turns only, rendered as two labeled
//!   lines with a literal `null` for an absent slot.
//!
//! # Determinism
//!
//! Assembly is deterministic: identical inputs always produce identical
//! output. All truncation is by character count with a literal `...`
//! marker — a documented heuristic, not a token-exact budget.

use parley_core::message::{Turn, TurnRole};

/// How many stored turns the extended window considers.
pub const HISTORY_WINDOW: usize = 20;

/// How many exchanges survive into the rendered history.
pub const MAX_EXCHANGES: usize = 8;

/// Character cap for a paired turn's document snippet.
pub const DOCUMENT_SNIPPET_LIMIT: usize = 1000;

/// Character cap for a paired assistant reply.
pub const REPLY_SNIPPET_LIMIT: usize = 800;

/// Character cap for a minimal-mode document suffix.
pub const MINIMAL_DOCUMENT_LIMIT: usize = 400;

/// Rendering of an absent minimal-mode slot.
const NULL_SLOT: &str = "null";

/// Truncate to `limit` characters, appending `...` only when truncation
/// actually occurred. A string of exactly `limit` characters passes
/// through unmodified.
pub fn truncate_chars(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut out: String = text.chars().take(limit).collect();
    out.push_str("...");
    out
}

/// The context assembler. Stateless — create one and reuse it.
pub struct ContextAssembler;

impl ContextAssembler {
    pub fn new() -> Self {
        Self
    }

    /// Build the context block for the given verdict.
    pub fn assemble(&self, turns: &[Turn], needs_history: bool) -> String {
        if needs_history {
            self.extended(turns)
        } else {
            self.minimal(turns)
        }
    }

    /// Extended mode: positional user/assistant pairing over the last
    /// [`HISTORY_WINDOW`] turns.
    ///
    /// The pairing assumes strict alternation in storage: index 2k is
    /// expected to be a user turn and 2k+1 its assistant reply. A chunk
    /// whose even-positioned element is not a user turn is skipped, and a
    /// trailing unpaired turn is dropped.
    fn extended(&self, turns: &[Turn]) -> String {
        let window = &turns[turns.len().saturating_sub(HISTORY_WINDOW)..];

        let mut pairs: Vec<(&Turn, &Turn)> = Vec::new();
        for chunk in window.chunks(2) {
            match chunk {
                [user, assistant] if user.role == TurnRole::User => {
                    pairs.push((user, assistant));
                }
                _ => {}
            }
        }

        let kept = &pairs[pairs.len().saturating_sub(MAX_EXCHANGES)..];

        let mut blocks: Vec<String> = Vec::with_capacity(kept.len());
        for (i, (user, assistant)) in kept.iter().enumerate() {
            let mut block = format!("Exchange {}:\nUser: {}", i + 1, user.content);

            if user.has_files && !user.files.is_empty() {
                block.push_str(&format!("\n[Files] {}", user.files.join(", ")));
            }

            if !user.document_data.is_empty() {
                block.push_str(&format!(
                    "\n[Document Content] {}",
                    truncate_chars(&user.document_data, DOCUMENT_SNIPPET_LIMIT)
                ));
            }

            block.push_str(&format!(
                "\nAssistant: {}",
                truncate_chars(&assistant.content, REPLY_SNIPPET_LIMIT)
            ));

            blocks.push(block);
        }

        format!(
            "=== CONVERSATION HISTORY ===\n{}\n=== END HISTORY ===",
            blocks.join("\n---\n")
        )
    }

    /// Minimal mode: the last two user turns, most recent first.
    fn minimal(&self, turns: &[Turn]) -> String {
        let mut recent_users = turns.iter().filter(|t| t.role == TurnRole::User).rev();

        let last = recent_users.next().map(Self::render_minimal_slot);
        let second_last = recent_users.next().map(Self::render_minimal_slot);

        format!(
            "LastMessage: {}\nSecondLastMessage: {}",
            last.unwrap_or_else(|| NULL_SLOT.into()),
            second_last.unwrap_or_else(|| NULL_SLOT.into())
        )
    }

    fn render_minimal_slot(turn: &Turn) -> String {
        if turn.document_data.is_empty() {
            turn.content.clone()
        } else {
            format!(
                "{}\n[Document: {}]",
                turn.content,
                truncate_chars(&turn.document_data, MINIMAL_DOCUMENT_LIMIT)
            )
        }
    }
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self::new()
    }
}
