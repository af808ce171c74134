//! Response validation.
//!
//! Guarantees that whatever the model returned, a well-formed assistant
//! turn is persisted: the role is forced, non-text output and empty output
//! are replaced by fixed apology strings, and a fresh timestamp is stamped.

use parley_core::message::Turn;
use tracing::warn;

/// Substituted when the provider returned something other than text.
pub const MALFORMED_RESPONSE_APOLOGY: &str =
    "I apologize, but I received an unexpected response format. Please try again.";

/// Substituted when the trimmed completion is empty.
pub const EMPTY_RESPONSE_APOLOGY: &str =
    "I apologize, but I was unable to generate a proper response. Please try asking again.";

/// Normalizes and guards raw model output before it reaches the store.
pub struct ResponseValidator;

impl ResponseValidator {
    pub fn new() -> Self {
        Self
    }

    /// Turn raw model output into a well-formed assistant turn.
    ///
    /// `content` is `None` when the provider produced non-text output.
    pub fn validate(&self, content: Option<String>) -> Turn {
        let text = match content {
            None => {
                warn!("Provider returned non-text content, substituting apology");
                MALFORMED_RESPONSE_APOLOGY.to_string()
            }
            Some(raw) => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    warn!("Provider returned empty content, substituting apology");
                    EMPTY_RESPONSE_APOLOGY.to_string()
                } else {
                    trimmed.to_string()
                }
            }
        };

        // Turn::assistant forces the role and stamps a fresh timestamp.
        Turn::assistant(text)
    }
}

impl Default for ResponseValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::message::TurnRole;

    #[test]
    fn valid_content_passes_through() {
        let validator = ResponseValidator::new();
        let turn = validator.validate(Some("A perfectly good answer.".into()));
        assert_eq!(turn.role, TurnRole::Assistant);
        assert_eq!(turn.content, "A perfectly good answer.");
    }

    #[test]
    fn whitespace_is_trimmed() {
        let validator = ResponseValidator::new();
        let turn = validator.validate(Some("  padded answer \n".into()));
        assert_eq!(turn.content, "padded answer");
    }

    #[test]
    fn non_text_content_substitutes_apology() {
        let validator = ResponseValidator::new();
        let turn = validator.validate(None);
        assert_eq!(turn.content, MALFORMED_RESPONSE_APOLOGY);
        assert_eq!(turn.role, TurnRole::Assistant);
    }

    #[test]
    fn empty_content_substitutes_apology() {
        let validator = ResponseValidator::new();
        for raw in ["", "   ", "\n\t "] {
            let turn = validator.validate(Some(raw.into()));
            assert_eq!(turn.content, EMPTY_RESPONSE_APOLOGY);
        }
    }

    #[test]
    fn validation_is_idempotent_on_content() {
        let validator = ResponseValidator::new();
        let first = validator.validate(Some("Stable answer.".into()));
        let second = validator.validate(Some(first.content.clone()));
        assert_eq!(first.content, second.content);
        assert_eq!(first.role, second.role);
        // Only the timestamp may differ
        assert!(second.timestamp >= first.timestamp);
    }
}
