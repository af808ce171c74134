//! Prompt composition.
//!
//! Merges context, document text, search results, and mode flags into one
//! instruction block. Template selection is a fixed branch table keyed on
//! (has search answer, needs history) — not a learned policy — so the
//! mapping below must stay exactly reproducible:
//!
//! | search answer | needs history | template |
//! |---|---|---|
//! | yes | any  | web-augmented (context only when history is needed) |
//! | no  | true | history-aware (full context block) |
//! | no  | false | standalone (recent-messages chain only) |
//!
//! The document block and the deep-reasoning notes are appended
//! independently of the branch taken.

use parley_core::search::SearchAnswer;

/// Per-request mode flags supplied by the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModeFlags {
    /// The user opted in to web search for this turn
    pub search_requested: bool,
    /// The user asked for deep reasoning / report formatting
    pub deep_reasoning_requested: bool,
}

/// Everything the composer needs for one turn.
pub struct ComposeInput<'a> {
    /// Context block from the assembler (extended or minimal shape)
    pub context_text: &'a str,
    /// The relevance verdict that chose the context shape
    pub needs_history: bool,
    /// Extracted document text for this turn (may be empty)
    pub document_data: &'a str,
    /// Search answer from the gate, when one was obtained
    pub search: Option<&'a SearchAnswer>,
    /// Whether deep reasoning / report formatting was requested
    pub deep_reasoning: bool,
    /// The current user message
    pub current_text: &'a str,
}

const AGENT_MODE_NOTE: &str = "Agent mode is enabled: reason carefully and work through the \
question step by step before giving your final answer.";

const REPORT_FORMAT_NOTE: &str = "Format your answer as a strict Markdown report with these \
sections, in this exact order: Title, Executive Summary, Table of Contents, Background, \
Key Findings, Detailed Analysis, Evidence, Limitations, Conclusion, Recommendations, Sources. \
Use numbered inline citations like [1] that resolve to a trailing Sources section formatted \
as [n]: [title](url), one reference per line.";

/// The prompt composer. Stateless — create one and reuse it.
pub struct PromptComposer;

impl PromptComposer {
    pub fn new() -> Self {
        Self
    }

    /// Compose the final instruction block for one turn.
    pub fn compose(&self, input: &ComposeInput<'_>) -> String {
        let mut sections: Vec<String> = Vec::new();

        match input.search {
            Some(answer) => self.web_augmented(&mut sections, input, answer),
            None if input.needs_history => self.history_aware(&mut sections, input),
            None => self.standalone(&mut sections, input),
        }

        if input.deep_reasoning {
            sections.push(AGENT_MODE_NOTE.into());
            sections.push(REPORT_FORMAT_NOTE.into());
        }

        sections.join("\n\n")
    }

    /// Web-augmented template: search answer + mandatory sources section.
    fn web_augmented(
        &self,
        sections: &mut Vec<String>,
        input: &ComposeInput<'_>,
        answer: &SearchAnswer,
    ) {
        sections.push(
            "You are a helpful assistant with access to fresh web search results.".into(),
        );

        if input.needs_history {
            sections.push(input.context_text.to_string());
        }

        self.push_document_block(sections, input.document_data);

        sections.push(format!("Web Search Answer:\n{}", answer.answer));

        let source_lines: Vec<String> = answer
            .references
            .iter()
            .enumerate()
            .map(|(i, r)| format!("[{}]: [{}]({})", i + 1, r.title, r.url))
            .collect();
        sections.push(format!("Sources to include:\n{}", source_lines.join("\n")));

        sections.push(format!("Current User Message: {}", input.current_text));

        sections.push(
            "Instructions:\n\
             - Synthesize the conversation context, document content, and the web search \
             answer above into one accurate response\n\
             - End your response with a literal \"Sources:\" section that reproduces the \
             reference list above, one per line, numbered from 1"
                .into(),
        );
    }

    /// History-aware template: the user is referencing earlier turns.
    fn history_aware(&self, sections: &mut Vec<String>, input: &ComposeInput<'_>) {
        sections.push(
            "You are a helpful assistant. The user is referring to previous messages or \
             documents."
                .into(),
        );

        sections.push(input.context_text.to_string());

        self.push_document_block(sections, input.document_data);

        sections.push(format!("Current User Message: {}", input.current_text));

        sections.push(
            "Instructions:\n\
             - The user is referencing earlier context, so carefully review the \
             conversation history above\n\
             - Explicitly reference the relevant prior turns in your answer\n\
             - Provide a clear and accurate response based on both the history and the \
             current message"
                .into(),
        );
    }

    /// Standalone template: answer directly, with only the recent-messages
    /// chain for light grounding.
    fn standalone(&self, sections: &mut Vec<String>, input: &ComposeInput<'_>) {
        sections.push(format!(
            "You are a helpful assistant. Here is the recent conversation context:\n{}",
            input.context_text
        ));

        self.push_document_block(sections, input.document_data);

        sections.push(format!("Current User Message: {}", input.current_text));

        sections.push("Please answer the user's question directly.".into());
    }

    /// Document block — appended whenever document text is present.
    fn push_document_block(&self, sections: &mut Vec<String>, document_data: &str) {
        if document_data.is_empty() {
            return;
        }
        sections.push(format!(
            "Fetched Document Data:\n{document_data}\n\n\
             Use the above document content to answer the user's question."
        ));
    }
}

impl Default for PromptComposer {
    fn default() -> Self {
        Self::new()
    }
}
