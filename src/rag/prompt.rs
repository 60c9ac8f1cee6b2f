//! Deterministic prompt rendering.
//!
//! A pure function of its inputs: no I/O, no timestamps, no hidden state.
//! Section order is fixed: system instructions, retrieved context, bounded
//! history, the live question, the answer cue.

use super::retriever::{DocumentContent, RetrievedDocument};
use crate::history::{ConversationTurn, HISTORY_WINDOW};

const SYSTEM_INSTRUCTIONS: &str = "You are an expert assistant for the Directorate General of Mine Safety (DGMS) in India.\n\
Your role is to provide accurate, detailed information about mining accident classifications,\n\
safety codes, locations, and accident causes based on DGMS standards.";

const BEHAVIOR_RULES: &str = "Instructions:\n\
1. Answer based on the provided context from DGMS classification codes\n\
2. When mentioning accident codes, include both the code number and description\n\
3. Explain what each classification code represents\n\
4. If asked about specific accident types, list all relevant codes\n\
5. If the context doesn't fully answer the question, say so clearly\n\
6. Be concise but comprehensive\n\
7. Use bullet points for listing multiple codes or categories";

const EMPTY_CONTEXT: &str = "(no matching records retrieved)";

#[derive(Debug, Clone, Copy, Default)]
pub struct PromptBuilder;

impl PromptBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Render the full prompt. `history` of `None` (or an empty slice) skips
    /// the previous-conversation section entirely; longer histories are
    /// bounded to the trailing `HISTORY_WINDOW` turns here, regardless of
    /// what the caller hands in.
    pub fn build(
        &self,
        query: &str,
        context: &[RetrievedDocument],
        history: Option<&[ConversationTurn]>,
    ) -> String {
        let context_text = render_context(context);
        let history_text = history
            .filter(|turns| !turns.is_empty())
            .map(render_history)
            .unwrap_or_default();

        format!(
            "{SYSTEM_INSTRUCTIONS}\n\n\
             Context from DGMS classification system:\n\
             {context_text}{history_text}\n\n\
             User Question: {query}\n\n\
             {BEHAVIOR_RULES}\n\n\
             Answer:"
        )
    }
}

fn render_context(context: &[RetrievedDocument]) -> String {
    if context.is_empty() {
        return EMPTY_CONTEXT.to_string();
    }

    context
        .iter()
        .map(|doc| {
            format!(
                "[Reference {}: {}]\n{}",
                doc.rank,
                doc.source,
                render_content(&doc.content)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn render_content(content: &DocumentContent) -> String {
    match content {
        DocumentContent::Text(text) => text.clone(),
        DocumentContent::Structured(value) => {
            serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
        }
    }
}

fn render_history(turns: &[ConversationTurn]) -> String {
    let window = &turns[turns.len().saturating_sub(HISTORY_WINDOW)..];
    let lines = window
        .iter()
        .map(|turn| format!("User: {}\nAssistant: {}", turn.user, turn.assistant))
        .collect::<Vec<_>>()
        .join("\n");
    format!("\n\nPrevious conversation:\n{lines}")
}
