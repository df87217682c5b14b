//! Grounded prompt assembly.
//!
//! Retrieved chunks are numbered and placed above the question so the model
//! can cite them. When retrieval finds nothing the context block holds
//! [`NO_CONTEXT_MARKER`] instead, and the prompt is still sent.

use crate::llm::Prompt;
use crate::models::ScoredChunk;

/// Placed in the context block when no chunk was retrieved.
pub const NO_CONTEXT_MARKER: &str = "[no context available]";

/// System instructions sent with every grounded question.
pub const SYSTEM_PROMPT: &str = "You are a question-answering assistant for documents the user \
has uploaded. Answer using the numbered context passages when they are relevant and cite them \
as [n]. If the context is marked as unavailable or does not contain the answer, say that the \
documents do not cover it, then answer from general knowledge if you can. Keep answers concise.";

/// Build the prompt for `question` grounded on `context`.
///
/// Passages keep the order they were retrieved in (most similar first).
pub fn build_prompt(question: &str, context: &[ScoredChunk]) -> Prompt {
    let mut user = String::from("Context:\n");

    if context.is_empty() {
        user.push_str(NO_CONTEXT_MARKER);
        user.push('\n');
    } else {
        for (i, chunk) in context.iter().enumerate() {
            if i > 0 {
                user.push_str("\n---\n");
            }
            user.push_str(&format!(
                "[{}] {} (part {})\n{}\n",
                i + 1,
                chunk.metadata.source,
                chunk.metadata.chunk_index + 1,
                chunk.text.trim()
            ));
        }
    }

    user.push_str("\nQuestion: ");
    user.push_str(question.trim());

    Prompt {
        system: SYSTEM_PROMPT.to_string(),
        user,
    }
}
