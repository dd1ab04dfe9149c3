//! Conversation refresh
//!
//! Compresses a history into a short summary produced by the model itself
//! and builds the two-entry replacement history (directive + summary).

use crate::conversation::Message;
use crate::core::{SessionError, SessionResult};
use crate::llm::CompletionProvider;

/// Prefix of the synthetic message that carries a refresh summary
pub const SUMMARY_PREFIX: &str = "Summary of earlier conversation: ";

/// Instruction sent to the model when summarizing
pub fn summary_prompt(max_words: usize) -> String {
    format!(
        "Summarize the entire conversation we have had in {} words or less. \
         Make a note of key information you learned about the user, the key \
         recommendations you gave to the user, and any key information you \
         shared with the user.",
        max_words
    )
}

/// Word budget used when none is configured: half the words in history
pub fn default_summary_words(history: &[Message]) -> usize {
    (history_text(history).split_whitespace().count() / 2).max(1)
}

/// All message contents joined with single spaces
pub fn history_text(history: &[Message]) -> String {
    history
        .iter()
        .map(|m| m.content.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Ask the model to summarize `history` in at most `max_words` words.
///
/// Works on a transient copy: the prompt is appended to a cloned request,
/// never to the caller's history.
pub async fn summarize(
    provider: &dyn CompletionProvider,
    model: &str,
    max_tokens: Option<u32>,
    history: &[Message],
    max_words: usize,
) -> SessionResult<String> {
    let mut request = history.to_vec();
    request.push(Message::user(summary_prompt(max_words)));

    tracing::debug!(
        "[Refresher] Summarizing {} messages in <= {} words",
        history.len(),
        max_words
    );

    provider
        .complete(&request, model, max_tokens)
        .await
        .map_err(SessionError::Provider)
}

/// The history that replaces a summarized one
pub fn rebuilt_history(directive: Option<&str>, summary: &str) -> Vec<Message> {
    let mut history = Vec::with_capacity(2);
    if let Some(directive) = directive {
        history.push(Message::system(directive));
    }
    history.push(Message::system(format!("{}{}", SUMMARY_PREFIX, summary.trim())));
    history
}
