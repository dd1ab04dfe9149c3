//! Archive of exchanges discarded by a refresh
//!
//! A refresh keeps only a summary of the conversation. Attach a
//! [`ConversationArchive`] to a session to receive the full exchanges before
//! they are dropped, and to search them again later with
//! [`ChatSession::recall_prior_conversation`](super::ChatSession::recall_prior_conversation).

use anyhow::Result;
use std::collections::HashSet;
use tokio::sync::Mutex;

use crate::conversation::Exchange;

/// Store for exchanges a refresh is about to discard
#[async_trait::async_trait]
pub trait ConversationArchive: Send + Sync {
    async fn archive(&self, session_id: &str, exchanges: Vec<Exchange>) -> Result<()>;

    /// Up to `top_k` archived exchanges of `session_id` relevant to `query`,
    /// best match first
    async fn search(&self, session_id: &str, query: &str, top_k: usize) -> Result<Vec<Exchange>>;
}

/// Prefix of the context message that carries recalled exchanges
pub const RECALL_PREFIX: &str =
    "The following was discussed in an earlier conversation and may be relevant:";

/// Context message text for recalled exchanges
pub fn recall_context(exchanges: &[Exchange]) -> String {
    let mut text = RECALL_PREFIX.to_string();
    for exchange in exchanges {
        text.push_str(&format!(
            "\nUser: {}\nAssistant: {}",
            exchange.user.content, exchange.assistant.content
        ));
    }
    text
}

/// An exchange stored by [`InMemoryArchive`]
#[derive(Debug, Clone, PartialEq)]
pub struct ArchivedExchange {
    pub session_id: String,
    pub exchange: Exchange,
}

/// Archive that keeps everything in process memory
#[derive(Debug, Default)]
pub struct InMemoryArchive {
    entries: Mutex<Vec<ArchivedExchange>>,
}

impl InMemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything archived so far
    pub async fn entries(&self) -> Vec<ArchivedExchange> {
        self.entries.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

fn keywords(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Number of distinct query keywords the user turn or reply mentions
fn keyword_score(query: &HashSet<String>, exchange: &Exchange) -> usize {
    let text = format!("{} {}", exchange.user.content, exchange.assistant.content);
    keywords(&text).intersection(query).count()
}

#[async_trait::async_trait]
impl ConversationArchive for InMemoryArchive {
    async fn archive(&self, session_id: &str, exchanges: Vec<Exchange>) -> Result<()> {
        let mut entries = self.entries.lock().await;
        entries.extend(exchanges.into_iter().map(|exchange| ArchivedExchange {
            session_id: session_id.to_string(),
            exchange,
        }));
        Ok(())
    }

    async fn search(&self, session_id: &str, query: &str, top_k: usize) -> Result<Vec<Exchange>> {
        let query = keywords(query);
        if query.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        let entries = self.entries.lock().await;
        let mut scored: Vec<(usize, &Exchange)> = entries
            .iter()
            .filter(|entry| entry.session_id == session_id)
            .map(|entry| (keyword_score(&query, &entry.exchange), &entry.exchange))
            .filter(|(score, _)| *score > 0)
            .collect();

        // Stable: ties keep archive order
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        Ok(scored
            .into_iter()
            .take(top_k)
            .map(|(_, exchange)| exchange.clone())
            .collect())
    }
}
