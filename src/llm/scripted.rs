//! Scripted provider for tests and offline demos
//!
//! Replays a queue of canned replies (or failures) and records every request
//! it receives. Also counts tokens as whitespace-separated words, which makes
//! budgets in tests easy to reason about.

use anyhow::Result;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use super::provider::{CompletionProvider, TokenCounter};
use crate::conversation::Message;
use crate::core::SessionResult;

enum Step {
    Reply(String),
    Fail(String),
}

/// A request observed by [`ScriptedProvider`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub messages: Vec<Message>,
    pub model: String,
    pub max_tokens: Option<u32>,
}

/// Completion provider that answers from a script
#[derive(Default)]
pub struct ScriptedProvider {
    steps: Mutex<VecDeque<Step>>,
    fallback: Option<String>,
    delay: Option<Duration>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful reply
    pub fn with_reply(self, text: impl Into<String>) -> Self {
        self.push(Step::Reply(text.into()));
        self
    }

    /// Queue a provider failure
    pub fn with_failure(self, message: impl Into<String>) -> Self {
        self.push(Step::Fail(message.into()));
        self
    }

    /// Reply used once the script is exhausted
    pub fn with_fallback(mut self, text: impl Into<String>) -> Self {
        self.fallback = Some(text.into());
        self
    }

    /// Sleep before answering each request
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue a reply after construction
    pub fn push_reply(&self, text: impl Into<String>) {
        self.push(Step::Reply(text.into()));
    }

    /// Queue a failure after construction
    pub fn push_failure(&self, message: impl Into<String>) {
        self.push(Step::Fail(message.into()));
    }

    /// All requests received so far, oldest first
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn push(&self, step: Step) {
        self.steps
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(step);
    }

    fn next_step(&self) -> Option<Step> {
        self.steps
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
    }
}

#[async_trait::async_trait]
impl CompletionProvider for ScriptedProvider {
    async fn complete(
        &self,
        messages: &[Message],
        model: &str,
        max_tokens: Option<u32>,
    ) -> Result<String> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(RecordedRequest {
                messages: messages.to_vec(),
                model: model.to_string(),
                max_tokens,
            });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match self.next_step() {
            Some(Step::Reply(text)) => Ok(text),
            Some(Step::Fail(message)) => Err(anyhow::anyhow!(message)),
            None => match &self.fallback {
                Some(text) => Ok(text.clone()),
                None => anyhow::bail!("scripted provider has no reply queued"),
            },
        }
    }

    fn provider_name(&self) -> &str {
        "scripted"
    }
}

impl TokenCounter for ScriptedProvider {
    fn count_tokens(&self, text: &str, _model: &str) -> SessionResult<usize> {
        Ok(text.split_whitespace().count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replays_in_order() {
        let provider = ScriptedProvider::new()
            .with_reply("one")
            .with_failure("boom")
            .with_fallback("again");

        let msgs = [Message::user("x")];
        assert_eq!(provider.complete(&msgs, "m", None).await.unwrap(), "one");
        assert!(provider.complete(&msgs, "m", None).await.is_err());
        assert_eq!(provider.complete(&msgs, "m", Some(5)).await.unwrap(), "again");

        let requests = provider.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[2].max_tokens, Some(5));
    }

    #[tokio::test]
    async fn test_exhausted_script_fails() {
        let provider = ScriptedProvider::new();
        assert!(provider.complete(&[], "m", None).await.is_err());
    }

    #[test]
    fn test_counts_words() {
        let provider = ScriptedProvider::new();
        assert_eq!(provider.count_tokens("  a b\tc\n", "any").unwrap(), 3);
    }
}
