//! Synchronous wrapper around [`ChatSession`]
//!
//! Drives the async session on a private current-thread runtime, for callers
//! that are not running inside tokio. Do not use from within an async
//! context: blocking on a runtime from inside another one panics.

use tokio::runtime::{Builder, Runtime};

use crate::conversation::Message;
use crate::core::SessionResult;

use super::session::ChatSession;

/// Blocking facade over a shared [`ChatSession`]
pub struct BlockingChatSession {
    session: ChatSession,
    runtime: Runtime,
}

impl BlockingChatSession {
    pub fn new(session: ChatSession) -> SessionResult<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        Ok(Self { session, runtime })
    }

    /// The underlying async session (shares history with this wrapper)
    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    pub fn set_primary_directive(&self, directive: impl Into<String>) {
        self.runtime
            .block_on(self.session.set_primary_directive(directive))
    }

    pub fn add_context(&self, context: impl Into<String>) {
        self.runtime.block_on(self.session.add_context(context))
    }

    pub fn send_message(&self, text: impl Into<String>) -> SessionResult<String> {
        self.runtime.block_on(self.session.send_message(text))
    }

    pub fn side_message(
        &self,
        text: impl Into<String>,
        use_context: bool,
    ) -> SessionResult<String> {
        self.runtime
            .block_on(self.session.side_message(text, use_context))
    }

    pub fn summarize_current_conversation(
        &self,
        max_words: Option<usize>,
    ) -> SessionResult<String> {
        self.runtime
            .block_on(self.session.summarize_current_conversation(max_words))
    }

    pub fn recall_prior_conversation(&self, query: &str, top_k: usize) -> SessionResult<usize> {
        self.runtime
            .block_on(self.session.recall_prior_conversation(query, top_k))
    }

    pub fn refresh_session(&self) -> SessionResult<()> {
        self.runtime.block_on(self.session.refresh_session())
    }

    pub fn count_tokens(&self) -> SessionResult<usize> {
        self.runtime.block_on(self.session.count_tokens())
    }

    pub fn tokens_left(&self) -> SessionResult<i64> {
        self.runtime.block_on(self.session.tokens_left())
    }

    pub fn should_refresh(&self) -> SessionResult<bool> {
        self.runtime.block_on(self.session.should_refresh())
    }

    pub fn history(&self) -> Vec<Message> {
        self.runtime.block_on(self.session.history())
    }
}
