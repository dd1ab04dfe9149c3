//! Owned history state
//!
//! `SessionHistory` is only ever reached through the session mutex. Every
//! mutation goes through a method here so the token cache is invalidated in
//! one place, and the primary directive always sits at index 0.

use crate::conversation::Message;
use crate::core::SessionResult;

use super::accountant::TokenAccountant;

#[derive(Debug, Default)]
pub(crate) struct SessionHistory {
    directive: Option<String>,
    messages: Vec<Message>,
    cached_tokens: Option<usize>,
}

impl SessionHistory {
    pub(crate) fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub(crate) fn directive(&self) -> Option<&str> {
        self.directive.as_deref()
    }

    pub(crate) fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether anything besides the primary directive is recorded
    pub(crate) fn has_conversation(&self) -> bool {
        self.messages.len() > usize::from(self.directive.is_some())
    }

    /// Install or overwrite the directive at index 0
    pub(crate) fn set_directive(&mut self, directive: String) {
        let message = Message::system(directive.as_str());
        if self.directive.is_some() {
            self.messages[0] = message;
        } else {
            self.messages.insert(0, message);
        }
        self.directive = Some(directive);
        self.cached_tokens = None;
    }

    pub(crate) fn push(&mut self, message: Message) {
        self.messages.push(message);
        self.cached_tokens = None;
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.messages.truncate(len);
        self.cached_tokens = None;
    }

    /// Swap in a rebuilt history wholesale
    pub(crate) fn replace(&mut self, messages: Vec<Message>) {
        debug_assert!(
            self.directive.is_none()
                || messages.first().map(|m| m.content.as_str()) == self.directive.as_deref()
        );
        self.messages = messages;
        self.cached_tokens = None;
    }

    /// Token count of the current messages, recomputed after any mutation
    pub(crate) fn token_count(&mut self, accountant: &TokenAccountant) -> SessionResult<usize> {
        if let Some(tokens) = self.cached_tokens {
            return Ok(tokens);
        }
        let tokens = accountant.count_messages(&self.messages)?;
        self.cached_tokens = Some(tokens);
        Ok(tokens)
    }

    /// Messages to send with a context-free query
    pub(crate) fn directive_only(&self) -> Vec<Message> {
        self.directive
            .iter()
            .map(|d| Message::system(d.as_str()))
            .collect()
    }
}

/// A user turn appended while its reply is outstanding.
///
/// Dropping the guard without [`commit`](PendingTurn::commit) removes the
/// turn again, whether the provider failed or the dispatching future was
/// cancelled.
pub(crate) struct PendingTurn<'a> {
    history: &'a mut SessionHistory,
    mark: usize,
    committed: bool,
}

impl<'a> PendingTurn<'a> {
    pub(crate) fn begin(history: &'a mut SessionHistory, user: Message) -> Self {
        let mark = history.len();
        history.push(user);
        Self {
            history,
            mark,
            committed: false,
        }
    }

    pub(crate) fn messages(&self) -> &[Message] {
        self.history.messages()
    }

    pub(crate) fn commit(mut self, reply: Message) {
        self.history.push(reply);
        self.committed = true;
    }
}

impl Drop for PendingTurn<'_> {
    fn drop(&mut self) {
        if !self.committed {
            tracing::warn!(
                "[Session] Rolling back unanswered user turn ({} -> {} messages)",
                self.history.len(),
                self.mark
            );
            self.history.truncate(self.mark);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedProvider;
    use crate::session::SessionConfig;
    use std::sync::Arc;

    fn accountant() -> TokenAccountant {
        let config = SessionConfig::new("m").with_per_message_overhead(0);
        TokenAccountant::new(Arc::new(ScriptedProvider::new()), &config)
    }

    #[test]
    fn test_directive_stays_first() {
        let mut history = SessionHistory::default();
        history.push(Message::user("early"));
        history.set_directive("first".into());
        history.set_directive("second".into());

        assert_eq!(history.len(), 2);
        assert_eq!(history.messages()[0], Message::system("second"));
        assert_eq!(history.directive(), Some("second"));
        assert_eq!(history.directive_only(), vec![Message::system("second")]);
    }

    #[test]
    fn test_has_conversation() {
        let mut history = SessionHistory::default();
        assert!(!history.has_conversation());
        history.set_directive("d".into());
        assert!(!history.has_conversation());
        history.push(Message::system("ctx"));
        assert!(history.has_conversation());
    }

    #[test]
    fn test_cache_invalidated_on_mutation() {
        let acc = accountant();
        let mut history = SessionHistory::default();
        assert_eq!(history.token_count(&acc).unwrap(), 0);

        history.push(Message::user("one two"));
        assert_eq!(history.token_count(&acc).unwrap(), 2);

        history.set_directive("three".into());
        assert_eq!(history.token_count(&acc).unwrap(), 3);

        history.truncate(1);
        assert_eq!(history.token_count(&acc).unwrap(), 1);

        history.replace(vec![Message::system("three"), Message::system("a b c d")]);
        assert_eq!(history.token_count(&acc).unwrap(), 5);
    }

    #[test]
    fn test_pending_turn_rollback_and_commit() {
        let mut history = SessionHistory::default();
        history.push(Message::system("ctx"));

        {
            let turn = PendingTurn::begin(&mut history, Message::user("lost"));
            assert_eq!(turn.messages().len(), 2);
        }
        assert_eq!(history.len(), 1);

        let turn = PendingTurn::begin(&mut history, Message::user("kept"));
        turn.commit(Message::assistant("reply"));
        assert_eq!(history.len(), 3);
        assert_eq!(history.messages()[2], Message::assistant("reply"));
    }
}
