//! Token accounting
//!
//! Prices messages with the external tokenizer and decides when the history
//! has grown close enough to the budget that it must be summarized.

use std::sync::Arc;

use crate::conversation::Message;
use crate::core::SessionResult;
use crate::llm::TokenCounter;

use super::config::SessionConfig;

/// Computes token usage for a session's model and budget
#[derive(Clone)]
pub struct TokenAccountant {
    counter: Arc<dyn TokenCounter>,
    model: String,
    per_message_overhead: usize,
    token_limit: usize,
    refresh_threshold: f64,
}

impl TokenAccountant {
    pub fn new(counter: Arc<dyn TokenCounter>, config: &SessionConfig) -> Self {
        Self {
            counter,
            model: config.model.clone(),
            per_message_overhead: config.per_message_overhead,
            token_limit: config.token_limit,
            refresh_threshold: config.refresh_threshold,
        }
    }

    pub fn token_limit(&self) -> usize {
        self.token_limit
    }

    /// Cost of one message: its content plus the fixed per-message overhead
    pub fn message_tokens(&self, message: &Message) -> SessionResult<usize> {
        let content = self.counter.count_tokens(&message.content, &self.model)?;
        Ok(content.saturating_add(self.per_message_overhead))
    }

    /// Cost of a whole history, saturating at `usize::MAX`
    pub fn count_messages(&self, messages: &[Message]) -> SessionResult<usize> {
        let mut total: usize = 0;
        for message in messages {
            total = total.saturating_add(self.message_tokens(message)?);
        }
        Ok(total)
    }

    /// Smallest token count that triggers a refresh.
    ///
    /// `token_limit * refresh_threshold` rounded up, with a small tolerance
    /// so products like `10 * 0.7` land on 7 rather than 8.
    pub fn refresh_at(&self) -> usize {
        let exact = self.token_limit as f64 * self.refresh_threshold;
        ((exact - 1e-9).ceil().max(0.0)) as usize
    }

    /// Whether `used` tokens reach the refresh threshold
    pub fn exceeds_threshold(&self, used: usize) -> bool {
        used >= self.refresh_at()
    }

    /// Remaining budget; negative once the limit has been overrun
    pub fn tokens_left(&self, used: usize) -> i64 {
        let used = i64::try_from(used).unwrap_or(i64::MAX);
        (self.token_limit as i64).saturating_sub(used)
    }
}

impl std::fmt::Debug for TokenAccountant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenAccountant")
            .field("model", &self.model)
            .field("per_message_overhead", &self.per_message_overhead)
            .field("token_limit", &self.token_limit)
            .field("refresh_threshold", &self.refresh_threshold)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SessionError;
    use crate::llm::{ScriptedProvider, TiktokenCounter};

    fn accountant(limit: usize, threshold: f64, overhead: usize) -> TokenAccountant {
        let config = SessionConfig::new("test-model")
            .with_token_limit(limit)
            .with_refresh_threshold(threshold)
            .with_per_message_overhead(overhead);
        TokenAccountant::new(Arc::new(ScriptedProvider::new()), &config)
    }

    #[test]
    fn test_counts_content_plus_overhead() {
        let acc = accountant(100, 0.8, 3);
        let history = vec![Message::system("be terse"), Message::user("one two three")];
        // (2 + 3) + (3 + 3)
        assert_eq!(acc.count_messages(&history).unwrap(), 11);
        assert_eq!(acc.count_messages(&[]).unwrap(), 0);
    }

    #[test]
    fn test_threshold_boundary() {
        let acc = accountant(100, 0.8, 0);
        assert_eq!(acc.refresh_at(), 80);
        assert!(!acc.exceeds_threshold(79));
        assert!(acc.exceeds_threshold(80));
        assert!(acc.exceeds_threshold(81));
    }

    #[test]
    fn test_threshold_float_products() {
        assert_eq!(accountant(10, 0.7, 0).refresh_at(), 7);
        assert_eq!(accountant(101, 0.8, 0).refresh_at(), 81);
        assert_eq!(accountant(4096, 1.0, 0).refresh_at(), 4096);
    }

    #[test]
    fn test_tokens_left_can_go_negative() {
        let acc = accountant(100, 0.8, 0);
        assert_eq!(acc.tokens_left(30), 70);
        assert_eq!(acc.tokens_left(130), -30);
    }

    struct HugeCounter;

    impl TokenCounter for HugeCounter {
        fn count_tokens(&self, _text: &str, _model: &str) -> SessionResult<usize> {
            Ok(usize::MAX)
        }
    }

    #[test]
    fn test_oversized_counts_saturate() {
        let config = SessionConfig::new("test-model").with_token_limit(100);
        let acc = TokenAccountant::new(Arc::new(HugeCounter), &config);
        let history = vec![Message::user("a"), Message::assistant("b")];

        let used = acc.count_messages(&history).unwrap();
        assert_eq!(used, usize::MAX);
        assert!(acc.exceeds_threshold(used));
        assert_eq!(acc.tokens_left(used), 100 - i64::MAX);
    }

    #[test]
    fn test_unsupported_model_propagates() {
        let config = SessionConfig::new("mystery-model");
        let acc = TokenAccountant::new(Arc::new(TiktokenCounter::new()), &config);
        let err = acc.count_messages(&[Message::user("hello")]).unwrap_err();
        assert!(matches!(err, SessionError::UnsupportedModel(_)));
    }
}
