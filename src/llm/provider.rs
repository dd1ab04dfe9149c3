//! Provider traits
//!
//! The session talks to the outside world through two seams: a completion
//! endpoint and a tokenizer. Both are keyed by the model identifier the
//! session was configured with.

use anyhow::Result;

use crate::conversation::Message;
use crate::core::SessionResult;

/// Trait for chat-completion backends.
///
/// Implementations own their transport, authentication and timeout policy.
/// A returned error is surfaced to the session caller as
/// [`SessionError::Provider`](crate::core::SessionError::Provider).
#[async_trait::async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Send the ordered messages and return the assistant reply text.
    async fn complete(
        &self,
        messages: &[Message],
        model: &str,
        max_tokens: Option<u32>,
    ) -> Result<String>;

    /// Get the provider name (e.g., "openai").
    fn provider_name(&self) -> &str;
}

/// Trait for model-specific token counting.
pub trait TokenCounter: Send + Sync {
    /// Count the tokens `text` costs for `model`.
    ///
    /// Must fail with [`SessionError::UnsupportedModel`](crate::core::SessionError::UnsupportedModel)
    /// rather than guess when the model has no known tokenizer.
    fn count_tokens(&self, text: &str, model: &str) -> SessionResult<usize>;
}
