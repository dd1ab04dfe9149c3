//! Chat session
//!
//! `ChatSession` owns one conversation against a completion provider and
//! keeps its history inside the configured token budget.
//!
//! Three request shapes are supported:
//! - [`send_message`](ChatSession::send_message): context-bound, appends the
//!   user turn and the reply to history
//! - [`side_message`](ChatSession::side_message): never touches history
//! - [`summarize_current_conversation`](ChatSession::summarize_current_conversation):
//!   a side query asking for a summary
//!
//! History mutations (append -> await reply -> append, and summarize -> swap)
//! run while holding the session mutex, so concurrent dispatches on clones
//! of the same session never interleave.
//!
//! # Example
//!
//! ```ignore
//! let llm = Arc::new(OpenAiProvider::from_env()?);
//! let session = ChatSession::new(
//!     SessionConfig::new("gpt-4o-mini").with_token_limit(8_000),
//!     llm,
//!     Arc::new(TiktokenCounter::new()),
//! )?;
//! session.set_primary_directive("You are terse.").await;
//! let reply = session.send_message("What is a monad?").await?;
//! ```

use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::conversation::{split_into_exchanges, Exchange, Message};
use crate::core::{SessionError, SessionPhase, SessionResult};
use crate::llm::{CompletionProvider, TokenCounter};

use super::accountant::TokenAccountant;
use super::archive::{self, ConversationArchive};
use super::config::SessionConfig;
use super::history::{PendingTurn, SessionHistory};
use super::refresher;

/// A single conversation bound to one model and token budget.
///
/// Cloning is cheap; clones share the same history.
#[derive(Clone)]
pub struct ChatSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    session_id: String,
    config: SessionConfig,
    accountant: TokenAccountant,
    provider: Arc<dyn CompletionProvider>,
    archive: Option<Arc<dyn ConversationArchive>>,
    history: Mutex<SessionHistory>,
    phase: Arc<RwLock<SessionPhase>>,
}

/// Builder for [`ChatSession`]
pub struct ChatSessionBuilder {
    config: SessionConfig,
    session_id: Option<String>,
    archive: Option<Arc<dyn ConversationArchive>>,
}

impl ChatSessionBuilder {
    /// Use a caller-chosen session ID instead of a random UUID
    pub fn session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Hand discarded exchanges to `archive` on every refresh and search it
    /// on recall
    pub fn archive(mut self, archive: Arc<dyn ConversationArchive>) -> Self {
        self.archive = Some(archive);
        self
    }

    /// Validate the configuration and create the session
    pub fn build(
        self,
        provider: Arc<dyn CompletionProvider>,
        counter: Arc<dyn TokenCounter>,
    ) -> SessionResult<ChatSession> {
        self.config.validate()?;

        let session_id = self
            .session_id
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        tracing::info!(
            "[Session] Created {} (model={}, provider={}, token_limit={}, refresh_threshold={})",
            session_id,
            self.config.model,
            provider.provider_name(),
            self.config.token_limit,
            self.config.refresh_threshold
        );

        Ok(ChatSession {
            inner: Arc::new(SessionInner {
                session_id,
                accountant: TokenAccountant::new(counter, &self.config),
                config: self.config,
                provider,
                archive: self.archive,
                history: Mutex::new(SessionHistory::default()),
                phase: Arc::new(RwLock::new(SessionPhase::Idle)),
            }),
        })
    }
}

/// Sets the session phase for the lifetime of a transaction
struct PhaseGuard {
    phase: Arc<RwLock<SessionPhase>>,
}

impl PhaseGuard {
    fn enter(phase: &Arc<RwLock<SessionPhase>>, next: SessionPhase) -> Self {
        *phase.write().unwrap_or_else(|e| e.into_inner()) = next;
        Self {
            phase: phase.clone(),
        }
    }
}

impl Drop for PhaseGuard {
    fn drop(&mut self) {
        *self.phase.write().unwrap_or_else(|e| e.into_inner()) = SessionPhase::Idle;
    }
}

impl ChatSession {
    /// Create a session with an empty history
    pub fn new(
        config: SessionConfig,
        provider: Arc<dyn CompletionProvider>,
        counter: Arc<dyn TokenCounter>,
    ) -> SessionResult<Self> {
        Self::builder(config).build(provider, counter)
    }

    pub fn builder(config: SessionConfig) -> ChatSessionBuilder {
        ChatSessionBuilder {
            config,
            session_id: None,
            archive: None,
        }
    }

    // =========================================================================
    // Identity & State
    // =========================================================================

    pub fn session_id(&self) -> &str {
        &self.inner.session_id
    }

    pub fn name(&self) -> Option<&str> {
        self.inner.config.name.as_deref()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// Current state-machine phase
    pub fn phase(&self) -> SessionPhase {
        *self.inner.phase.read().unwrap_or_else(|e| e.into_inner())
    }

    // =========================================================================
    // History
    // =========================================================================

    /// Set (or overwrite) the primary directive carried at history[0]
    pub async fn set_primary_directive(&self, directive: impl Into<String>) {
        let directive = directive.into();
        let mut history = self.inner.history.lock().await;
        tracing::info!(
            "[Session] {} primary directive set ({} chars)",
            self.inner.session_id,
            directive.len()
        );
        history.set_directive(directive);
    }

    pub async fn primary_directive(&self) -> Option<String> {
        self.inner
            .history
            .lock()
            .await
            .directive()
            .map(str::to_string)
    }

    /// Append extra system context to the history
    pub async fn add_context(&self, context: impl Into<String>) {
        let mut history = self.inner.history.lock().await;
        history.push(Message::system(context));
    }

    /// Bring archived exchanges relevant to `query` back as system context.
    ///
    /// Searches the attached archive for up to `top_k` exchanges a previous
    /// refresh discarded and appends them as one context message. Returns the
    /// number of exchanges recalled; nothing is appended when there are none
    /// or no archive is attached.
    pub async fn recall_prior_conversation(
        &self,
        query: &str,
        top_k: usize,
    ) -> SessionResult<usize> {
        let Some(store) = &self.inner.archive else {
            tracing::debug!(
                "[Session] {} has no archive, nothing to recall",
                self.inner.session_id
            );
            return Ok(0);
        };

        let found = store
            .search(&self.inner.session_id, query, top_k)
            .await
            .map_err(SessionError::Archive)?;
        if found.is_empty() {
            return Ok(0);
        }

        tracing::info!(
            "[Session] {} recalled {} archived exchanges",
            self.inner.session_id,
            found.len()
        );
        self.add_context(archive::recall_context(&found)).await;
        Ok(found.len())
    }

    /// Snapshot copy of the history
    pub async fn history(&self) -> Vec<Message> {
        self.inner.history.lock().await.messages().to_vec()
    }

    /// All message contents joined with single spaces
    pub async fn history_text(&self) -> String {
        refresher::history_text(self.inner.history.lock().await.messages())
    }

    /// Number of whitespace-separated words across the history
    pub async fn words_in_history(&self) -> usize {
        self.history_text().await.split_whitespace().count()
    }

    /// Completed user/assistant exchanges in the history
    pub async fn exchanges(&self) -> Vec<Exchange> {
        split_into_exchanges(self.inner.history.lock().await.messages())
    }

    // =========================================================================
    // Token Accounting
    // =========================================================================

    /// Tokens used by the current history
    pub async fn count_tokens(&self) -> SessionResult<usize> {
        let mut history = self.inner.history.lock().await;
        history.token_count(&self.inner.accountant)
    }

    /// `token_limit - count_tokens()`; negative when the limit was overrun
    pub async fn tokens_left(&self) -> SessionResult<i64> {
        let used = self.count_tokens().await?;
        Ok(self.inner.accountant.tokens_left(used))
    }

    /// Whether the history fits within `limit` (defaults to `token_limit`)
    pub async fn is_within_token_limit(&self, limit: Option<usize>) -> SessionResult<bool> {
        let limit = limit.unwrap_or(self.inner.config.token_limit);
        Ok(self.count_tokens().await? <= limit)
    }

    /// Whether the current history has reached the refresh threshold
    pub async fn should_refresh(&self) -> SessionResult<bool> {
        let used = self.count_tokens().await?;
        Ok(self.inner.accountant.exceeds_threshold(used))
    }

    /// Whether sending `pending` as the next user turn would trigger a refresh.
    ///
    /// This is the check [`send_message`](Self::send_message) performs: the
    /// pending turn is priced before it is appended.
    pub async fn should_refresh_with(&self, pending: &str) -> SessionResult<bool> {
        let mut history = self.inner.history.lock().await;
        let projected = self.projected_tokens(&mut history, &Message::user(pending))?;
        Ok(self.inner.accountant.exceeds_threshold(projected))
    }

    fn projected_tokens(
        &self,
        history: &mut SessionHistory,
        pending: &Message,
    ) -> SessionResult<usize> {
        let used = history.token_count(&self.inner.accountant)?;
        let pending_tokens = self.inner.accountant.message_tokens(pending)?;
        Ok(used.saturating_add(pending_tokens))
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Send a context-bound message and record the exchange.
    ///
    /// Refreshes first when the projected usage reaches the threshold and
    /// there is conversation beyond the primary directive to summarize. On
    /// provider failure, or if this future is dropped before the reply
    /// arrives, the user turn is removed again.
    pub async fn send_message(&self, text: impl Into<String>) -> SessionResult<String> {
        let pending = Message::user(text);
        let mut history = self.inner.history.lock().await;

        let projected = self.projected_tokens(&mut history, &pending)?;
        tracing::debug!(
            "[Session] {} projected tokens: {} / {} (refresh at {})",
            self.inner.session_id,
            projected,
            self.inner.accountant.token_limit(),
            self.inner.accountant.refresh_at()
        );

        if self.inner.accountant.exceeds_threshold(projected) {
            if history.has_conversation() {
                tracing::info!(
                    "[Session] {} about to reach token threshold, refreshing",
                    self.inner.session_id
                );
                self.refresh_locked(&mut history, None).await?;
            }

            let projected = self.projected_tokens(&mut history, &pending)?;
            if self.inner.accountant.exceeds_threshold(projected) {
                tracing::warn!(
                    "[Session] {} still at {} tokens; sending anyway",
                    self.inner.session_id,
                    projected
                );
            }
        }

        let _phase = PhaseGuard::enter(&self.inner.phase, SessionPhase::AwaitingReply);
        let turn = PendingTurn::begin(&mut history, pending);

        let result = self
            .inner
            .provider
            .complete(
                turn.messages(),
                &self.inner.config.model,
                self.inner.config.max_output_tokens,
            )
            .await;

        match result {
            Ok(reply) => {
                turn.commit(Message::assistant(reply.as_str()));
                tracing::info!(
                    "[Session] {} exchange recorded, history now {} messages",
                    self.inner.session_id,
                    history.len()
                );
                Ok(reply)
            }
            Err(e) => {
                tracing::error!("[Session] {} completion failed: {:#}", self.inner.session_id, e);
                drop(turn);
                Err(SessionError::Provider(e))
            }
        }
    }

    /// Send a query that never touches history.
    ///
    /// With `use_context` the request is a snapshot of the history plus the
    /// query; without it only the primary directive (if any) is sent along.
    pub async fn side_message(
        &self,
        text: impl Into<String>,
        use_context: bool,
    ) -> SessionResult<String> {
        let mut request = {
            let history = self.inner.history.lock().await;
            if use_context {
                history.messages().to_vec()
            } else {
                history.directive_only()
            }
        };
        request.push(Message::user(text));

        tracing::debug!(
            "[Session] {} side query with {} messages (use_context={})",
            self.inner.session_id,
            request.len(),
            use_context
        );

        self.inner
            .provider
            .complete(
                &request,
                &self.inner.config.model,
                self.inner.config.max_output_tokens,
            )
            .await
            .map_err(|e| {
                tracing::error!("[Session] {} side query failed: {:#}", self.inner.session_id, e);
                SessionError::Provider(e)
            })
    }

    // =========================================================================
    // Refresh
    // =========================================================================

    /// Summarize the current conversation without modifying it.
    ///
    /// `max_words` defaults to the configured summary budget, or half the
    /// words in history when none is configured.
    pub async fn summarize_current_conversation(
        &self,
        max_words: Option<usize>,
    ) -> SessionResult<String> {
        let snapshot = self.history().await;
        let max_words = self.summary_words(&snapshot, max_words);
        refresher::summarize(
            self.inner.provider.as_ref(),
            &self.inner.config.model,
            self.inner.config.max_output_tokens,
            &snapshot,
            max_words,
        )
        .await
    }

    /// Replace the history with the directive plus a summary of it
    pub async fn refresh_session(&self) -> SessionResult<()> {
        let mut history = self.inner.history.lock().await;
        self.refresh_locked(&mut history, None).await
    }

    /// Refresh only when the current history has reached the threshold and
    /// holds more than the primary directive.
    ///
    /// Returns whether a refresh happened.
    pub async fn refresh_if_needed(&self) -> SessionResult<bool> {
        let mut history = self.inner.history.lock().await;
        let used = history.token_count(&self.inner.accountant)?;
        if !self.inner.accountant.exceeds_threshold(used) || !history.has_conversation() {
            return Ok(false);
        }
        self.refresh_locked(&mut history, None).await?;
        Ok(true)
    }

    fn summary_words(&self, history: &[Message], requested: Option<usize>) -> usize {
        requested
            .or(self.inner.config.default_summary_max_words)
            .unwrap_or_else(|| refresher::default_summary_words(history))
    }

    /// Summarize then swap; history is untouched unless the summary succeeds
    async fn refresh_locked(
        &self,
        history: &mut SessionHistory,
        max_words: Option<usize>,
    ) -> SessionResult<()> {
        let _phase = PhaseGuard::enter(&self.inner.phase, SessionPhase::Refreshing);
        let before = history.len();
        let max_words = self.summary_words(history.messages(), max_words);

        let summary = refresher::summarize(
            self.inner.provider.as_ref(),
            &self.inner.config.model,
            self.inner.config.max_output_tokens,
            history.messages(),
            max_words,
        )
        .await
        .map_err(|e| {
            tracing::error!(
                "[Session] {} refresh failed, history kept ({} messages): {}",
                self.inner.session_id,
                before,
                e
            );
            SessionError::refresh_failed(e)
        })?;

        if let Some(store) = &self.inner.archive {
            let exchanges = split_into_exchanges(history.messages());
            if !exchanges.is_empty() {
                if let Err(e) = store.archive(&self.inner.session_id, exchanges).await {
                    tracing::warn!(
                        "[Session] {} failed to archive exchanges: {:#}",
                        self.inner.session_id,
                        e
                    );
                }
            }
        }

        let rebuilt = refresher::rebuilt_history(history.directive(), &summary);
        history.replace(rebuilt);

        tracing::info!(
            "[Session] {} conversation refreshed: {} -> {} messages",
            self.inner.session_id,
            before,
            history.len()
        );

        Ok(())
    }
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("session_id", &self.inner.session_id)
            .field("config", &self.inner.config)
            .field("provider", &self.inner.provider.provider_name())
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}
