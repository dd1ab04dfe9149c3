//! Session management
//!
//! - `ChatSession` - history, token budget and dispatch for one conversation
//! - `SessionConfig` - constructor-time configuration
//! - `TokenAccountant` - token usage and refresh threshold
//! - `refresher` - summarize-and-reset helpers
//! - `ConversationArchive` - stores exchanges dropped by a refresh for later recall
//! - `BlockingChatSession` - synchronous facade

pub mod accountant;
pub mod archive;
pub mod blocking;
pub mod config;
mod history;
pub mod refresher;
#[allow(clippy::module_inception)]
pub mod session;

pub use accountant::TokenAccountant;
pub use archive::{ArchivedExchange, ConversationArchive, InMemoryArchive, RECALL_PREFIX};
pub use blocking::BlockingChatSession;
pub use config::SessionConfig;
pub use session::{ChatSession, ChatSessionBuilder};
