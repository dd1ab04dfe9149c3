pub mod core;
pub mod conversation;
pub mod session;

// Provider integrations
pub mod llm;
pub mod logging;

pub use crate::conversation::{Exchange, Message, Role};
pub use crate::core::{SessionError, SessionPhase, SessionResult};
pub use crate::llm::{CompletionProvider, OpenAiProvider, TiktokenCounter, TokenCounter};
pub use crate::session::{BlockingChatSession, ChatSession, SessionConfig};
