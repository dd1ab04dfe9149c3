pub mod openai;
pub mod provider;
pub mod scripted;
pub mod tokenizer;

pub use openai::OpenAiProvider;
pub use provider::{CompletionProvider, TokenCounter};
pub use scripted::{RecordedRequest, ScriptedProvider};
pub use tokenizer::TiktokenCounter;
