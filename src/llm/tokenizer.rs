//! Exact token counting with tiktoken
//!
//! Wraps tiktoken-rs BPE encoders. The encoder is chosen from the model
//! identifier (`gpt-4` -> cl100k_base, `gpt-4o*` -> o200k_base, ...) and
//! loaded once per model. Models tiktoken does not know are rejected with
//! [`SessionError::UnsupportedModel`] unless an alias maps them onto a known
//! model first.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tiktoken_rs::CoreBPE;

use super::provider::TokenCounter;
use crate::core::{SessionError, SessionResult};

/// Token counter backed by the OpenAI BPE encoders
#[derive(Default)]
pub struct TiktokenCounter {
    encoders: RwLock<HashMap<String, Arc<CoreBPE>>>,
    aliases: HashMap<String, String>,
}

impl TiktokenCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count `model` with the encoder of `known_model`.
    ///
    /// For gateways and fine-tunes that expose an OpenAI tokenizer under a
    /// name tiktoken does not recognize.
    pub fn with_alias(mut self, model: impl Into<String>, known_model: impl Into<String>) -> Self {
        self.aliases.insert(model.into(), known_model.into());
        self
    }

    /// Check whether `model` resolves to an encoder
    pub fn supports(&self, model: &str) -> bool {
        self.encoder(model).is_ok()
    }

    fn resolve<'a>(&'a self, model: &'a str) -> &'a str {
        self.aliases.get(model).map(String::as_str).unwrap_or(model)
    }

    fn encoder(&self, model: &str) -> SessionResult<Arc<CoreBPE>> {
        if let Some(bpe) = self
            .encoders
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(model)
        {
            return Ok(bpe.clone());
        }

        let bpe = tiktoken_rs::get_bpe_from_model(self.resolve(model)).map_err(|e| {
            tracing::debug!("[Tokenizer] No encoder for {}: {}", model, e);
            SessionError::UnsupportedModel(model.to_string())
        })?;
        tracing::debug!("[Tokenizer] Loaded encoder for {}", model);

        let bpe = Arc::new(bpe);
        self.encoders
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(model.to_string())
            .or_insert_with(|| bpe.clone());
        Ok(bpe)
    }
}

impl TokenCounter for TiktokenCounter {
    fn count_tokens(&self, text: &str, model: &str) -> SessionResult<usize> {
        let bpe = self.encoder(model)?;
        if text.is_empty() {
            return Ok(0);
        }
        Ok(bpe.encode_ordinary(text).len())
    }
}

impl std::fmt::Debug for TiktokenCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let loaded: Vec<String> = self
            .encoders
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect();
        f.debug_struct("TiktokenCounter")
            .field("loaded", &loaded)
            .field("aliases", &self.aliases)
            .finish()
    }
}
