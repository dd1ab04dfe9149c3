//! Session Configuration
//!
//! Constructor-time settings for a [`ChatSession`](super::ChatSession).

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::{SessionError, SessionResult};

/// Configuration for a chat session
///
/// Use the builder pattern to configure the session:
///
/// ```ignore
/// let config = SessionConfig::new("gpt-4o-mini")
///     .with_token_limit(16_000)
///     .with_refresh_threshold(0.75)
///     .with_summary_max_words(200);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Model identifier used for completions and token counting
    #[serde(default = "default_model")]
    pub model: String,

    /// Token budget for the whole history
    #[serde(default = "default_token_limit")]
    pub token_limit: usize,

    /// Fraction of `token_limit` at which history is summarized, in (0, 1]
    #[serde(default = "default_refresh_threshold")]
    pub refresh_threshold: f64,

    /// Word budget for refresh summaries.
    /// When unset, half the words currently in history are allowed.
    #[serde(default)]
    pub default_summary_max_words: Option<usize>,

    /// Fixed role/formatting cost added to every message
    #[serde(default = "default_per_message_overhead")]
    pub per_message_overhead: usize,

    /// Cap on generated tokens per completion (provider default when unset)
    #[serde(default)]
    pub max_output_tokens: Option<u32>,

    /// Display name of the agent owning the session
    #[serde(default)]
    pub name: Option<String>,
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_token_limit() -> usize {
    4096
}

fn default_refresh_threshold() -> f64 {
    0.8
}

fn default_per_message_overhead() -> usize {
    4
}

impl SessionConfig {
    /// Create a configuration for `model` with default budgets
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }

    /// Load from a JSON document; missing fields take their defaults
    pub fn from_json_str(json: &str) -> SessionResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> SessionResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    pub fn with_token_limit(mut self, token_limit: usize) -> Self {
        self.token_limit = token_limit;
        self
    }

    pub fn with_refresh_threshold(mut self, threshold: f64) -> Self {
        self.refresh_threshold = threshold;
        self
    }

    pub fn with_summary_max_words(mut self, max_words: usize) -> Self {
        self.default_summary_max_words = Some(max_words);
        self
    }

    pub fn with_per_message_overhead(mut self, overhead: usize) -> Self {
        self.per_message_overhead = overhead;
        self
    }

    pub fn with_max_output_tokens(mut self, max_tokens: u32) -> Self {
        self.max_output_tokens = Some(max_tokens);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Check every constraint the session relies on
    pub fn validate(&self) -> SessionResult<()> {
        if self.model.trim().is_empty() {
            return Err(SessionError::invalid_config("model must not be empty"));
        }
        if self.token_limit == 0 {
            return Err(SessionError::invalid_config("token_limit must be > 0"));
        }
        // NaN fails both comparisons
        if !(self.refresh_threshold > 0.0 && self.refresh_threshold <= 1.0) {
            return Err(SessionError::invalid_config(format!(
                "refresh_threshold must be in (0, 1], got {}",
                self.refresh_threshold
            )));
        }
        if self.default_summary_max_words == Some(0) {
            return Err(SessionError::invalid_config(
                "default_summary_max_words must be > 0",
            ));
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            token_limit: default_token_limit(),
            refresh_threshold: default_refresh_threshold(),
            default_summary_max_words: None,
            per_message_overhead: default_per_message_overhead(),
            max_output_tokens: None,
            name: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_session_config_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.model, "gpt-3.5-turbo");
        assert_eq!(config.token_limit, 4096);
        assert_eq!(config.refresh_threshold, 0.8);
        assert_eq!(config.per_message_overhead, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let bad = [
            SessionConfig::default().with_token_limit(0),
            SessionConfig::default().with_refresh_threshold(0.0),
            SessionConfig::default().with_refresh_threshold(1.5),
            SessionConfig::default().with_refresh_threshold(f64::NAN),
            SessionConfig::default().with_summary_max_words(0),
            SessionConfig::new("  "),
        ];
        for config in bad {
            assert!(
                matches!(config.validate(), Err(SessionError::InvalidConfig(_))),
                "expected rejection for {:?}",
                config
            );
        }
        assert!(SessionConfig::default()
            .with_refresh_threshold(1.0)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config =
            SessionConfig::from_json_str(r#"{"model": "gpt-4o", "token_limit": 1000}"#).unwrap();
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.token_limit, 1000);
        assert_eq!(config.refresh_threshold, 0.8);
        assert_eq!(config.default_summary_max_words, None);
    }

    #[test]
    fn test_from_json_validates() {
        let err = SessionConfig::from_json_str(r#"{"refresh_threshold": 2.0}"#).unwrap_err();
        assert!(matches!(err, SessionError::InvalidConfig(_)));
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"model": "gpt-4", "name": "Tomatio"}}"#).unwrap();

        let config = SessionConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.name.as_deref(), Some("Tomatio"));

        let missing = SessionConfig::from_json_file("/nonexistent/session.json");
        assert!(matches!(missing, Err(SessionError::Io(_))));
    }
}
