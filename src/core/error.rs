//! Session error types

use thiserror::Error;

/// Errors that can occur while managing a chat session
#[derive(Error, Debug)]
pub enum SessionError {
    /// The completion or counting provider failed (network, auth, rate limit, bad reply)
    #[error("Provider error: {0:#}")]
    Provider(anyhow::Error),

    /// No tokenizer is known for the model identifier
    #[error("Unsupported model: {0}")]
    UnsupportedModel(String),

    /// Summarization failed mid-refresh; history was left untouched
    #[error("Refresh failed: {0}")]
    RefreshFailed(#[source] Box<SessionError>),

    /// The conversation archive could not be read or written
    #[error("Archive error: {0:#}")]
    Archive(anyhow::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SessionError {
    /// Wrap a provider failure
    pub fn provider(err: impl Into<anyhow::Error>) -> Self {
        SessionError::Provider(err.into())
    }

    /// Create a configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        SessionError::InvalidConfig(msg.into())
    }

    /// Wrap an error raised while refreshing
    pub fn refresh_failed(err: SessionError) -> Self {
        SessionError::RefreshFailed(Box::new(err))
    }

    /// Whether the failure originated at the provider (directly or during a refresh)
    pub fn is_provider_error(&self) -> bool {
        match self {
            SessionError::Provider(_) => true,
            SessionError::RefreshFailed(inner) => inner.is_provider_error(),
            _ => false,
        }
    }

    /// Whether retrying the same operation could succeed.
    ///
    /// Provider failures are transient from the session's point of view;
    /// configuration and tokenizer errors are not.
    pub fn is_retryable(&self) -> bool {
        self.is_provider_error()
    }
}

/// Result type alias for session operations
pub type SessionResult<T> = Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SessionError::UnsupportedModel("llama-9000".into());
        assert_eq!(err.to_string(), "Unsupported model: llama-9000");

        let err = SessionError::invalid_config("token_limit must be > 0");
        assert_eq!(
            err.to_string(),
            "Invalid configuration: token_limit must be > 0"
        );

        let err = SessionError::provider(anyhow::anyhow!("503 Service Unavailable"));
        assert_eq!(err.to_string(), "Provider error: 503 Service Unavailable");
    }

    #[test]
    fn test_refresh_failed_keeps_cause() {
        let err = SessionError::refresh_failed(SessionError::provider(anyhow::anyhow!("timeout")));
        assert!(err.is_provider_error());
        assert!(err.is_retryable());
        let source = std::error::Error::source(&err).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("Provider error: timeout"));
    }

    #[test]
    fn test_non_retryable() {
        assert!(!SessionError::UnsupportedModel("x".into()).is_retryable());
        assert!(!SessionError::invalid_config("bad").is_retryable());
        assert!(!SessionError::Archive(anyhow::anyhow!("disk full")).is_retryable());
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let session_err: SessionError = io_err.into();
        assert!(matches!(session_err, SessionError::Io(_)));
    }
}
