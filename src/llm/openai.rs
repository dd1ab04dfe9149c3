//! OpenAI-compatible chat-completions client
//!
//! Talks to any endpoint implementing `POST {base}/chat/completions`
//! (OpenAI, Azure-style proxies, local gateways).
//!
//! # Authentication
//!
//! Uses a bearer API key (set via `OPENAI_API_KEY` environment variable or passed directly).
//!
//! ```ignore
//! // From environment variable
//! let llm = OpenAiProvider::from_env()?;
//!
//! // With explicit API key and a gateway
//! let llm = OpenAiProvider::new("sk-...").with_base_url("http://localhost:8080/v1");
//! ```

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use super::provider::CompletionProvider;
use crate::conversation::Message;

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

// ============================================================================
// Provider
// ============================================================================

/// Chat-completions provider over HTTP
pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    api_base: String,
    timeout: Duration,
}

impl OpenAiProvider {
    /// Create a new provider from environment variables
    ///
    /// Reads from:
    /// - `OPENAI_API_KEY` (required)
    /// - `OPENAI_BASE_URL` (optional, defaults to the public OpenAI API)
    pub fn from_env() -> Result<Self> {
        tracing::info!("Creating OpenAI provider from environment");

        let api_key =
            env::var("OPENAI_API_KEY").context("OPENAI_API_KEY environment variable not set")?;

        let mut provider = Self::new(api_key);
        if let Ok(base) = env::var("OPENAI_BASE_URL") {
            tracing::info!("Using base URL: {}", base);
            provider = provider.with_base_url(base);
        }

        Ok(provider)
    }

    /// Create a new provider with a specific API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set the API base URL (without the `/chat/completions` suffix)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.api_base = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn completions_url(base: &str) -> String {
        format!("{}/chat/completions", base.trim_end_matches('/'))
    }

    fn extract_reply(body: &str) -> Result<String> {
        let response: ChatCompletionResponse =
            serde_json::from_str(body).context("Failed to parse chat completion response")?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .context("Chat completion response contained no message content")
    }
}

#[async_trait::async_trait]
impl CompletionProvider for OpenAiProvider {
    async fn complete(
        &self,
        messages: &[Message],
        model: &str,
        max_tokens: Option<u32>,
    ) -> Result<String> {
        let url = Self::completions_url(&self.api_base);

        let request = ChatCompletionRequest {
            model,
            messages,
            max_tokens,
        };
        let request_json =
            serde_json::to_string(&request).context("Failed to serialize chat request")?;

        tracing::info!("[OpenAI] Sending {} messages to {}", messages.len(), model);
        tracing::debug!("[OpenAI] Request JSON: {}", request_json);

        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .header("Content-Type", "application/json")
            .bearer_auth(&self.api_key)
            .body(request_json)
            .send()
            .await
            .context("Failed to send request to chat completions API")?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .context("Failed to read chat completion response body")?;

        tracing::debug!("[OpenAI] Response status: {}", status);
        tracing::debug!("[OpenAI] Response body: {}", response_text);

        if !status.is_success() {
            tracing::error!("[OpenAI] API error: {} - {}", status, response_text);
            anyhow::bail!("Chat completions API error ({}): {}", status, response_text);
        }

        let reply = Self::extract_reply(&response_text)?;
        tracing::info!("[OpenAI] Received reply, length: {} chars", reply.len());

        Ok(reply)
    }

    fn provider_name(&self) -> &str {
        "openai"
    }
}

// Keys must never reach the logs.
impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("api_key", &"<redacted>")
            .field("api_base", &self.api_base)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn completion_body(text: &str) -> serde_json::Value {
        json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "choices": [
                {
                    "index": 0,
                    "message": {"role": "assistant", "content": text},
                    "finish_reason": "stop"
                }
            ]
        })
    }

    #[test]
    fn test_request_omits_unset_max_tokens() {
        let messages = vec![Message::user("hi")];
        let request = ChatCompletionRequest {
            model: "gpt-4o",
            messages: &messages,
            max_tokens: None,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({"model": "gpt-4o", "messages": [{"role": "user", "content": "hi"}]})
        );
    }

    #[test]
    fn test_extract_reply_requires_content() {
        assert!(OpenAiProvider::extract_reply(r#"{"choices": []}"#).is_err());
        assert!(OpenAiProvider::extract_reply("not json").is_err());
        assert_eq!(
            OpenAiProvider::extract_reply(&completion_body("4").to_string()).unwrap(),
            "4"
        );
    }

    #[test]
    fn test_completions_url() {
        assert_eq!(
            OpenAiProvider::completions_url("http://localhost:1234/v1/"),
            "http://localhost:1234/v1/chat/completions"
        );
    }

    #[tokio::test]
    async fn test_complete_round_trip() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "gpt-4o-mini",
                "max_tokens": 64,
                "messages": [
                    {"role": "system", "content": "You are terse."},
                    {"role": "user", "content": "2+2?"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("4")))
            .expect(1)
            .mount(&server)
            .await;

        let provider =
            OpenAiProvider::new("sk-test").with_base_url(format!("{}/v1", server.uri()));
        let reply = provider
            .complete(
                &[Message::system("You are terse."), Message::user("2+2?")],
                "gpt-4o-mini",
                Some(64),
            )
            .await
            .unwrap();

        assert_eq!(reply, "4");
    }

    #[tokio::test]
    async fn test_error_status_is_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let provider = OpenAiProvider::new("sk-test").with_base_url(server.uri());
        let err = provider
            .complete(&[Message::user("hello")], "gpt-4o", None)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("429"));
    }

    #[test]
    fn test_debug_redacts_key() {
        let provider = OpenAiProvider::new("sk-secret").with_base_url("http://gateway/v1/");
        let printed = format!("{:?}", provider);
        assert!(!printed.contains("sk-secret"));
        assert!(printed.contains("<redacted>"));
        assert!(printed.contains("http://gateway/v1\""));
    }
}
