//! Claude API client backing the family assistant.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

const CLAUDE_API_URL: &str = "https://api.anthropic.com/v1/messages";
const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone, Error)]
pub enum ClaudeApiError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("timeout")]
    Timeout,
    #[error("http {status}: {body}")]
    Http { status: u16, body: String },
    #[error("rate limited")]
    RateLimited,
    #[error("invalid api key")]
    InvalidApiKey,
    #[error("json error: {0}")]
    Serde(String),
    #[error("missing api key: ANTHROPIC_API_KEY environment variable not set")]
    MissingApiKey,
}

/// A single request/single response completion endpoint.
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    async fn complete(
        &self,
        system_persona: &str,
        user_message: &str,
        max_tokens: u32,
    ) -> Result<String, ClaudeApiError>;
}

/// A message in the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Request body for Claude API
#[derive(Debug, Serialize)]
struct ClaudeRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
}

/// Content block in response
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

/// Response from Claude API
#[derive(Debug, Deserialize)]
pub struct ClaudeResponse {
    pub id: String,
    pub content: Vec<ContentBlock>,
    pub model: String,
    pub stop_reason: Option<String>,
    pub usage: Usage,
}

impl ClaudeResponse {
    /// Extract the text content from the response
    pub fn text(&self) -> Option<&str> {
        self.content.iter().find_map(|block| match block {
            ContentBlock::Text { text } => Some(text.as_str()),
            ContentBlock::Other => None,
        })
    }
}

/// Token usage information
#[derive(Debug, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Claude API client
#[derive(Debug, Clone)]
pub struct ClaudeApiClient {
    http: Client,
    api_key: String,
    model: String,
}

impl ClaudeApiClient {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

    /// Create a new client using the ANTHROPIC_API_KEY environment variable
    pub fn from_env() -> Result<Self, ClaudeApiError> {
        let api_key =
            std::env::var("ANTHROPIC_API_KEY").map_err(|_| ClaudeApiError::MissingApiKey)?;
        Self::new(api_key, std::env::var("ANTHROPIC_MODEL").ok())
    }

    /// Create a new client with the given API key
    pub fn new(api_key: String, model: Option<String>) -> Result<Self, ClaudeApiError> {
        if api_key.trim().is_empty() {
            return Err(ClaudeApiError::MissingApiKey);
        }
        let http = Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .user_agent(concat!("nesti/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClaudeApiError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send one completion request. Failures are returned as-is, never retried.
    pub async fn send(
        &self,
        messages: Vec<Message>,
        system: Option<String>,
        max_tokens: u32,
    ) -> Result<ClaudeResponse, ClaudeApiError> {
        let request = ClaudeRequest {
            model: self.model.clone(),
            max_tokens,
            messages,
            system,
        };

        let res = self
            .http
            .post(CLAUDE_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        match res.status() {
            s if s.is_success() => res
                .json::<ClaudeResponse>()
                .await
                .map_err(|e| ClaudeApiError::Serde(e.to_string())),
            StatusCode::UNAUTHORIZED => Err(ClaudeApiError::InvalidApiKey),
            StatusCode::TOO_MANY_REQUESTS => Err(ClaudeApiError::RateLimited),
            s => {
                let status = s.as_u16();
                let body = res.text().await.unwrap_or_default();
                Err(ClaudeApiError::Http { status, body })
            }
        }
    }
}

#[async_trait]
impl ChatCompletion for ClaudeApiClient {
    async fn complete(
        &self,
        system_persona: &str,
        user_message: &str,
        max_tokens: u32,
    ) -> Result<String, ClaudeApiError> {
        let response = self
            .send(
                vec![Message::user(user_message)],
                Some(system_persona.to_string()),
                max_tokens,
            )
            .await?;

        debug!(
            model = %response.model,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            stop_reason = ?response.stop_reason,
            "Claude completion received"
        );

        response
            .text()
            .map(|s| s.to_string())
            .ok_or_else(|| ClaudeApiError::Serde("No text content in response".to_string()))
    }
}

/// Stand-in used when no API key is configured; every call fails so callers fall back.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredCompletion;

#[async_trait]
impl ChatCompletion for UnconfiguredCompletion {
    async fn complete(&self, _: &str, _: &str, _: u32) -> Result<String, ClaudeApiError> {
        Err(ClaudeApiError::MissingApiKey)
    }
}

fn map_reqwest_error(e: reqwest::Error) -> ClaudeApiError {
    if e.is_timeout() {
        ClaudeApiError::Timeout
    } else {
        ClaudeApiError::Transport(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_text_skips_non_text_blocks() {
        let raw = r#"{
            "id": "msg_1",
            "model": "claude-sonnet-4-20250514",
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 12, "output_tokens": 4},
            "content": [
                {"type": "thinking", "thinking": "..."},
                {"type": "text", "text": "Bonjour !"}
            ]
        }"#;
        let response: ClaudeResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.text(), Some("Bonjour !"));
    }

    #[test]
    fn test_request_omits_missing_system() {
        let request = ClaudeRequest {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 10,
            messages: vec![Message::user("hi")],
            system: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("system").is_none());
        assert_eq!(json["messages"][0]["role"], "user");
    }

    #[test]
    fn test_blank_api_key_is_rejected() {
        assert!(matches!(
            ClaudeApiClient::new("  ".to_string(), None),
            Err(ClaudeApiError::MissingApiKey)
        ));
    }
}
