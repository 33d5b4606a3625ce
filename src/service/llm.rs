//! Language model backend behind the judge service.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::errors::LlmError;

pub const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com";
pub const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// One single-turn completion.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: &'static str,
    pub user: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Text of the first content block. May be empty.
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError>;
}

/// Anthropic Messages API.
pub struct AnthropicBackend {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl std::fmt::Debug for AnthropicBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicBackend")
            .field("api_key", &"<REDACTED>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl AnthropicBackend {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: ANTHROPIC_API_BASE.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

/// Pull `content[0].text` out of a Messages API response.
fn first_text(body: &Value) -> String {
    body.get("content")
        .and_then(|c| c.get(0))
        .and_then(|block| block.get("text"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

#[async_trait]
impl LlmBackend for AnthropicBackend {
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
        let body = json!({
            "model": self.model,
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
            "system": request.system,
            "messages": [{"role": "user", "content": request.user}],
        });

        tracing::debug!(model = %self.model, max_tokens = request.max_tokens, "Anthropic completion request");

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(LlmError::Transport)?;

        let status = response.status();
        let text = response.text().await.map_err(LlmError::Transport)?;

        if !status.is_success() {
            tracing::error!(status = %status, body = %text, "Anthropic API error");
            return Err(LlmError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: Value = serde_json::from_str(&text).map_err(|e| {
            let preview: String = text.chars().take(200).collect();
            LlmError::Malformed(format!("{}: {}", e, preview))
        })?;
        Ok(first_text(&parsed))
    }
}
