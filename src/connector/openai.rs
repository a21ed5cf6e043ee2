use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use super::{http, Provider};
use crate::error::{ProviderError, Result};

const OPENAI_API_URL: &str = "https://api.openai.com/v1";
const PROVIDER: &str = "openai";

/// OpenAI chat completions.
pub struct OpenAi {
    api_key: String,
    model: String,
    temperature: f32,
    base_url: String,
    http: Client,
}

impl OpenAi {
    /// Environment variable holding the key.
    pub const API_KEY_VAR: &'static str = "API_KEY_OPENAI";

    /// # Errors
    /// [`crate::GameError::Authentication`] if `api_key` is blank.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        Ok(Self {
            api_key: http::require_key(PROVIDER, api_key.into())?,
            model: model.into(),
            temperature: 1.0,
            base_url: OPENAI_API_URL.to_string(),
            http: http::client(PROVIDER, Duration::from_secs(120))?,
        })
    }

    /// Read the key from [`Self::API_KEY_VAR`].
    pub fn from_env(model: impl Into<String>) -> Result<Self> {
        Self::new(http::key_from_env(PROVIDER, Self::API_KEY_VAR)?, model)
    }

    /// Point at another endpoint (proxy, local mock).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sampling temperature, `1.0` unless set.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Per-request timeout. A timeout counts as a transient failure.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.http = http::client(PROVIDER, timeout)?;
        Ok(self)
    }

    /// Model identifier sent with each request.
    pub fn model(&self) -> &str {
        &self.model
    }

    fn headers(&self) -> std::result::Result<HeaderMap, ProviderError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            http::header(&format!("Bearer {}", self.api_key))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

impl Provider for OpenAi {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn complete(&self, prompt: &str) -> std::result::Result<String, ProviderError> {
        let request = ChatRequest {
            model: &self.model,
            temperature: Some(self.temperature),
            messages: vec![WireMessage::user(prompt)],
        };
        let url = format!("{}/chat/completions", self.base_url);
        let response: ChatResponse = http::post_json(&self.http, &url, self.headers()?, &request)?;
        response.text()
    }
}

// Mistral speaks the same dialect.

#[derive(Debug, Serialize)]
pub(super) struct ChatRequest<'a> {
    pub model: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    pub messages: Vec<WireMessage<'a>>,
}

#[derive(Debug, Serialize)]
pub(super) struct WireMessage<'a> {
    pub role: &'static str,
    pub content: &'a str,
}

impl<'a> WireMessage<'a> {
    pub fn user(content: &'a str) -> Self {
        Self {
            role: "user",
            content,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub(super) struct Choice {
    pub message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
pub(super) struct ResponseMessage {
    pub content: Option<String>,
}

impl ChatResponse {
    pub fn text(self) -> std::result::Result<String, ProviderError> {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ProviderError::Fatal("response has no content".to_string()))
    }
}
