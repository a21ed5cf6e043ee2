use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use super::openai::WireMessage;
use super::{http, Provider};
use crate::error::{ProviderError, Result};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const PROVIDER: &str = "anthropic";

/// Anthropic messages API.
pub struct Anthropic {
    api_key: String,
    model: String,
    max_tokens: u32,
    base_url: String,
    http: Client,
}

impl Anthropic {
    /// Environment variable holding the key.
    pub const API_KEY_VAR: &'static str = "API_KEY_ANTHROPIC";

    /// # Errors
    /// [`crate::GameError::Authentication`] if `api_key` is blank.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        Ok(Self {
            api_key: http::require_key(PROVIDER, api_key.into())?,
            model: model.into(),
            max_tokens: 1024,
            base_url: ANTHROPIC_API_URL.to_string(),
            http: http::client(PROVIDER, Duration::from_secs(120))?,
        })
    }

    /// Read the key from [`Self::API_KEY_VAR`].
    pub fn from_env(model: impl Into<String>) -> Result<Self> {
        Self::new(http::key_from_env(PROVIDER, Self::API_KEY_VAR)?, model)
    }

    /// Point at another endpoint.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Reply length cap, 1024 tokens unless set.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.http = http::client(PROVIDER, timeout)?;
        Ok(self)
    }

    fn headers(&self) -> std::result::Result<HeaderMap, ProviderError> {
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", http::header(&self.api_key)?);
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

impl Provider for Anthropic {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn complete(&self, prompt: &str) -> std::result::Result<String, ProviderError> {
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: vec![WireMessage::user(prompt)],
        };
        let url = format!("{}/messages", self.base_url);
        let response: MessagesResponse =
            http::post_json(&self.http, &url, self.headers()?, &request)?;
        response.text()
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<WireMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

impl MessagesResponse {
    fn text(self) -> std::result::Result<String, ProviderError> {
        self.content
            .into_iter()
            .find_map(|block| match block {
                ContentBlock::Text { text } => Some(text),
                ContentBlock::Other => None,
            })
            .ok_or_else(|| ProviderError::Fatal("response has no text block".to_string()))
    }
}
