use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};

use super::openai::{ChatRequest, ChatResponse, WireMessage};
use super::{http, Provider};
use crate::error::{ProviderError, Result};

const MISTRAL_API_URL: &str = "https://api.mistral.ai/v1";
const PROVIDER: &str = "mistral";

/// Mistral chat completions (OpenAI-compatible wire format).
pub struct Mistral {
    api_key: String,
    model: String,
    base_url: String,
    http: Client,
}

impl Mistral {
    /// Environment variable holding the key.
    pub const API_KEY_VAR: &'static str = "API_KEY_MISTRAL";

    /// # Errors
    /// [`crate::GameError::Authentication`] if `api_key` is blank.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        Ok(Self {
            api_key: http::require_key(PROVIDER, api_key.into())?,
            model: model.into(),
            base_url: MISTRAL_API_URL.to_string(),
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

    /// Per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.http = http::client(PROVIDER, timeout)?;
        Ok(self)
    }
}

impl Mistral {
    fn headers(&self) -> std::result::Result<HeaderMap, ProviderError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            http::header(&format!("Bearer {}", self.api_key))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    fn request<'a>(&'a self, prompt: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            temperature: None,
            messages: vec![WireMessage::user(prompt)],
        }
    }

    fn url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

impl Provider for Mistral {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn complete(&self, prompt: &str) -> std::result::Result<String, ProviderError> {
        let response: ChatResponse =
            http::post_json(&self.http, &self.url(), self.headers()?, &self.request(prompt))?;
        response.text()
    }
}
