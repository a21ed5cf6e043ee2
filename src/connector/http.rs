use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::StatusCode;
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::error::{GameError, ProviderError, Result};

/// Longest provider error body kept in messages.
const MAX_ERROR_BODY: usize = 512;

pub(super) fn client(provider: &str, timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| GameError::FatalProvider {
            provider: provider.to_string(),
            message: format!("cannot build HTTP client: {e}"),
        })
}

/// Rejects absent or blank keys.
pub(super) fn require_key(provider: &str, api_key: String) -> Result<String> {
    if api_key.trim().is_empty() {
        return Err(GameError::Authentication {
            provider: provider.to_string(),
            reason: "empty API key".to_string(),
        });
    }
    Ok(api_key)
}

pub(super) fn key_from_env(provider: &str, var: &str) -> Result<String> {
    let key = std::env::var(var).map_err(|_| GameError::Authentication {
        provider: provider.to_string(),
        reason: format!("{var} not found in environment variables"),
    })?;
    require_key(provider, key)
}

pub(super) fn header(value: &str) -> std::result::Result<HeaderValue, ProviderError> {
    HeaderValue::from_str(value)
        .map_err(|e| ProviderError::Fatal(format!("invalid header value: {e}")))
}

pub(super) fn post_json<B: Serialize, R: DeserializeOwned>(
    http: &Client,
    url: &str,
    headers: HeaderMap,
    body: &B,
) -> std::result::Result<R, ProviderError> {
    debug!(url, "provider request");

    let response = http
        .post(url)
        .headers(headers)
        .json(body)
        .send()
        .map_err(classify_transport)?;

    let status = response.status();
    if !status.is_success() {
        let text = response.text().unwrap_or_default();
        return Err(classify_status(status, &text));
    }

    response
        .json::<R>()
        .map_err(|e| ProviderError::Fatal(format!("undecodable response: {e}")))
}

pub(super) fn classify_status(status: StatusCode, body: &str) -> ProviderError {
    let message = format!(
        "HTTP {status}: {}",
        truncate_to_char_boundary(body.trim(), MAX_ERROR_BODY)
    );
    match status.as_u16() {
        429 => ProviderError::RateLimited(message),
        // 529 is anthropic's "overloaded"
        408 | 500..=599 => ProviderError::Transient(message),
        _ => ProviderError::Fatal(message),
    }
}

fn classify_transport(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() || err.is_connect() || err.is_request() {
        ProviderError::Transient(err.to_string())
    } else {
        ProviderError::Fatal(err.to_string())
    }
}

fn truncate_to_char_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) && end > 0 {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_are_classified() {
        let class = |code: u16| classify_status(StatusCode::from_u16(code).unwrap(), "");
        assert!(matches!(class(429), ProviderError::RateLimited(_)));
        assert!(matches!(class(500), ProviderError::Transient(_)));
        assert!(matches!(class(503), ProviderError::Transient(_)));
        assert!(matches!(class(529), ProviderError::Transient(_)));
        assert!(matches!(class(408), ProviderError::Transient(_)));
        assert!(matches!(class(400), ProviderError::Fatal(_)));
        assert!(matches!(class(401), ProviderError::Fatal(_)));
        assert!(matches!(class(404), ProviderError::Fatal(_)));
    }

    #[test]
    fn long_bodies_are_cut() {
        let body = "é".repeat(MAX_ERROR_BODY);
        let ProviderError::Fatal(msg) = classify_status(StatusCode::BAD_REQUEST, &body) else {
            panic!("400 must be fatal");
        };
        assert!(msg.len() < body.len());
    }

    #[test]
    fn blank_key_is_rejected() {
        let err = require_key("openai", "   ".into()).unwrap_err();
        assert!(matches!(err, GameError::Authentication { .. }));
        assert_eq!(require_key("openai", "sk-1".into()).unwrap(), "sk-1");
    }

    #[test]
    fn missing_env_key_is_rejected() {
        let err = key_from_env("openai", "SIM_TEST_SURELY_UNSET_KEY").unwrap_err();
        assert!(err.to_string().contains("SIM_TEST_SURELY_UNSET_KEY"));
    }
}
