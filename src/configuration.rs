//! Config for the simulator behaviors
//!
//! This module provides the knobs that are not part of a game description: output, logging,
//! retry pacing and sampling parameters sent to the providers.
//!
//! Configuration can be created programmatically using [`Configuration::new()`] or by reading
//! environment variables using [`Configuration::from_env()`].
//!
//! # Environment Variables
//!
//! All values are optional. Flags are case-insensitive, set them to `"true"` to enable.
//! Unparsable numbers fall back to the default.
//!
//! - `SIM_VERBOSE`: print game progress to stdout (default: `true`)
//! - `SIM_LOG`: log to a file (default: `false`)
//! - `SIM_RETRY_BASE_MS`: first retry delay, and the delay after transient errors (default: `1000`)
//! - `SIM_RETRY_MAX_BACKOFF_MS`: ceiling of the rate-limit backoff (default: `60000`)
//! - `SIM_TEMPERATURE`: sampling temperature (default: `1.0`)
//! - `SIM_MAX_TOKENS`: reply length limit, for providers that require one (default: `1024`)
//! - `SIM_REQUEST_TIMEOUT_SECS`: per request timeout (default: `120`)

use std::str::FromStr;
use std::time::Duration;

use crate::connector::RetryPolicy;

/// Configuration for simulator behaviors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Configuration {
    pub(crate) verbose: bool,
    pub(crate) log: bool,
    pub(crate) retry: RetryPolicy,
    pub(crate) temperature: f32,
    pub(crate) max_tokens: u32,
    pub(crate) request_timeout: Duration,
}

impl Configuration {
    /// Create a new configuration with default parameters.
    ///
    /// By default:
    /// - The simulator prints game progress to stdout.
    /// - Logging to file is disabled.
    /// - Retries start at 1s and back off up to 60s.
    /// - Temperature is 1.0, replies are capped at 1024 tokens, requests time out after 120s.
    pub fn new() -> Self {
        Self {
            verbose: true,
            log: false,
            retry: RetryPolicy::default(),
            temperature: 1.0,
            max_tokens: 1024,
            request_timeout: Duration::from_secs(120),
        }
    }

    /// Create configuration from environment variables.
    ///
    /// Any missing or unparsable variable leaves the corresponding default in place.
    pub fn from_env() -> Self {
        fn get_env_flag(var: &str, default: bool) -> bool {
            match std::env::var(var) {
                Ok(val) => val.eq_ignore_ascii_case("true"),
                Err(_) => default,
            }
        }

        fn get_env_value<T: FromStr>(var: &str, default: T) -> T {
            std::env::var(var)
                .ok()
                .and_then(|val| val.trim().parse().ok())
                .unwrap_or(default)
        }

        let defaults = Self::new();
        let retry = RetryPolicy::new(
            Duration::from_millis(get_env_value(
                "SIM_RETRY_BASE_MS",
                defaults.retry.base_delay.as_millis() as u64,
            )),
            Duration::from_millis(get_env_value(
                "SIM_RETRY_MAX_BACKOFF_MS",
                defaults.retry.max_backoff.as_millis() as u64,
            )),
        );

        Self {
            verbose: get_env_flag("SIM_VERBOSE", defaults.verbose),
            log: get_env_flag("SIM_LOG", defaults.log),
            retry,
            temperature: get_env_value("SIM_TEMPERATURE", defaults.temperature),
            max_tokens: get_env_value("SIM_MAX_TOKENS", defaults.max_tokens),
            request_timeout: Duration::from_secs(get_env_value(
                "SIM_REQUEST_TIMEOUT_SECS",
                defaults.request_timeout.as_secs(),
            )),
        }
    }

    /// Enable or disable progress output.
    pub fn with_verbose(mut self, value: bool) -> Self {
        self.verbose = value;
        self
    }

    /// Enable or disable logging to file.
    pub fn with_log(mut self, value: bool) -> Self {
        self.log = value;
        self
    }

    /// Set the retry pacing of every connector.
    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, value: f32) -> Self {
        self.temperature = value;
        self
    }

    /// Set the reply length limit.
    pub fn with_max_tokens(mut self, value: u32) -> Self {
        self.max_tokens = value;
        self
    }

    /// Set the per request timeout.
    pub fn with_request_timeout(mut self, value: Duration) -> Self {
        self.request_timeout = value;
        self
    }

    /// Retry pacing.
    pub fn retry(&self) -> RetryPolicy {
        self.retry
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self::new()
    }
}
