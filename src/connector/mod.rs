//! Connectors: send a prompt to a text-generation provider, get the reply back.
//!
//! Every provider only implements a single attempt ([`Provider::complete`]) and classifies its
//! failure as a [`ProviderError`]. The retry behaviour is shared and lives in [`Retrying`]:
//!
//! - rate limits are retried forever, waiting `min(base_delay * 2^attempt, max_backoff)`
//! - other transient failures are retried forever, waiting `base_delay`
//! - fatal failures are returned at once as [`GameError::FatalProvider`]
//!
//! The attempt counter is local to one [`Connector::send`] call and shared by both transient
//! classes. Backoff sleeps block the calling thread and cannot be cancelled: put a watchdog
//! around the whole run if a bounded run time is needed.

use std::time::Duration;

use tracing::{error, warn};

use crate::config::{AgentSpec, ProviderKind};
use crate::configuration::Configuration;
use crate::error::{GameError, ProviderError, Result};

mod anthropic;
mod http;
mod mistral;
mod openai;
mod scripted;

pub use anthropic::Anthropic;
pub use mistral::Mistral;
pub use openai::OpenAi;
pub use scripted::ScriptedConnector;

/// What an agent uses to take decisions.
pub trait Connector {
    /// Send `prompt` and return the text reply.
    ///
    /// # Errors
    /// Only non-transient failures are returned; transient ones are retried internally.
    fn send(&mut self, prompt: &str) -> Result<String>;
}

impl<C: Connector + ?Sized> Connector for Box<C> {
    fn send(&mut self, prompt: &str) -> Result<String> {
        (**self).send(prompt)
    }
}

/// A single, non-retried request to a provider.
pub trait Provider {
    /// Provider name used in logs and errors.
    fn name(&self) -> &str;

    /// Perform one request.
    fn complete(&self, prompt: &str) -> std::result::Result<String, ProviderError>;
}

/// Delays used between retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Wait after a transient failure, and first wait after a rate limit.
    pub base_delay: Duration,
    /// Upper bound of the rate limit backoff.
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// Create a policy. `max_backoff` is raised to `base_delay` if lower.
    pub fn new(base_delay: Duration, max_backoff: Duration) -> Self {
        Self {
            base_delay,
            max_backoff: max_backoff.max(base_delay),
        }
    }

    /// `min(base_delay * 2^attempt, max_backoff)`, saturating.
    pub fn rate_limit_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor).min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(60))
    }
}

/// Retry state of one `send` call.
#[derive(Debug)]
pub struct Backoff {
    policy: RetryPolicy,
    attempt: u32,
}

impl Backoff {
    /// Fresh state, attempt counter at zero.
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy, attempt: 0 }
    }

    /// Number of retried failures so far.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Delay to wait after a rate limit.
    pub fn on_rate_limit(&mut self) -> Duration {
        let delay = self.policy.rate_limit_delay(self.attempt);
        self.attempt = self.attempt.saturating_add(1);
        delay
    }

    /// Delay to wait after any other transient failure.
    pub fn on_transient(&mut self) -> Duration {
        self.attempt = self.attempt.saturating_add(1);
        self.policy.base_delay
    }
}

/// How the retry loop waits.
pub trait Sleeper {
    /// Block for `duration`.
    fn sleep(&mut self, duration: Duration);
}

/// Blocks the current thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Wraps a [`Provider`] with the retry policy, turning it into a [`Connector`].
pub struct Retrying<P, S = ThreadSleeper> {
    provider: P,
    policy: RetryPolicy,
    sleeper: S,
}

impl<P: Provider> Retrying<P> {
    /// Retry `provider` with `policy`, sleeping on the current thread.
    pub fn new(provider: P, policy: RetryPolicy) -> Self {
        Self::with_sleeper(provider, policy, ThreadSleeper)
    }
}

impl<P: Provider, S: Sleeper> Retrying<P, S> {
    /// Retry `provider` with `policy`, waiting through `sleeper`.
    pub fn with_sleeper(provider: P, policy: RetryPolicy, sleeper: S) -> Self {
        Self {
            provider,
            policy,
            sleeper,
        }
    }

    /// The wrapped provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }
}

impl<P: Provider, S: Sleeper> Connector for Retrying<P, S> {
    fn send(&mut self, prompt: &str) -> Result<String> {
        let mut backoff = Backoff::new(self.policy);
        loop {
            let (wait, reason) = match self.provider.complete(prompt) {
                Ok(reply) => return Ok(reply),
                Err(ProviderError::RateLimited(reason)) => (backoff.on_rate_limit(), reason),
                Err(ProviderError::Transient(reason)) => (backoff.on_transient(), reason),
                Err(ProviderError::Fatal(message)) => {
                    error!(provider = self.provider.name(), %message, "provider failure");
                    return Err(GameError::FatalProvider {
                        provider: self.provider.name().to_string(),
                        message,
                    });
                }
            };
            warn!(
                provider = self.provider.name(),
                attempt = backoff.attempt(),
                wait_ms = wait.as_millis() as u64,
                "{reason}, retrying"
            );
            self.sleeper.sleep(wait);
        }
    }
}

/// Build the connector described by a roster entry.
///
/// API keys are read from the environment here, and nowhere else.
///
/// # Errors
/// [`GameError::Authentication`] when the provider key is missing.
pub fn from_spec(spec: &AgentSpec, config: &Configuration) -> Result<Box<dyn Connector>> {
    let policy = config.retry;
    let connector: Box<dyn Connector> = match spec.provider {
        ProviderKind::OpenAi => Box::new(Retrying::new(
            OpenAi::from_env(&spec.model)?
                .with_temperature(config.temperature)
                .with_timeout(config.request_timeout)?,
            policy,
        )),
        ProviderKind::Anthropic => Box::new(Retrying::new(
            Anthropic::from_env(&spec.model)?
                .with_max_tokens(config.max_tokens)
                .with_timeout(config.request_timeout)?,
            policy,
        )),
        ProviderKind::Mistral => Box::new(Retrying::new(
            Mistral::from_env(&spec.model)?.with_timeout(config.request_timeout)?,
            policy,
        )),
        ProviderKind::Scripted => {
            if spec.replies.is_empty() {
                return Err(GameError::invalid(format!(
                    "scripted agent '{}' has no replies",
                    spec.name
                )));
            }
            Box::new(ScriptedConnector::cycling(spec.replies.clone()))
        }
    };
    Ok(connector)
}
