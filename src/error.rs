//! Error taxonomy of the simulator.
//!
//! [`GameError`] is what every public operation returns. Provider attempts are classified with
//! [`ProviderError`] first; only the fatal class ever leaves a connector, the two transient
//! classes are retried in place (see [`crate::connector::Retrying`]).

use thiserror::Error;

use crate::game::StopReason;

/// Shorthand used across the crate.
pub type Result<T> = std::result::Result<T, GameError>;

/// Fatal errors. Each one aborts the current game run.
#[derive(Debug, Error)]
pub enum GameError {
    /// Provider credential missing or blank. Raised when the connector is built.
    #[error("missing credential for {provider}: {reason}")]
    Authentication {
        /// Provider name (`openai`, `anthropic`, ...)
        provider: String,
        /// Why the credential was rejected
        reason: String,
    },

    /// A provider failure that must not be retried.
    #[error("{provider} request failed: {message}")]
    FatalProvider {
        /// Provider name
        provider: String,
        /// Error reported by the provider or the HTTP layer
        message: String,
    },

    /// The choices of a round have no payoff: a static table has no entry for them, a
    /// strategy is unknown, or their count differs from the number of agents.
    #[error("no payoff entry for combination [{}]", .choices.join(", "))]
    UnknownCombination {
        /// Choices of the round, in agent order
        choices: Vec<String>,
    },

    /// An agent's reply does not name any configured strategy.
    #[error("could not parse a strategy from {agent}'s reply: {reply:?}")]
    UnparsableChoice {
        /// Agent name
        agent: String,
        /// Raw reply
        reply: String,
    },

    /// Rejected configuration, raised before any round is played.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A round was requested from a game that already finished.
    #[error("game already finished: {0:?}")]
    GameFinished(StopReason),
}

impl GameError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        GameError::InvalidConfiguration(msg.into())
    }
}

/// Outcome of a single failed provider attempt.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// HTTP 429 or equivalent. Retried with exponential backoff.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Timeout, connection failure or server-side fault. Retried with a constant delay.
    #[error("transient failure: {0}")]
    Transient(String),

    /// Anything else. Never retried.
    #[error("{0}")]
    Fatal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_combination_lists_choices() {
        let err = GameError::UnknownCombination {
            choices: vec!["strategy1".into(), "strategy2".into()],
        };
        assert_eq!(
            err.to_string(),
            "no payoff entry for combination [strategy1, strategy2]"
        );
    }

    #[test]
    fn finished_game_names_its_outcome() {
        let err = GameError::GameFinished(StopReason::Completed);
        assert_eq!(err.to_string(), "game already finished: Completed");
    }
}
