//! # Public Goods Sim
//!
//! Iterated multi-agent economic games, such as the Public Goods Game, where every player is a
//! large language model prompted with a persona.
//!
//! It provides:
//! - A round engine (`Game`, `GameRound`) with an optional communication phase and early stop
//!   conditions
//! - Payoff rules behind the [`PayoffRule`](crate::payoff::PayoffRule) trait: a fixed payoff
//!   table, and the public goods formula
//! - Connectors to OpenAI, Anthropic and Mistral, with a shared retry/backoff policy, plus a
//!   scripted connector for offline runs
//! - CSV and JSON export of the results
//!
//! Games are strictly sequential: within a round agents are asked one after the other, in
//! roster order, so what each agent can see is reproducible.
//!
//! # Documentation Overview
//!
//! - For the game description format, see [`config`].
//! - For runtime behavior (output, logging, retries, sampling), see
//!   [`Configuration`](crate::configuration::Configuration).
//! - For the round loop and stop conditions, see [`Game`](crate::game::Game).
//! - For providers and retries, see [`connector`].
//! - For prompt placeholders, see [`prompt`].
//!
//! # Usage Example
//!
//! ```no_run
//! use public_goods_sim::prelude::*;
//!
//! fn main() -> anyhow::Result<()> {
//!     let game = GameConfig::from_file("configs/public_goods.json")?;
//!
//!     // API keys are read from API_KEY_OPENAI, API_KEY_ANTHROPIC and API_KEY_MISTRAL
//!     let config = Configuration::from_env().with_temperature(0.7);
//!     let simulator = Simulator::new(config)?;
//!
//!     for results in simulator.run(&game)? {
//!         for score in &results.scores {
//!             println!("{}: {}", score.agent, score.total);
//!         }
//!         results.save_csv(format!("results_{}.csv", results.description.language))?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Offline agents
//!
//! Roster entries with `"provider": "scripted"` answer with their `replies`, in a loop. This
//! is how the tests drive full games, and a convenient way to try a template:
//!
//! ```
//! use public_goods_sim::prelude::*;
//!
//! let game = GameConfig::from_json_str(r#"{
//!     "name": "demo",
//!     "nRounds": 2,
//!     "payoffMatrix": {"strategies": {"en": {"strategy1": "Contribute", "strategy2": "Free-ride"}}},
//!     "publicGoodsConfig": {"contributionCost": 10, "multiplicationFactor": 2, "numAgents": 2},
//!     "promptTemplate": {"en": "{agentName}: {strategy1} or {strategy2}?"},
//!     "agents": [
//!         {"name": "Ana", "provider": "scripted", "model": "-", "replies": ["Contribute"]},
//!         {"name": "Bo", "provider": "scripted", "model": "-", "replies": ["Free-ride"]}
//!     ]
//! }"#).unwrap();
//!
//! let mut game = Game::from_config(&game, "en", &Configuration::new()).unwrap();
//! game.run().unwrap();
//! let scores: Vec<f64> = game.agents().iter().map(|a| a.total_score()).collect();
//! assert_eq!(scores, vec![0.0, 20.0]);
//! ```
#![warn(missing_docs)]

pub mod agent;
pub mod config;
pub mod configuration;
pub mod connector;
pub mod error;
pub mod game;
pub mod history;
mod logger;
pub mod payoff;
pub mod prompt;
pub mod results;
pub mod round;
pub mod simulator;

pub use anyhow;
pub use error::{GameError, ProviderError};
pub use logger::{init_logger, init_stderr_logger};
pub use results::GameResults;

/// Commonly used types and traits for quick access.
///
/// Import this prelude to get started easily:
/// ```rust
/// use public_goods_sim::prelude::*;
/// ```
///
/// Includes:
/// - [`GameConfig`](crate::config::GameConfig) and [`Configuration`](crate::configuration::Configuration)
/// - [`Game`](crate::game::Game) and [`Simulator`](crate::simulator::Simulator)
/// - the [`Connector`](crate::connector::Connector) and [`PayoffRule`](crate::payoff::PayoffRule) traits
pub mod prelude {
    pub use crate::agent::Agent;
    pub use crate::config::GameConfig;
    pub use crate::configuration::Configuration;
    pub use crate::connector::{Connector, RetryPolicy, ScriptedConnector};
    pub use crate::error::GameError;
    pub use crate::game::{Game, GameStatus, StopReason};
    pub use crate::payoff::PayoffRule;
    pub use crate::prompt::{PromptRenderer, TemplateRenderer};
    pub use crate::simulator::Simulator;
}
