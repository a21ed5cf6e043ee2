//! Payoff rules: how a round's choices turn into scores.
//!
//! Two rules ship with the crate:
//! - [`TablePayoff`]: a fixed table, one named combination per possible outcome
//! - [`PublicGoodsPayoff`]: the public goods formula, computed from the number of contributors
//!
//! The rule is picked from the shape of the configuration by [`from_config`]: a
//! `publicGoodsConfig` block selects the formula, otherwise the table is used. New games plug in
//! by implementing [`PayoffRule`].

use serde::Serialize;

use crate::agent::Agent;
use crate::config::{GameConfig, Strategies};
use crate::error::{GameError, Result};

mod public_goods;
mod table;

pub use public_goods::{PublicGoodsPayoff, WorkedExamples};
pub use table::TablePayoff;

/// What a payoff rule must provide.
///
/// `choices` are strategy keys (`strategy1`, ...) in agent order. Returned payoffs are aligned
/// with `choices`, one per agent.
pub trait PayoffRule {
    /// Strategies of the game, in the game language.
    fn strategies(&self) -> &Strategies;

    /// Payoffs of a round.
    ///
    /// # Error
    /// [`GameError::UnknownCombination`] when the rule has no answer for `choices`.
    fn payoffs(&self, choices: &[String]) -> Result<Vec<f64>>;

    /// Canonical name of the round's outcome, for lookups and reports.
    fn combination_key(&self, choices: &[String]) -> Result<String>;

    /// Serializable summary of the rule's parameters.
    fn describe(&self) -> PayoffDescription;

    /// Extra `(placeholder, value)` pairs made available to prompt templates.
    fn prompt_values(&self) -> Vec<(&'static str, String)> {
        vec![]
    }

    /// Payoffs for choices given as labels (`"Contribute"`), without touching any score.
    fn weights_for_combination(&self, labels: &[&str]) -> Result<Vec<f64>> {
        let keys = labels
            .iter()
            .map(|label| {
                self.strategies()
                    .key_for_label(label)
                    .map(str::to_string)
                    .ok_or_else(|| GameError::UnknownCombination {
                        choices: labels.iter().map(|l| l.to_string()).collect(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        self.payoffs(&keys)
    }

    /// Compute the payoffs of a round and append each one to the matching agent's scores.
    ///
    /// Returns the payoffs that were attributed.
    fn attribute_scores(&self, agents: &mut [Agent], choices: &[String]) -> Result<Vec<f64>> {
        if agents.len() != choices.len() {
            return Err(GameError::UnknownCombination {
                choices: choices.to_vec(),
            });
        }
        let payoffs = self.payoffs(choices)?;
        debug_assert_eq!(payoffs.len(), agents.len());
        for (agent, payoff) in agents.iter_mut().zip(&payoffs) {
            agent.add_score(*payoff);
        }
        Ok(payoffs)
    }
}

/// Parameters of a payoff rule, as reported in game descriptions.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PayoffDescription {
    /// Fixed table
    #[serde(rename_all = "camelCase")]
    Table {
        /// One entry per combination
        entries: Vec<TableEntry>,
    },
    /// Public goods formula
    #[serde(rename_all = "camelCase")]
    PublicGoods {
        /// Cost paid by each contributor
        contribution_cost: f64,
        /// Pool multiplier
        multiplication_factor: f64,
        /// Number of agents sharing the pool
        num_agents: usize,
        /// Strategy key meaning "contribute"
        contribute_strategy: String,
    },
}

/// One row of a payoff table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableEntry {
    /// Combination name
    pub name: String,
    /// Strategy key per agent slot
    pub choices: Vec<String>,
    /// Payoff per agent slot
    pub payoffs: Vec<f64>,
}

/// Build the payoff rule for `language` from the shape of `config`.
pub fn from_config(config: &GameConfig, language: &str) -> Result<Box<dyn PayoffRule>> {
    let strategies = config.strategies(language)?;
    let num_agents = config.agents.len();
    match config.public_goods_config {
        Some(params) => {
            if params.num_agents != num_agents {
                return Err(GameError::invalid(format!(
                    "numAgents is {} but the roster has {num_agents} agents",
                    params.num_agents
                )));
            }
            Ok(Box::new(PublicGoodsPayoff::new(params, strategies)?))
        }
        None => Ok(Box::new(TablePayoff::new(
            &config.payoff_matrix,
            strategies,
            num_agents,
        )?)),
    }
}
