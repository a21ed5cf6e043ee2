use super::{PayoffDescription, PayoffRule, TableEntry};
use crate::config::{PayoffConfig, Strategies, WeightRef};
use crate::error::{GameError, Result};

/// Fixed payoff table.
///
/// Each combination lists one strategy per agent slot, so the lookup is order sensitive:
/// `[C, D]` and `[D, C]` are different combinations and usually pay differently. The
/// combination key is the configured combination name.
#[derive(Debug, Clone)]
pub struct TablePayoff {
    strategies: Strategies,
    entries: Vec<TableEntry>,
}

impl TablePayoff {
    /// Resolve `config`'s combinations and weights for a game of `num_agents` agents.
    ///
    /// # Errors
    /// [`GameError::InvalidConfiguration`] for an empty table, a combination without a payoff
    /// row (or the reverse), a row of the wrong width, an unknown weight name or strategy, or
    /// the same combination listed twice.
    pub fn new(config: &PayoffConfig, strategies: Strategies, num_agents: usize) -> Result<Self> {
        if config.combinations.is_empty() {
            return Err(GameError::invalid("payoff table has no combinations"));
        }
        if let Some(orphan) = config
            .matrix
            .keys()
            .find(|name| !config.combinations.contains_key(*name))
        {
            return Err(GameError::invalid(format!(
                "payoff row '{orphan}' has no combination"
            )));
        }

        let mut entries: Vec<TableEntry> = Vec::with_capacity(config.combinations.len());
        for (name, choices) in &config.combinations {
            if choices.len() != num_agents {
                return Err(GameError::invalid(format!(
                    "combination '{name}' has {} slots for {num_agents} agents",
                    choices.len()
                )));
            }
            if let Some(unknown) = choices.iter().find(|c| !strategies.contains_key(c)) {
                return Err(GameError::invalid(format!(
                    "combination '{name}' uses unknown strategy '{unknown}'"
                )));
            }
            if let Some(twin) = entries.iter().find(|e| e.choices == *choices) {
                return Err(GameError::invalid(format!(
                    "combinations '{}' and '{name}' are identical",
                    twin.name
                )));
            }

            let row = config
                .matrix
                .get(name)
                .ok_or_else(|| GameError::invalid(format!("no payoff row for '{name}'")))?;
            if row.len() != num_agents {
                return Err(GameError::invalid(format!(
                    "payoff row '{name}' has {} values for {num_agents} agents",
                    row.len()
                )));
            }
            let payoffs = row
                .iter()
                .map(|weight| match weight {
                    WeightRef::Value(v) => Ok(*v),
                    WeightRef::Name(w) => config
                        .weights
                        .get(w)
                        .copied()
                        .ok_or_else(|| GameError::invalid(format!("unknown weight '{w}'"))),
                })
                .collect::<Result<Vec<_>>>()?;

            entries.push(TableEntry {
                name: name.clone(),
                choices: choices.clone(),
                payoffs,
            });
        }

        Ok(Self {
            strategies,
            entries,
        })
    }

    fn lookup(&self, choices: &[String]) -> Result<&TableEntry> {
        self.entries
            .iter()
            .find(|e| e.choices == choices)
            .ok_or_else(|| GameError::UnknownCombination {
                choices: choices.to_vec(),
            })
    }
}

impl PayoffRule for TablePayoff {
    fn strategies(&self) -> &Strategies {
        &self.strategies
    }

    fn payoffs(&self, choices: &[String]) -> Result<Vec<f64>> {
        Ok(self.lookup(choices)?.payoffs.clone())
    }

    fn combination_key(&self, choices: &[String]) -> Result<String> {
        Ok(self.lookup(choices)?.name.clone())
    }

    fn describe(&self) -> PayoffDescription {
        PayoffDescription::Table {
            entries: self.entries.clone(),
        }
    }
}
