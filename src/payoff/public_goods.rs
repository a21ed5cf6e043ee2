use serde::Serialize;

use super::{PayoffDescription, PayoffRule};
use crate::config::{PublicGoodsConfig, Strategies};
use crate::error::{GameError, Result};

/// Public goods formula.
///
/// With `c` contributors out of `n` agents, cost `k` and multiplier `m`, every agent receives
/// `c * k * m / n`, and contributors additionally pay `k`. Payoffs only depend on `c`, so the
/// combination key is the contributor count. Multipliers below 1 give contributors a negative
/// payoff even under full cooperation; this is not clamped.
#[derive(Debug, Clone)]
pub struct PublicGoodsPayoff {
    strategies: Strategies,
    contribute: String,
    contribution_cost: f64,
    multiplication_factor: f64,
    num_agents: usize,
}

/// Reference outcomes quoted in prompts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkedExamples {
    /// Sum of all contributions when everybody contributes
    pub total_if_all_contribute: f64,
    /// Share each agent receives when everybody contributes
    pub payoff_if_all_contribute: f64,
    /// That share minus the contribution
    pub net_gain_if_all_contribute: f64,
    /// Share each agent receives from a single contribution
    pub solo_contribution_return: f64,
    /// What a lone contributor ends up with
    pub solo_contribution_net: f64,
}

impl PublicGoodsPayoff {
    /// The first strategy (`strategy1`) means "contribute", every other one "free-ride".
    ///
    /// # Errors
    /// [`GameError::InvalidConfiguration`] for an empty population, a negative or non finite
    /// cost or multiplier, or no strategies.
    pub fn new(params: PublicGoodsConfig, strategies: Strategies) -> Result<Self> {
        if params.num_agents == 0 {
            return Err(GameError::invalid("numAgents must be at least 1"));
        }
        if !params.contribution_cost.is_finite() || params.contribution_cost < 0.0 {
            return Err(GameError::invalid(format!(
                "contributionCost must be a non-negative number, got {}",
                params.contribution_cost
            )));
        }
        if !params.multiplication_factor.is_finite() || params.multiplication_factor < 0.0 {
            return Err(GameError::invalid(format!(
                "multiplicationFactor must be a non-negative number, got {}",
                params.multiplication_factor
            )));
        }
        let contribute = strategies
            .iter()
            .next()
            .map(|s| s.key.clone())
            .ok_or_else(|| GameError::invalid("public goods game without strategies"))?;

        Ok(Self {
            strategies,
            contribute,
            contribution_cost: params.contribution_cost,
            multiplication_factor: params.multiplication_factor,
            num_agents: params.num_agents,
        })
    }

    /// Payoff of one agent, given whether it contributed and how many agents did.
    pub fn calculate_payoff(&self, contributed: bool, num_contributors: usize) -> f64 {
        let pool = num_contributors as f64 * self.contribution_cost * self.multiplication_factor;
        let share = pool / self.num_agents as f64;
        if contributed {
            share - self.contribution_cost
        } else {
            share
        }
    }

    /// Number of contributors among `choices`.
    pub fn contributors(&self, choices: &[String]) -> usize {
        choices.iter().filter(|c| **c == self.contribute).count()
    }

    /// Strategy key meaning "contribute".
    pub fn contribute_strategy(&self) -> &str {
        &self.contribute
    }

    /// Everybody-contributes and lone-contributor outcomes.
    pub fn worked_examples(&self) -> WorkedExamples {
        let n = self.num_agents as f64;
        let k = self.contribution_cost;
        let m = self.multiplication_factor;

        let total_if_all_contribute = k * n;
        let payoff_if_all_contribute = total_if_all_contribute * m / n;
        let solo_contribution_return = k * m / n;
        WorkedExamples {
            total_if_all_contribute,
            payoff_if_all_contribute,
            net_gain_if_all_contribute: payoff_if_all_contribute - k,
            solo_contribution_return,
            solo_contribution_net: solo_contribution_return - k,
        }
    }
}

impl PayoffRule for PublicGoodsPayoff {
    fn strategies(&self) -> &Strategies {
        &self.strategies
    }

    fn payoffs(&self, choices: &[String]) -> Result<Vec<f64>> {
        if choices.len() != self.num_agents
            || choices.iter().any(|c| !self.strategies.contains_key(c))
        {
            return Err(GameError::UnknownCombination {
                choices: choices.to_vec(),
            });
        }
        let contributors = self.contributors(choices);
        Ok(choices
            .iter()
            .map(|c| self.calculate_payoff(*c == self.contribute, contributors))
            .collect())
    }

    fn combination_key(&self, choices: &[String]) -> Result<String> {
        Ok(format!(
            "combination_{}_contributors",
            self.contributors(choices)
        ))
    }

    fn describe(&self) -> PayoffDescription {
        PayoffDescription::PublicGoods {
            contribution_cost: self.contribution_cost,
            multiplication_factor: self.multiplication_factor,
            num_agents: self.num_agents,
            contribute_strategy: self.contribute.clone(),
        }
    }

    fn prompt_values(&self) -> Vec<(&'static str, String)> {
        let ex = self.worked_examples();
        vec![
            ("contributionCost", self.contribution_cost.to_string()),
            ("multiplicationFactor", self.multiplication_factor.to_string()),
            ("numAgents", self.num_agents.to_string()),
            ("totalIfAllContribute", ex.total_if_all_contribute.to_string()),
            ("payoffIfAllContribute", ex.payoff_if_all_contribute.to_string()),
            ("netGainIfAllContribute", ex.net_gain_if_all_contribute.to_string()),
            ("soloContributionReturn", ex.solo_contribution_return.to_string()),
            ("soloContributionNet", ex.solo_contribution_net.to_string()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn strategies() -> Strategies {
        let labels = BTreeMap::from([
            ("strategy1".to_string(), "Contribute".to_string()),
            ("strategy2".to_string(), "Free-ride".to_string()),
        ]);
        Strategies::new(&labels)
    }

    fn game(k: f64, m: f64, n: usize) -> PublicGoodsPayoff {
        let params = PublicGoodsConfig {
            contribution_cost: k,
            multiplication_factor: m,
            num_agents: n,
        };
        PublicGoodsPayoff::new(params, strategies()).unwrap()
    }

    fn keys(choices: &[&str]) -> Vec<String> {
        choices.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn all_contribute() {
        assert_eq!(game(10.0, 2.0, 4).calculate_payoff(true, 4), 10.0);
    }

    #[test]
    fn nobody_contributes() {
        assert_eq!(game(10.0, 2.0, 4).calculate_payoff(false, 0), 0.0);
        assert_eq!(game(3.0, 0.5, 7).calculate_payoff(false, 0), 0.0);
    }

    #[test]
    fn solo_contributor() {
        let g = game(10.0, 2.0, 4);
        assert_eq!(g.calculate_payoff(true, 1), -5.0);
        assert_eq!(g.calculate_payoff(false, 1), 5.0);
    }

    #[test]
    fn two_contributors() {
        let g = game(10.0, 2.0, 4);
        assert_eq!(g.calculate_payoff(true, 2), 0.0);
        assert_eq!(g.calculate_payoff(false, 2), 10.0);
    }

    #[test]
    fn weights_from_labels() {
        let g = game(10.0, 2.0, 4);
        let payoffs = g
            .weights_for_combination(&["Contribute", "Contribute", "Free-ride", "Free-ride"])
            .unwrap();
        assert_eq!(payoffs, vec![0.0, 0.0, 10.0, 10.0]);
    }

    #[test]
    fn unknown_label_is_rejected() {
        let g = game(10.0, 2.0, 4);
        assert!(g
            .weights_for_combination(&["Contribute", "Defect", "Free-ride", "Free-ride"])
            .is_err());
    }

    #[test]
    fn unknown_strategy_is_an_unknown_combination() {
        let g = game(10.0, 2.0, 4);
        let err = g
            .payoffs(&keys(&["strategy1", "strategy9", "strategy1", "strategy1"]))
            .unwrap_err();
        assert!(matches!(err, GameError::UnknownCombination { .. }));
    }

    #[test]
    fn width_must_match_population() {
        let g = game(10.0, 2.0, 4);
        assert!(matches!(
            g.weights_for_combination(&["Contribute", "Free-ride"]),
            Err(GameError::UnknownCombination { ref choices }) if choices.len() == 2
        ));
        assert!(g.payoffs(&keys(&["strategy1"; 5])).is_err());
    }

    #[test]
    fn key_counts_contributors() {
        let g = game(10.0, 2.0, 4);
        let key = g
            .combination_key(&keys(&["strategy1", "strategy1", "strategy2", "strategy2"]))
            .unwrap();
        assert_eq!(key, "combination_2_contributors");
        assert_eq!(
            g.combination_key(&keys(&["strategy1", "strategy2"])).unwrap(),
            g.combination_key(&keys(&["strategy2", "strategy1"])).unwrap()
        );
    }

    #[test]
    fn low_multiplier_is_not_clamped() {
        let g = game(10.0, 0.5, 4);
        assert!(g.calculate_payoff(true, 4) < 0.0);
        assert_eq!(g.calculate_payoff(true, 4), -5.0);
    }

    #[test]
    fn invalid_parameters() {
        let params = |k: f64, m: f64, n: usize| PublicGoodsConfig {
            contribution_cost: k,
            multiplication_factor: m,
            num_agents: n,
        };
        assert!(PublicGoodsPayoff::new(params(10.0, 2.0, 0), strategies()).is_err());
        assert!(PublicGoodsPayoff::new(params(-1.0, 2.0, 4), strategies()).is_err());
        assert!(PublicGoodsPayoff::new(params(10.0, f64::NAN, 4), strategies()).is_err());
        assert!(PublicGoodsPayoff::new(params(10.0, 2.0, 4), Strategies::default()).is_err());
    }

    #[test]
    fn worked_examples_match_formula() {
        let g = game(10.0, 2.0, 4);
        let ex = g.worked_examples();
        assert_eq!(ex.total_if_all_contribute, 40.0);
        assert_eq!(ex.payoff_if_all_contribute, 20.0);
        assert_eq!(ex.net_gain_if_all_contribute, g.calculate_payoff(true, 4));
        assert_eq!(ex.solo_contribution_return, 5.0);
        assert_eq!(ex.solo_contribution_net, g.calculate_payoff(true, 1));
    }

    #[test]
    fn prompt_values_are_plain_numbers() {
        let values: BTreeMap<_, _> = game(10.0, 2.0, 4).prompt_values().into_iter().collect();
        assert_eq!(values["contributionCost"], "10");
        assert_eq!(values["multiplicationFactor"], "2");
        assert_eq!(values["soloContributionNet"], "-5");
    }
}
