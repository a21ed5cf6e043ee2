//! Ledger of completed rounds.

use std::fmt::Write as _;

use serde::Serialize;

use crate::config::Strategies;

/// One agent's decision in a round.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Choice {
    /// Agent name
    pub agent: String,
    /// Strategy key (`strategy1`, ...)
    pub strategy: String,
}

/// One line of a communication phase.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    /// Speaker
    pub agent: String,
    /// Raw reply of the speaker
    pub text: String,
}

/// A completed round. Never modified once recorded.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundRecord {
    /// Round number, starting at 1
    pub round: u32,
    /// One choice per agent, in roster order
    pub choices: Vec<Choice>,
    /// Communication phase, when the game has one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<Vec<Message>>,
    /// Payoffs aligned with `choices`
    pub payoffs: Vec<f64>,
    /// Canonical name of the outcome
    pub combination_key: String,
}

impl RoundRecord {
    /// Strategy keys in roster order.
    pub fn strategy_keys(&self) -> Vec<String> {
        self.choices.iter().map(|c| c.strategy.clone()).collect()
    }

    /// Payoff of `agent` in this round.
    pub fn payoff_of(&self, agent: &str) -> Option<f64> {
        self.choices
            .iter()
            .position(|c| c.agent == agent)
            .and_then(|i| self.payoffs.get(i).copied())
    }
}

/// Append-only sequence of [`RoundRecord`]s, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct GameHistory {
    rounds: Vec<RoundRecord>,
}

impl GameHistory {
    /// Empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded rounds, oldest first.
    pub fn rounds(&self) -> &[RoundRecord] {
        &self.rounds
    }

    /// Most recent round.
    pub fn last(&self) -> Option<&RoundRecord> {
        self.rounds.last()
    }

    /// Number of completed rounds.
    pub fn len(&self) -> usize {
        self.rounds.len()
    }

    /// True before the first round completes.
    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }

    pub(crate) fn append(&mut self, record: RoundRecord) -> &RoundRecord {
        debug_assert_eq!(record.round as usize, self.rounds.len() + 1);
        let index = self.rounds.len();
        self.rounds.push(record);
        &self.rounds[index]
    }

    /// Prompt-friendly summary of the past rounds, with strategy labels.
    ///
    /// One line per round: `Round 2: Ana chose Contribute (payoff 0), Bo chose Free-ride (payoff 10)`.
    /// Empty when no round was played.
    pub fn render(&self, strategies: &Strategies) -> String {
        let mut out = String::new();
        for record in &self.rounds {
            if !out.is_empty() {
                out.push('\n');
            }
            let _ = write!(out, "Round {}: ", record.round);
            for (i, (choice, payoff)) in record.choices.iter().zip(&record.payoffs).enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                let _ = write!(
                    out,
                    "{} chose {} (payoff {payoff})",
                    choice.agent,
                    strategies.label(&choice.strategy)
                );
            }
        }
        out
    }
}

/// Prompt-friendly rendering of a transcript, one `name: text` line per message.
pub fn render_transcript(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|m| format!("{}: {}", m.agent, m.text.trim()))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn record(round: u32, choices: &[(&str, &str)], payoffs: &[f64]) -> RoundRecord {
        RoundRecord {
            round,
            choices: choices
                .iter()
                .map(|(agent, strategy)| Choice {
                    agent: agent.to_string(),
                    strategy: strategy.to_string(),
                })
                .collect(),
            transcript: None,
            payoffs: payoffs.to_vec(),
            combination_key: String::new(),
        }
    }

    fn strategies() -> Strategies {
        Strategies::new(&BTreeMap::from([
            ("strategy1".to_string(), "Contribute".to_string()),
            ("strategy2".to_string(), "Free-ride".to_string()),
        ]))
    }

    #[test]
    fn appends_in_order() {
        let mut history = GameHistory::new();
        assert!(history.is_empty());
        history.append(record(1, &[("Ana", "strategy1")], &[1.0]));
        history.append(record(2, &[("Ana", "strategy2")], &[2.0]));
        assert_eq!(history.len(), 2);
        assert_eq!(history.rounds()[0].round, 1);
        assert_eq!(history.last().map(|r| r.round), Some(2));
        // reads are idempotent
        assert_eq!(history.rounds(), history.rounds());
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn renders_labels_and_payoffs() {
        let mut history = GameHistory::new();
        assert_eq!(history.render(&strategies()), "");
        history.append(record(
            1,
            &[("Ana", "strategy1"), ("Bo", "strategy2")],
            &[-5.0, 5.0],
        ));
        assert_eq!(
            history.render(&strategies()),
            "Round 1: Ana chose Contribute (payoff -5), Bo chose Free-ride (payoff 5)"
        );
    }

    #[test]
    fn payoff_lookup_by_name() {
        let r = record(1, &[("Ana", "strategy1"), ("Bo", "strategy2")], &[-5.0, 5.0]);
        assert_eq!(r.payoff_of("Bo"), Some(5.0));
        assert_eq!(r.payoff_of("Cy"), None);
        assert_eq!(r.strategy_keys(), vec!["strategy1", "strategy2"]);
    }

    #[test]
    fn transcript_lines() {
        let messages = vec![
            Message {
                agent: "Ana".into(),
                text: " let's all contribute \n".into(),
            },
            Message {
                agent: "Bo".into(),
                text: "sure".into(),
            },
        ];
        assert_eq!(
            render_transcript(&messages),
            "Ana: let's all contribute\nBo: sure"
        );
    }
}
