//! Prompt construction.
//!
//! The round gathers everything an agent may see into a [`PromptContext`]; a [`PromptRenderer`]
//! turns it into text. [`TemplateRenderer`] substitutes `{placeholder}` tokens in the language
//! template of the game. Available placeholders:
//!
//! | placeholder | value |
//! |---|---|
//! | `agentName`, `persona` | the agent being prompted |
//! | `opponents` | other agents, comma separated |
//! | `currentRound` | round number, from 1 |
//! | `nRounds` | round count, or `unknown` when not disclosed |
//! | `history` | past rounds, one line each |
//! | `messages` | this round's communication so far |
//! | `phase` | `communicate` or `choose` |
//! | `strategies` | strategy labels, comma separated |
//! | `strategy1`, `strategy2`, ... | label of each strategy |
//!
//! Payoff rules may add their own (see [`PayoffRule::prompt_values`](crate::payoff::PayoffRule::prompt_values)).
//! Unknown placeholders are left untouched.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::config::Strategies;

/// Which question the agent is asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Free-form message to the other agents
    Communicate,
    /// Pick a strategy
    Choose,
}

impl Phase {
    /// Name used in templates.
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Communicate => "communicate",
            Phase::Choose => "choose",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything an agent may see when it is prompted.
#[derive(Debug, Clone)]
pub struct PromptContext<'a> {
    /// Agent being prompted
    pub agent_name: &'a str,
    /// Its persona
    pub persona: &'a str,
    /// Other agents, roster order
    pub opponents: Vec<&'a str>,
    /// From 1
    pub current_round: u32,
    /// `None` when the round count is hidden
    pub n_rounds: Option<u32>,
    /// Rendered history
    pub history: String,
    /// Rendered communication of the current round
    pub messages: String,
    /// Question asked
    pub phase: Phase,
    /// Strategies in the game language
    pub strategies: &'a Strategies,
    /// Values contributed by the payoff rule
    pub extra: Vec<(&'static str, String)>,
}

impl PromptContext<'_> {
    /// Placeholder values.
    pub fn values(&self) -> HashMap<String, String> {
        let mut values = HashMap::from([
            ("agentName".to_string(), self.agent_name.to_string()),
            ("persona".to_string(), self.persona.to_string()),
            ("opponents".to_string(), self.opponents.join(", ")),
            ("currentRound".to_string(), self.current_round.to_string()),
            (
                "nRounds".to_string(),
                self.n_rounds
                    .map_or_else(|| "unknown".to_string(), |n| n.to_string()),
            ),
            ("history".to_string(), self.history.clone()),
            ("messages".to_string(), self.messages.clone()),
            ("phase".to_string(), self.phase.to_string()),
            (
                "strategies".to_string(),
                self.strategies
                    .iter()
                    .map(|s| s.label.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
        ]);
        for strategy in self.strategies.iter() {
            values.insert(strategy.key.clone(), strategy.label.clone());
        }
        for (name, value) in &self.extra {
            values.insert(name.to_string(), value.clone());
        }
        values
    }
}

/// Turns a context into prompt text.
pub trait PromptRenderer {
    /// Build the prompt.
    fn render(&self, context: &PromptContext<'_>) -> String;
}

/// `{placeholder}` substitution in a fixed template.
#[derive(Debug, Clone)]
pub struct TemplateRenderer {
    template: String,
}

impl TemplateRenderer {
    /// Render with `template`.
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }
}

impl PromptRenderer for TemplateRenderer {
    fn render(&self, context: &PromptContext<'_>) -> String {
        substitute(&self.template, &context.values())
    }
}

fn substitute(template: &str, values: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find(['{', '}']) {
            Some(close) if after.as_bytes()[close] == b'}' => {
                let name = &after[..close];
                match values.get(name) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push('{');
                        out.push_str(name);
                        out.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            _ => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
