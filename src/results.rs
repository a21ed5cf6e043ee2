//! Final state of a game and its export formats.
//!
//! The CSV export has one row per agent per round:
//!
//! ```text
//! game,language,round,agent,persona,model,choice,label,payoff,cumulative,combination
//! public_goods_game,en,1,Ana,cooperative,gpt-4o,strategy1,Contribute,0,0,combination_2_contributors
//! ```

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::Context;
use serde::Serialize;

use crate::game::{GameDescription, StopReason};
use crate::history::RoundRecord;

const CSV_HEADER: [&str; 11] = [
    "game",
    "language",
    "round",
    "agent",
    "persona",
    "model",
    "choice",
    "label",
    "payoff",
    "cumulative",
    "combination",
];

/// Score sequence of one agent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentScores {
    /// Agent name
    pub agent: String,
    /// One payoff per round, oldest first
    pub scores: Vec<f64>,
    /// Sum of `scores`
    pub total: f64,
}

/// Everything a finished (or aborted) game leaves behind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameResults {
    /// Setup and roster
    pub description: GameDescription,
    /// Completed rounds
    pub rounds: Vec<RoundRecord>,
    /// Final score sequences, roster order
    pub scores: Vec<AgentScores>,
    /// `None` when the game did not finish
    pub stop_reason: Option<StopReason>,
}

impl GameResults {
    /// Total of `agent`.
    pub fn total_of(&self, agent: &str) -> Option<f64> {
        self.scores.iter().find(|s| s.agent == agent).map(|s| s.total)
    }

    /// Write the per-round table.
    pub fn write_csv<W: Write>(&self, mut out: W) -> anyhow::Result<()> {
        writeln!(out, "{}", CSV_HEADER.join(","))?;
        let d = &self.description;
        let mut cumulative = vec![0.0; d.agents.len()];

        for record in &self.rounds {
            for (i, (choice, payoff)) in record.choices.iter().zip(&record.payoffs).enumerate() {
                let info = d.agents.iter().find(|a| a.name == choice.agent);
                if let Some(total) = cumulative.get_mut(i) {
                    *total += payoff;
                }
                let row = [
                    d.name.clone(),
                    d.language.clone(),
                    record.round.to_string(),
                    choice.agent.clone(),
                    info.map(|a| a.persona.clone()).unwrap_or_default(),
                    info.map(|a| a.model.clone()).unwrap_or_default(),
                    choice.strategy.clone(),
                    d.strategies.label(&choice.strategy).to_string(),
                    payoff.to_string(),
                    cumulative.get(i).copied().unwrap_or(*payoff).to_string(),
                    record.combination_key.clone(),
                ];
                let row = row.iter().map(|f| csv_field(f)).collect::<Vec<_>>();
                writeln!(out, "{}", row.join(","))?;
            }
        }
        out.flush()?;
        Ok(())
    }

    /// Write the per-round table to `path`.
    pub fn save_csv(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        let file = File::create(path)
            .with_context(|| format!("cannot create results file {}", path.display()))?;
        self.write_csv(BufWriter::new(file))
            .with_context(|| format!("cannot write {}", path.display()))
    }

    /// Pretty-printed JSON of the whole results.
    pub fn write_json<W: Write>(&self, mut out: W) -> anyhow::Result<()> {
        serde_json::to_writer_pretty(&mut out, self)?;
        writeln!(out)?;
        out.flush()?;
        Ok(())
    }

    /// Write the JSON dump to `path`.
    pub fn save_json(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        let file = File::create(path)
            .with_context(|| format!("cannot create results file {}", path.display()))?;
        self.write_json(BufWriter::new(file))
            .with_context(|| format!("cannot write {}", path.display()))
    }
}

fn csv_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_only_when_needed() {
        assert_eq!(csv_field("Free-ride"), "Free-ride");
        assert_eq!(csv_field("a, b"), "\"a, b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
