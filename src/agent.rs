//! Players of a game: a roster entry bound to a connector.

use std::fmt;

use serde::Serialize;

use crate::config::{AgentSpec, ProviderKind};
use crate::connector::Connector;
use crate::error::Result;

/// A player: a persona bound to a connector, plus the payoffs it collected so far.
pub struct Agent {
    pub(crate) name: String,
    pub(crate) persona: String,
    pub(crate) provider: ProviderKind,
    pub(crate) model: String,
    connector: Box<dyn Connector>,
    scores: Vec<f64>,
}

/// Value snapshot of an agent, for reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentInfo {
    /// Agent name
    pub name: String,
    /// Persona label
    pub persona: String,
    /// Backend
    pub provider: ProviderKind,
    /// Model identifier
    pub model: String,
}

impl Agent {
    /// Bind the roster entry `spec` to `connector`.
    pub fn new(spec: &AgentSpec, connector: Box<dyn Connector>) -> Agent {
        Agent {
            name: spec.name.clone(),
            persona: spec.persona.clone(),
            provider: spec.provider,
            model: spec.model.clone(),
            connector,
            scores: vec![],
        }
    }

    /// Agent name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Persona label.
    pub fn persona(&self) -> &str {
        &self.persona
    }

    /// One payoff per completed round, oldest first.
    pub fn scores(&self) -> &[f64] {
        &self.scores
    }

    /// Sum of all payoffs.
    pub fn total_score(&self) -> f64 {
        self.scores.iter().sum()
    }

    /// Snapshot of the agent's identity.
    pub fn info(&self) -> AgentInfo {
        AgentInfo {
            name: self.name.clone(),
            persona: self.persona.clone(),
            provider: self.provider,
            model: self.model.clone(),
        }
    }

    pub(crate) fn add_score(&mut self, payoff: f64) {
        self.scores.push(payoff);
    }

    pub(crate) fn ask(&mut self, prompt: &str) -> Result<String> {
        self.connector.send(prompt)
    }
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("persona", &self.persona)
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("scores", &self.scores)
            .finish_non_exhaustive()
    }
}

impl PartialEq for Agent {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Agent {}
