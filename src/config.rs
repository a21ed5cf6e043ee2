//! Game description, as loaded from a JSON file.
//!
//! Everything is parsed into strong types once, here. In particular flags such as
//! `nRoundsIsKnown` may be written either as JSON booleans or as `"True"` / `"false"` strings,
//! and `nRounds` either as a number or a numeric string.
//!
//! ```json
//! {
//!   "name": "public_goods_game",
//!   "languages": ["en"],
//!   "nRounds": 10,
//!   "nRoundsIsKnown": "True",
//!   "agentsCommunicate": false,
//!   "stopGameWhen": [["strategy2", "strategy2", "strategy2", "strategy2"]],
//!   "payoffMatrix": {
//!     "strategies": { "en": { "strategy1": "Contribute", "strategy2": "Free-ride" } }
//!   },
//!   "publicGoodsConfig": { "contributionCost": 10, "multiplicationFactor": 2.0, "numAgents": 4 },
//!   "promptTemplate": { "en": "You are {agentName}. ..." },
//!   "agents": [ { "name": "Ana", "persona": "cooperative", "provider": "openai", "model": "gpt-4o" } ]
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{GameError, Result};

/// Full description of a game, for every language it should be played in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameConfig {
    /// Game name, used in reports and file names.
    pub name: String,
    /// One game is played per language.
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,
    /// Rounds to play unless a stop condition hits first.
    #[serde(deserialize_with = "flexible_u32")]
    pub n_rounds: u32,
    /// Whether prompts disclose the number of rounds.
    #[serde(default, deserialize_with = "bool_like")]
    pub n_rounds_is_known: bool,
    /// Whether a communication phase precedes the choices.
    #[serde(default, deserialize_with = "bool_like")]
    pub agents_communicate: bool,
    /// Choice patterns (strategy keys) ending the game early.
    #[serde(default)]
    pub stop_game_when: Vec<Vec<String>>,
    /// How stop conditions are compared with a round's choices.
    #[serde(default)]
    pub stop_condition_match: StopMatch,
    /// Strategies and, for table games, the payoff table.
    pub payoff_matrix: PayoffConfig,
    /// When present the payoffs are computed with the public goods formula.
    #[serde(default)]
    pub public_goods_config: Option<PublicGoodsConfig>,
    /// Prompt template per language.
    pub prompt_template: BTreeMap<String, String>,
    /// Players, in the order they act.
    pub agents: Vec<AgentSpec>,
}

/// Strategy labels and the optional fixed payoff table.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PayoffConfig {
    /// Named weights (`"weight1": 3`).
    #[serde(default)]
    pub weights: BTreeMap<String, f64>,
    /// language -> strategy key -> label shown to agents.
    pub strategies: BTreeMap<String, BTreeMap<String, String>>,
    /// Named combinations: one strategy key per agent slot.
    #[serde(default)]
    pub combinations: BTreeMap<String, Vec<String>>,
    /// combination name -> one weight per agent slot.
    #[serde(default)]
    pub matrix: BTreeMap<String, Vec<WeightRef>>,
}

/// A payoff table cell: a weight name or a literal number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WeightRef {
    /// Literal payoff
    Value(f64),
    /// Key into [`PayoffConfig::weights`]
    Name(String),
}

/// Public goods parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicGoodsConfig {
    /// Paid by each contributor.
    pub contribution_cost: f64,
    /// Multiplies the pooled contributions.
    pub multiplication_factor: f64,
    /// Population the pool is shared between.
    pub num_agents: usize,
}

/// Stop condition comparison policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopMatch {
    /// Same choices, in any agent order.
    #[default]
    Multiset,
    /// Slot by slot; `*` matches any choice.
    Pattern,
}

/// Which backend answers for an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// OpenAI chat completions
    #[serde(rename = "openai")]
    OpenAi,
    /// Anthropic messages
    Anthropic,
    /// Mistral chat completions
    Mistral,
    /// Canned replies, no network
    Scripted,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Mistral => "mistral",
            ProviderKind::Scripted => "scripted",
        };
        f.write_str(name)
    }
}

/// One roster entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSpec {
    /// Unique name.
    pub name: String,
    /// Behavioural persona given to the model.
    #[serde(default)]
    pub persona: String,
    /// Backend.
    pub provider: ProviderKind,
    /// Model identifier at that backend.
    pub model: String,
    /// Replies of a scripted agent, cycled.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub replies: Vec<String>,
}

/// One strategy: the key used in tables and stop conditions, and its label in a language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Strategy {
    /// `strategy1`, `strategy2`, ...
    pub key: String,
    /// What agents read and answer.
    pub label: String,
}

/// The strategies of a game in one language, ordered by key.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Strategies(Vec<Strategy>);

impl Strategies {
    /// Build from `key -> label`. Keys are sorted naturally (`strategy2` before `strategy10`).
    pub fn new(labels: &BTreeMap<String, String>) -> Self {
        let mut strategies = labels
            .iter()
            .map(|(key, label)| Strategy {
                key: key.clone(),
                label: label.clone(),
            })
            .collect::<Vec<_>>();
        strategies.sort_by(|a, b| (a.key.len(), &a.key).cmp(&(b.key.len(), &b.key)));
        Self(strategies)
    }

    /// All strategies.
    pub fn iter(&self) -> impl Iterator<Item = &Strategy> {
        self.0.iter()
    }

    /// Number of strategies.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no strategy is configured.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `key` is a known strategy key.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.iter().any(|s| s.key == key)
    }

    /// Label of `key`, or the key itself when unknown.
    pub fn label<'a>(&'a self, key: &'a str) -> &'a str {
        self.0
            .iter()
            .find(|s| s.key == key)
            .map(|s| s.label.as_str())
            .unwrap_or(key)
    }

    /// Key of the strategy labelled `label` (case-insensitive).
    pub fn key_for_label(&self, label: &str) -> Option<&str> {
        let label = label.trim();
        self.0
            .iter()
            .find(|s| s.label.eq_ignore_ascii_case(label))
            .map(|s| s.key.as_str())
    }
}

impl GameConfig {
    /// Parse a JSON document.
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        let config: GameConfig =
            serde_json::from_str(json).context("malformed game configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config file {}", path.display()))?;
        Self::from_json_str(&json).with_context(|| format!("in {}", path.display()))
    }

    /// Replace the prompt template of `language`.
    pub fn with_template(mut self, language: &str, template: impl Into<String>) -> Self {
        self.prompt_template
            .insert(language.to_string(), template.into());
        self
    }

    /// Play only `language`.
    pub fn with_language(mut self, language: &str) -> Self {
        self.languages = vec![language.to_string()];
        self
    }

    /// Strategies in `language`.
    ///
    /// # Errors
    /// [`GameError::InvalidConfiguration`] when the language has no strategies.
    pub fn strategies(&self, language: &str) -> Result<Strategies> {
        let labels = self
            .payoff_matrix
            .strategies
            .get(language)
            .ok_or_else(|| GameError::invalid(format!("no strategies for language '{language}'")))?;
        let strategies = Strategies::new(labels);
        if strategies.is_empty() {
            return Err(GameError::invalid(format!(
                "empty strategy list for language '{language}'"
            )));
        }
        Ok(strategies)
    }

    /// Prompt template of `language`.
    pub fn template(&self, language: &str) -> Result<&str> {
        self.prompt_template
            .get(language)
            .map(String::as_str)
            .ok_or_else(|| GameError::invalid(format!("no prompt template for language '{language}'")))
    }

    /// Checks that do not depend on the language being played.
    pub fn validate(&self) -> Result<()> {
        if self.agents.is_empty() {
            return Err(GameError::invalid("no agents"));
        }
        if self.n_rounds == 0 {
            return Err(GameError::invalid("nRounds must be at least 1"));
        }
        if self.languages.is_empty() {
            return Err(GameError::invalid("no languages"));
        }
        let mut names = self.agents.iter().map(|a| a.name.as_str()).collect::<Vec<_>>();
        names.sort_unstable();
        if let Some(w) = names.windows(2).find(|w| w[0] == w[1]) {
            return Err(GameError::invalid(format!("duplicate agent name '{}'", w[0])));
        }
        for condition in &self.stop_game_when {
            if condition.len() != self.agents.len() {
                return Err(GameError::invalid(format!(
                    "stop condition [{}] does not have one entry per agent",
                    condition.join(", ")
                )));
            }
        }
        Ok(())
    }
}

fn default_languages() -> Vec<String> {
    vec!["en".to_string()]
}

fn bool_like<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolLike {
        Bool(bool),
        Text(String),
    }

    match BoolLike::deserialize(deserializer)? {
        BoolLike::Bool(b) => Ok(b),
        BoolLike::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(serde::de::Error::custom(format!(
                "expected a boolean, got '{other}'"
            ))),
        },
    }
}

fn flexible_u32<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<u32, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Count {
        Number(u32),
        Text(String),
    }

    match Count::deserialize(deserializer)? {
        Count::Number(n) => Ok(n),
        Count::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("expected a round count, got '{s}'"))),
    }
}
