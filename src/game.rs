//! The game loop: rounds, early stop, final state.

use serde::Serialize;
use tracing::{info, instrument};

use crate::agent::{Agent, AgentInfo};
use crate::config::{GameConfig, PublicGoodsConfig, StopMatch, Strategies};
use crate::configuration::Configuration;
use crate::connector;
use crate::error::{GameError, Result};
use crate::history::{GameHistory, RoundRecord};
use crate::payoff::{self, PayoffDescription, PayoffRule};
use crate::prompt::{PromptRenderer, TemplateRenderer};
use crate::results::{AgentScores, GameResults};
use crate::round::{GameRound, RoundSettings};

/// Wildcard of [`StopMatch::Pattern`] stop conditions.
pub const ANY_CHOICE: &str = "*";

/// Why a game ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum StopReason {
    /// All configured rounds were played.
    Completed,
    /// A round matched a stop condition.
    #[serde(rename_all = "camelCase")]
    StopCondition {
        /// The condition that matched
        condition: Vec<String>,
        /// Round it matched in
        round: u32,
    },
}

/// Lifecycle of a [`Game`].
#[derive(Debug, Clone, PartialEq)]
pub enum GameStatus {
    /// No round played yet.
    Initialized,
    /// At least one round played, more to come.
    Running {
        /// Next round to play
        round: u32,
    },
    /// No further round will be played.
    Finished(StopReason),
}

/// Value snapshot of a game's setup, for reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameDescription {
    /// Game name
    pub name: String,
    /// Language the game is played in
    pub language: String,
    /// Configured round count
    pub n_rounds: u32,
    /// Whether agents are told the round count
    pub n_rounds_is_known: bool,
    /// Whether a communication phase precedes the choices
    pub agents_communicate: bool,
    /// Early stop conditions
    pub stop_game_when: Vec<Vec<String>>,
    /// How they are matched
    pub stop_condition_match: StopMatch,
    /// Strategies in `language`
    pub strategies: Strategies,
    /// Payoff rule parameters
    pub payoff: PayoffDescription,
    /// Public goods parameters, for public goods games
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_goods_config: Option<PublicGoodsConfig>,
    /// Roster
    pub agents: Vec<AgentInfo>,
}

/// One game, in one language.
///
/// ```no_run
/// # use public_goods_sim::prelude::*;
/// # fn main() -> anyhow::Result<()> {
/// let config = GameConfig::from_file("public_goods.json")?;
/// let mut game = Game::from_config(&config, "en", &Configuration::from_env())?;
/// let reason = game.run()?;
/// println!("{reason:?} after {} rounds", game.history().len());
/// # Ok(())
/// # }
/// ```
pub struct Game {
    config: GameConfig,
    language: String,
    agents: Vec<Agent>,
    payoff: Box<dyn PayoffRule>,
    renderer: Box<dyn PromptRenderer>,
    history: GameHistory,
    current_round: u32,
    status: GameStatus,
}

impl Game {
    /// Set up a game played by `agents`, in roster order.
    ///
    /// # Errors
    /// [`GameError::InvalidConfiguration`] when the agents do not match the roster, the language
    /// has no template or strategies, the payoff parameters are invalid, or a stop condition
    /// names an unknown strategy.
    pub fn new(config: &GameConfig, language: &str, agents: Vec<Agent>) -> Result<Game> {
        config.validate()?;
        if agents.len() != config.agents.len() {
            return Err(GameError::invalid(format!(
                "{} agents given for a roster of {}",
                agents.len(),
                config.agents.len()
            )));
        }
        let renderer = TemplateRenderer::new(config.template(language)?);
        let payoff = payoff::from_config(config, language)?;

        let strategies = payoff.strategies();
        for condition in &config.stop_game_when {
            let unknown = condition.iter().find(|key| {
                !(strategies.contains_key(key)
                    || (config.stop_condition_match == StopMatch::Pattern
                        && key.as_str() == ANY_CHOICE))
            });
            if let Some(key) = unknown {
                return Err(GameError::invalid(format!(
                    "stop condition uses unknown strategy '{key}'"
                )));
            }
        }

        Ok(Game {
            config: config.clone(),
            language: language.to_string(),
            agents,
            payoff,
            renderer: Box::new(renderer),
            history: GameHistory::new(),
            current_round: 1,
            status: GameStatus::Initialized,
        })
    }

    /// Set up a game, building every agent's connector from its roster entry.
    ///
    /// # Errors
    /// Same as [`Game::new`], plus [`GameError::Authentication`] for missing provider keys.
    pub fn from_config(
        config: &GameConfig,
        language: &str,
        configuration: &Configuration,
    ) -> Result<Game> {
        let agents = config
            .agents
            .iter()
            .map(|spec| Ok(Agent::new(spec, connector::from_spec(spec, configuration)?)))
            .collect::<Result<Vec<_>>>()?;
        Game::new(config, language, agents)
    }

    /// Use `renderer` instead of the language template.
    pub fn with_renderer(mut self, renderer: impl PromptRenderer + 'static) -> Self {
        self.renderer = Box::new(renderer);
        self
    }

    /// Next round to be played, from 1.
    pub fn current_round(&self) -> u32 {
        self.current_round
    }

    /// Lifecycle state.
    pub fn status(&self) -> &GameStatus {
        &self.status
    }

    /// True once no further round will be played.
    pub fn is_finished(&self) -> bool {
        matches!(self.status, GameStatus::Finished(_))
    }

    /// Agents, roster order.
    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    /// Completed rounds.
    pub fn history(&self) -> &GameHistory {
        &self.history
    }

    /// Payoff rule in use.
    pub fn payoff(&self) -> &dyn PayoffRule {
        self.payoff.as_ref()
    }

    /// Language the game is played in.
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Play the next round, then check the stop conditions.
    ///
    /// # Errors
    /// Any error of the round aborts the game: the failed round is not recorded and the
    /// counter is not advanced. Calling this on a finished game is a
    /// [`GameError::GameFinished`].
    pub fn run_round(&mut self) -> Result<&RoundRecord> {
        if let GameStatus::Finished(reason) = &self.status {
            return Err(GameError::GameFinished(reason.clone()));
        }
        let round = self.current_round;
        self.status = GameStatus::Running { round };

        let settings = RoundSettings {
            communicate: self.config.agents_communicate,
            n_rounds: self
                .config
                .n_rounds_is_known
                .then_some(self.config.n_rounds),
        };
        let record = GameRound::new(
            round,
            settings,
            &mut self.agents,
            &mut self.history,
            self.payoff.as_ref(),
            self.renderer.as_ref(),
        )
        .play()?;
        self.current_round += 1;

        let choices = record.strategy_keys();
        let matched = self
            .config
            .stop_game_when
            .iter()
            .find(|condition| stop_matches(self.config.stop_condition_match, condition, &choices));
        if let Some(condition) = matched {
            info!(round, ?condition, "stop condition met");
            self.status = GameStatus::Finished(StopReason::StopCondition {
                condition: condition.clone(),
                round,
            });
        } else if round >= self.config.n_rounds {
            self.status = GameStatus::Finished(StopReason::Completed);
        } else {
            self.status = GameStatus::Running {
                round: self.current_round,
            };
        }

        Ok(record)
    }

    /// Play rounds until the game finishes.
    #[instrument(skip(self), fields(game = %self.config.name, language = %self.language))]
    pub fn run(&mut self) -> Result<StopReason> {
        info!(
            agents = self.agents.len(),
            n_rounds = self.config.n_rounds,
            "game started"
        );
        loop {
            if let GameStatus::Finished(reason) = &self.status {
                info!(rounds = self.history.len(), ?reason, "game finished");
                return Ok(reason.clone());
            }
            self.run_round()?;
        }
    }

    /// Snapshot of the setup and roster. Owns all its data.
    pub fn description(&self) -> GameDescription {
        GameDescription {
            name: self.config.name.clone(),
            language: self.language.clone(),
            n_rounds: self.config.n_rounds,
            n_rounds_is_known: self.config.n_rounds_is_known,
            agents_communicate: self.config.agents_communicate,
            stop_game_when: self.config.stop_game_when.clone(),
            stop_condition_match: self.config.stop_condition_match,
            strategies: self.payoff.strategies().clone(),
            payoff: self.payoff.describe(),
            public_goods_config: self.config.public_goods_config,
            agents: self.agents.iter().map(Agent::info).collect(),
        }
    }

    /// Final state, for the results exporter.
    pub fn into_results(self) -> GameResults {
        let description = self.description();
        let scores = self
            .agents
            .iter()
            .map(|agent| AgentScores {
                agent: agent.name().to_string(),
                scores: agent.scores().to_vec(),
                total: agent.total_score(),
            })
            .collect();
        let stop_reason = match self.status {
            GameStatus::Finished(reason) => Some(reason),
            _ => None,
        };
        GameResults {
            description,
            rounds: self.history.rounds().to_vec(),
            scores,
            stop_reason,
        }
    }
}

impl std::fmt::Debug for Game {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Game")
            .field("name", &self.config.name)
            .field("language", &self.language)
            .field("agents", &self.agents)
            .field("current_round", &self.current_round)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// Whether a round's `choices` match a stop `condition`.
pub fn stop_matches(policy: StopMatch, condition: &[String], choices: &[String]) -> bool {
    if condition.len() != choices.len() {
        return false;
    }
    match policy {
        StopMatch::Pattern => condition
            .iter()
            .zip(choices)
            .all(|(expected, actual)| expected == ANY_CHOICE || expected == actual),
        StopMatch::Multiset => {
            let mut expected = condition.to_vec();
            let mut actual = choices.to_vec();
            expected.sort_unstable();
            actual.sort_unstable();
            expected == actual
        }
    }
}

#[cfg(test)]
mod interface_tests {
    use super::*;
    use crate::config::tests::PUBLIC_GOODS;
    use crate::connector::ScriptedConnector;

    fn keys(choices: &[&str]) -> Vec<String> {
        choices.iter().map(|c| c.to_string()).collect()
    }

    fn scripted_game(config: &GameConfig, replies: &[&[&str]]) -> Result<Game> {
        let agents = config
            .agents
            .iter()
            .zip(replies)
            .map(|(spec, replies)| {
                Agent::new(spec, Box::new(ScriptedConnector::cycling(replies.iter().copied())))
            })
            .collect();
        Game::new(config, "en", agents)
    }

    #[test]
    fn multiset_ignores_order() {
        let condition = keys(&["strategy1", "strategy2", "strategy2"]);
        assert!(stop_matches(
            StopMatch::Multiset,
            &condition,
            &keys(&["strategy2", "strategy1", "strategy2"])
        ));
        assert!(!stop_matches(
            StopMatch::Multiset,
            &condition,
            &keys(&["strategy1", "strategy1", "strategy2"])
        ));
    }

    #[test]
    fn pattern_is_per_slot() {
        let condition = keys(&["strategy1", "*"]);
        assert!(stop_matches(StopMatch::Pattern, &condition, &keys(&["strategy1", "strategy2"])));
        assert!(!stop_matches(StopMatch::Pattern, &condition, &keys(&["strategy2", "strategy1"])));
        assert!(!stop_matches(StopMatch::Pattern, &condition, &keys(&["strategy1"])));
    }

    #[test]
    fn state_machine() {
        let config = GameConfig::from_json_str(PUBLIC_GOODS).unwrap();
        let mut game = scripted_game(
            &config,
            &[&["Contribute"], &["Free-ride"], &["Contribute"], &["Free-ride"]],
        )
        .unwrap();
        assert_eq!(game.status(), &GameStatus::Initialized);
        assert_eq!(game.current_round(), 1);

        game.run_round().unwrap();
        assert_eq!(game.status(), &GameStatus::Running { round: 2 });
        assert_eq!(game.current_round(), 2);

        assert_eq!(game.run().unwrap(), StopReason::Completed);
        assert_eq!(game.history().len(), 3);
        assert!(game.agents().iter().all(|a| a.scores().len() == 3));
        assert!(matches!(
            game.run_round(),
            Err(GameError::GameFinished(StopReason::Completed))
        ));
        assert_eq!(game.history().len(), 3);
    }

    #[test]
    fn roster_mismatch_is_rejected() {
        let config = GameConfig::from_json_str(PUBLIC_GOODS).unwrap();
        let err = scripted_game(&config, &[&["Contribute"], &["Free-ride"]]).unwrap_err();
        assert!(matches!(err, GameError::InvalidConfiguration(_)));
    }

    #[test]
    fn unknown_stop_strategy_is_rejected() {
        let mut config = GameConfig::from_json_str(PUBLIC_GOODS).unwrap();
        config.stop_game_when = vec![keys(&["strategy9", "*", "*", "*"])];
        assert!(scripted_game(&config, &[&["x"], &["x"], &["x"], &["x"]]).is_err());
        config.stop_condition_match = StopMatch::Pattern;
        config.stop_game_when = vec![keys(&["strategy2", "*", "*", "*"])];
        assert!(scripted_game(&config, &[&["x"], &["x"], &["x"], &["x"]]).is_ok());
    }

    #[test]
    fn description_is_a_snapshot() {
        let config = GameConfig::from_json_str(PUBLIC_GOODS).unwrap();
        let mut game = scripted_game(
            &config,
            &[&["Contribute"], &["Free-ride"], &["Contribute"], &["Free-ride"]],
        )
        .unwrap();
        let before = game.description();
        game.run_round().unwrap();
        assert_eq!(before, game.description());
        assert_eq!(before.agents.len(), 4);
        assert_eq!(before.public_goods_config.map(|p| p.num_agents), Some(4));
        assert!(!before.agents_communicate);
    }

    #[test]
    fn failed_round_is_not_recorded() {
        let config = GameConfig::from_json_str(PUBLIC_GOODS).unwrap();
        let mut game = scripted_game(
            &config,
            &[&["Contribute"], &["Free-ride"], &["Maybe later"], &["Free-ride"]],
        )
        .unwrap();
        let err = game.run().unwrap_err();
        assert!(matches!(err, GameError::UnparsableChoice { ref agent, .. } if agent == "Cy"));
        assert!(game.history().is_empty());
        assert_eq!(game.current_round(), 1);
        assert!(game.agents().iter().all(|a| a.scores().is_empty()));
    }
}
