//! Batch execution of a game description.
//!
//! A [`Simulator`] plays one [`Game`] per language listed in a [`GameConfig`], one after the
//! other, and hands back the results of each. Games are independent: every game gets fresh
//! agents, connectors and history.
//!
//! # Behavior & Configuration
//!
//! Behavior is controlled by a [`Configuration`] object:
//!
//! - When `config.verbose = true`, each round is printed to stdout as it completes, followed by
//!   the final totals.
//! - When `config.log = true`, a time-stamped log file is created in the working directory and
//!   every `tracing` event is written to it.
//!
//! Any fatal error of a game aborts the whole batch.

use anyhow::Context;
use tracing::{info, instrument, trace};

use crate::config::GameConfig;
use crate::configuration::Configuration;
use crate::game::{Game, GameStatus};
use crate::history::RoundRecord;
use crate::logger::init_logger;
use crate::results::GameResults;

/// Runs games and collects their results.
#[derive(Debug, Clone)]
pub struct Simulator {
    config: Configuration,
}

impl Simulator {
    /// Create a [`Simulator`], installing the file logger when `config.log` is set.
    #[instrument(skip_all)]
    pub fn new(config: Configuration) -> anyhow::Result<Simulator> {
        if config.log {
            let path = init_logger(".")?;
            info!(path = %path.display(), "logging to file");
        }
        trace!(?config);
        Ok(Simulator { config })
    }

    /// Runtime configuration.
    pub fn configuration(&self) -> &Configuration {
        &self.config
    }

    /// Play `game` once in each of its languages.
    ///
    /// # Errors
    /// The first game error, with the game and language as context.
    pub fn run(&self, game: &GameConfig) -> anyhow::Result<Vec<GameResults>> {
        game.languages
            .iter()
            .map(|language| {
                self.run_language(game, language)
                    .with_context(|| format!("game '{}' in language '{language}'", game.name))
            })
            .collect()
    }

    /// Play `game` once in `language`.
    #[instrument(skip(self, game), fields(game = %game.name))]
    pub fn run_language(&self, game: &GameConfig, language: &str) -> anyhow::Result<GameResults> {
        let mut game = Game::from_config(game, language, &self.config)?;
        self.play(&mut game)?;
        let results = game.into_results();
        if self.config.verbose {
            print_totals(&results);
        }
        Ok(results)
    }

    /// Play an already built game to the end, printing progress when verbose.
    pub fn play(&self, game: &mut Game) -> anyhow::Result<()> {
        let name = game.description().name;
        let language = game.language().to_string();
        while !game.is_finished() {
            let record = game.run_round()?;
            if self.config.verbose {
                print_round(&name, &language, record);
            }
        }
        if let GameStatus::Finished(reason) = game.status() {
            info!(rounds = game.history().len(), ?reason, "game finished");
        }
        Ok(())
    }
}

fn print_round(name: &str, language: &str, record: &RoundRecord) {
    let choices = record
        .choices
        .iter()
        .zip(&record.payoffs)
        .map(|(choice, payoff)| format!("{}={}({payoff})", choice.agent, choice.strategy))
        .collect::<Vec<_>>()
        .join(" ");
    // clear line, green header, default
    println!(
        "\x1b[2K\x1b[32m{name} [{language}] round {}:\x1b[39m {choices} \x1b[2m{}\x1b[0m",
        record.round, record.combination_key
    );
}

fn print_totals(results: &GameResults) {
    let totals = results
        .scores
        .iter()
        .map(|s| format!("{}: {}", s.agent, s.total))
        .collect::<Vec<_>>()
        .join(", ");
    println!(
        "\x1b[2K\x1b[32m{} [{}] finished:\x1b[39m {totals}",
        results.description.name, results.description.language
    );
}
