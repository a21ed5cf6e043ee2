//! Play a game description one or more times and write the results as CSV.
//!
//! Usage: public-goods --config configs/public_goods.json --runs 10

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::Parser;
use public_goods_sim::prelude::*;
use public_goods_sim::{init_stderr_logger, GameResults};

#[derive(Parser)]
#[command(name = "public-goods")]
#[command(about = "Iterated multi-agent economic games played by LLM-backed agents")]
#[command(version)]
struct Cli {
    /// Game description (JSON)
    #[arg(short, long)]
    config: PathBuf,

    /// Play only this language
    #[arg(short, long)]
    language: Option<String>,

    /// Prompt template file replacing the configured one (needs --language when the game has
    /// several languages)
    #[arg(short, long)]
    template: Option<PathBuf>,

    /// Number of times the game is played
    #[arg(short, long, default_value_t = 1)]
    runs: u32,

    /// Where result files are written
    #[arg(long, default_value = "results")]
    results_dir: PathBuf,

    /// Also write the full results as JSON
    #[arg(long)]
    json: bool,

    /// Log every event to a time-stamped file instead of stderr
    #[arg(long)]
    log: bool,

    /// Do not print game progress
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> ExitCode {
    let _ = dotenvy::dotenv();

    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    if cli.runs == 0 {
        bail!("--runs must be at least 1");
    }

    let mut config = Configuration::from_env();
    if cli.log {
        config = config.with_log(true);
    } else {
        init_stderr_logger()?;
    }
    if cli.quiet {
        config = config.with_verbose(false);
    }

    let game = load_game(&cli)?;
    let stem = cli
        .config
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("game")
        .to_string();
    std::fs::create_dir_all(&cli.results_dir)
        .with_context(|| format!("cannot create {}", cli.results_dir.display()))?;

    let simulator = Simulator::new(config)?;
    for run in 1..=cli.runs {
        for results in simulator.run(&game).with_context(|| format!("run {run}"))? {
            save(&cli.results_dir, &stem, run, &results, cli.json)?;
        }
    }
    Ok(())
}

fn load_game(cli: &Cli) -> Result<GameConfig> {
    let mut game = GameConfig::from_file(&cli.config)?;
    if let Some(language) = &cli.language {
        game = game.with_language(language);
    }
    if let Some(path) = &cli.template {
        let [language] = game.languages.as_slice() else {
            bail!("--template needs --language when the game is played in several languages");
        };
        let language = language.clone();
        let template = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read template {}", path.display()))?;
        game = game.with_template(&language, template);
    }
    Ok(game)
}

fn save(dir: &Path, stem: &str, run: u32, results: &GameResults, json: bool) -> Result<()> {
    let base = format!("results_{stem}_{}_{run}", results.description.language);
    results.save_csv(dir.join(format!("{base}.csv")))?;
    if json {
        results.save_json(dir.join(format!("{base}.json")))?;
    }
    Ok(())
}
