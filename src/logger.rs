use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::Context;
use time::{
    format_description::{self, parse},
    OffsetDateTime,
};
use tracing::{subscriber::set_global_default, Level};
use tracing_subscriber::{fmt::writer::BoxMakeWriter, EnvFilter, FmtSubscriber};

/// Log everything to a time-stamped file in `dir`, and return the file path.
///
/// # Errors
/// When the file cannot be created, or a global subscriber is already installed.
pub fn init_logger(dir: impl AsRef<Path>) -> anyhow::Result<PathBuf> {
    let path = dir.as_ref().join(get_log_file_name()?);
    let file = File::create(&path)
        .with_context(|| format!("cannot create log file {}", path.display()))?;
    let writer = BoxMakeWriter::new(file);
    let local_offset =
        time::UtcOffset::current_local_offset().unwrap_or(time::UtcOffset::UTC);
    let timer = tracing_subscriber::fmt::time::OffsetTime::new(
        local_offset,
        format_description::parse("[year]-[month]-[day] [hour]:[minute]:[second]")?,
    );

    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::TRACE)
        .with_ansi(false)
        .with_timer(timer)
        .with_writer(writer)
        .finish();

    set_global_default(subscriber).context(
        "could not set global tracing subscriber, disable file logging if one is already set",
    )?;
    Ok(path)
}

/// Log to stderr, filtered by `RUST_LOG` (default `warn`).
pub fn init_stderr_logger() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    set_global_default(subscriber).context("could not set global tracing subscriber")?;
    Ok(())
}

fn get_log_file_name() -> anyhow::Result<String> {
    let format = parse("[year]-[month]-[day]_[hour]-[minute]-[second]_log.txt")?;
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    Ok(now.format(&format)?)
}
