use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::LevelFilter;

pub const ENV_LOG_LEVEL: &str = "SLIDES_LOG_LEVEL";
pub const ENV_LOG_FILE: &str = "SLIDES_LOG_FILE";

/// Parse a level name, falling back to `info` for anything unrecognised.
pub fn parse_level(raw: Option<&str>) -> LevelFilter {
    raw.and_then(|value| value.trim().parse().ok())
        .unwrap_or(LevelFilter::Info)
}

/// Configure logging from `SLIDES_LOG_LEVEL` and `SLIDES_LOG_FILE`.
pub fn init_logging_from_env() -> Result<()> {
    let level = parse_level(std::env::var(ENV_LOG_LEVEL).ok().as_deref());
    let log_file = std::env::var(ENV_LOG_FILE).ok().map(PathBuf::from);
    init_logging(level, log_file.as_deref())
}

/// Log to stderr (stdout carries the MCP protocol) and optionally to a file.
pub fn init_logging(level: LevelFilter, log_file: Option<&Path>) -> Result<()> {
    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} [{}] {}: {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        // CDP and HTTP internals are noisy at debug
        .level_for("chromiumoxide", LevelFilter::Warn)
        .level_for("tungstenite", LevelFilter::Warn)
        .level_for("hyper_util", LevelFilter::Warn)
        .level_for("reqwest", LevelFilter::Warn)
        .chain(std::io::stderr());

    if let Some(path) = log_file {
        let file = fern::log_file(path)
            .with_context(|| format!("Failed to open log file: {}", path.display()))?;
        dispatch = dispatch.chain(file);
    }

    dispatch
        .apply()
        .context("Failed to install logger (already initialised?)")
}
