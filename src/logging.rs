// src/logging.rs

//! Logging setup for `cronfan` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the console log level:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `CRONFAN_LOG` environment variable (e.g. "info", "debug")
//! 3. default to `info`
//!
//! Console logs are sent to STDERR so that stdout relayed from child
//! processes stays clean. If a log file is given, everything down to `debug`
//! is appended to it as well, regardless of the console level.
//!
//! Every line carries its target, which doubles as the channel name
//! (`cronfan::command`, `cronfan::task::run`, `cronfan::schedule`, ...).

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, prelude::*};

use crate::cli::LogLevel;

/// Initialise global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>, log_file: Option<&Path>) -> Result<()> {
    let level = resolve_level(cli_level, std::env::var("CRONFAN_LOG").ok().as_deref());

    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .with_filter(LevelFilter::from_level(level));

    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating log directory {:?}", parent))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {:?}", path))?;

            Some(
                fmt::layer()
                    .with_writer(Arc::new(file))
                    .with_target(true)
                    .with_ansi(false)
                    .with_filter(LevelFilter::from_level(level.max(tracing::Level::DEBUG))),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(())
}

fn resolve_level(cli_level: Option<LogLevel>, env_level: Option<&str>) -> tracing::Level {
    match cli_level {
        Some(lvl) => level_from_log_level(lvl),
        None => env_level
            .and_then(parse_level_str)
            .unwrap_or(tracing::Level::INFO),
    }
}

fn level_from_log_level(lvl: LogLevel) -> tracing::Level {
    match lvl {
        LogLevel::Error => tracing::Level::ERROR,
        LogLevel::Warn => tracing::Level::WARN,
        LogLevel::Info => tracing::Level::INFO,
        LogLevel::Debug => tracing::Level::DEBUG,
        LogLevel::Trace => tracing::Level::TRACE,
    }
}

fn parse_level_str(s: &str) -> Option<tracing::Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(tracing::Level::ERROR),
        "warn" | "warning" => Some(tracing::Level::WARN),
        "info" => Some(tracing::Level::INFO),
        "debug" => Some(tracing::Level::DEBUG),
        "trace" => Some(tracing::Level::TRACE),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_flag_wins_over_env() {
        let level = resolve_level(Some(LogLevel::Error), Some("debug"));
        assert_eq!(level, tracing::Level::ERROR);
    }

    #[test]
    fn env_accepts_warning_alias_and_falls_back_to_info() {
        assert_eq!(resolve_level(None, Some(" Warning ")), tracing::Level::WARN);
        assert_eq!(resolve_level(None, Some("loud")), tracing::Level::INFO);
        assert_eq!(resolve_level(None, None), tracing::Level::INFO);
    }

    #[test]
    fn file_layer_never_records_less_than_debug() {
        // tracing::Level orders TRACE as the most verbose (greatest).
        assert_eq!(tracing::Level::ERROR.max(tracing::Level::DEBUG), tracing::Level::DEBUG);
        assert_eq!(tracing::Level::TRACE.max(tracing::Level::DEBUG), tracing::Level::TRACE);
    }
}
