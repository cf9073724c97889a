// src/lib.rs

pub mod cli;
pub mod commands;
pub mod config;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod runner;
pub mod schedule;
pub mod task;

use anyhow::Result;

use crate::cli::CliArgs;

/// High-level entry point used by `main.rs`.
pub async fn run(args: CliArgs) -> Result<()> {
    commands::dispatch(args).await
}
