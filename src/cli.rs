// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};

use crate::config::loader::default_config_path;

/// Command-line arguments for `cronfan`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "cronfan",
    version,
    about = "Run recurring tasks from a once-a-minute cron trigger, each in its own process.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    #[arg(long, global = true, value_name = "PATH", default_value_os_t = default_config_path())]
    pub config: PathBuf,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `CRONFAN_LOG` or a default level will be used.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Also append logs (down to debug) to this file.
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Re-run this command as a child and kill it after SECS seconds.
    /// `0` runs in-process. For `task run` the task's own timeout applies
    /// when omitted.
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Keep re-running this command as a child forever.
    #[arg(long, global = true)]
    pub always: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Scheduler commands.
    #[command(subcommand)]
    Schedule(ScheduleCommand),

    /// Single-task commands.
    #[command(subcommand)]
    Task(TaskCommand),
}

#[derive(Debug, Clone, Subcommand)]
pub enum ScheduleCommand {
    /// Run every task that is due now, each in its own process.
    Run {
        /// Only consider this task (repeatable).
        #[arg(long = "task", value_name = "NAME")]
        tasks: Vec<String>,
    },

    /// Install the once-a-minute crontab entry for `schedule run`.
    Install {
        /// Print the entry instead of installing it.
        #[arg(long)]
        print: bool,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum TaskCommand {
    /// Run one task.
    Run {
        name: String,

        /// Check the task's schedule first; `false` forces the run.
        #[arg(long, action = ArgAction::Set, default_value_t = true, value_name = "BOOL")]
        schedule: bool,

        /// `;`-separated params, replacing the configured ones.
        #[arg(long, value_name = "PARAMS", allow_hyphen_values = true)]
        params: Option<String>,
    },

    /// List tasks with their last run and whether they are due now.
    List,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_options_after_subcommand() {
        let args = CliArgs::try_parse_from([
            "cronfan", "task", "run", "a.b", "--timeout=0", "--log-level=error", "--params", "x;y",
        ])
        .unwrap();

        assert_eq!(args.timeout, Some(0));
        assert_eq!(args.log_level, Some(LogLevel::Error));
        assert_eq!(args.config, PathBuf::from("Cronfan.toml"));
        match args.command {
            Command::Task(TaskCommand::Run {
                name,
                schedule,
                params,
            }) => {
                assert_eq!(name, "a.b");
                assert!(schedule);
                assert_eq!(params.as_deref(), Some("x;y"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn schedule_flag_takes_a_value() {
        let args =
            CliArgs::try_parse_from(["cronfan", "task", "run", "a", "--schedule", "false"]).unwrap();
        assert!(matches!(
            args.command,
            Command::Task(TaskCommand::Run { schedule: false, .. })
        ));
    }

    #[test]
    fn schedule_run_collects_task_filters() {
        let args = CliArgs::try_parse_from([
            "cronfan", "--config", "/etc/c.toml", "--always", "schedule", "run", "--task", "a",
            "--task", "b",
        ])
        .unwrap();

        assert!(args.always);
        assert_eq!(args.config, PathBuf::from("/etc/c.toml"));
        match args.command {
            Command::Schedule(ScheduleCommand::Run { tasks }) => assert_eq!(tasks, ["a", "b"]),
            other => panic!("unexpected {other:?}"),
        }
    }
}
