// src/runner/mode.rs

//! Run-mode selection and the self re-exec command line.

use std::time::Duration;

use anyhow::{Context, Result};

use crate::exec::CommandLine;

/// How a command executes its work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Run the work in this process.
    Direct,
    /// Re-exec this command as a child and kill it after `timeout`.
    Watchdog { timeout: Duration },
    /// Re-exec this command as a child forever, restarting it whenever it
    /// exits. Each child is still bounded by `timeout` if one is set.
    Supervised { timeout: Option<Duration> },
}

impl RunMode {
    /// `always` wins over `timeout_secs`; a zero timeout means Direct.
    pub fn resolve(always: bool, timeout_secs: u64) -> Self {
        let timeout = (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs));
        match (always, timeout) {
            (true, timeout) => RunMode::Supervised { timeout },
            (false, Some(timeout)) => RunMode::Watchdog { timeout },
            (false, None) => RunMode::Direct,
        }
    }
}

/// Rewrite this process's arguments for a child that must run Direct.
///
/// Strips every run-mode option (`--timeout`, `--always`), the console
/// level and the log file (the parent relays and records everything), then
/// appends `--timeout=0` so the child cannot recurse, and
/// `--log-level=error` so its stderr only carries errors for the parent
/// to report.
pub fn reexec_args(argv: &[String]) -> Vec<String> {
    let mut out = Vec::with_capacity(argv.len() + 2);
    let mut iter = argv.iter();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--timeout" | "--log-level" | "--log-file" => {
                // value is the next token
                iter.next();
            }
            "--always" => {}
            a if a.starts_with("--timeout=")
                || a.starts_with("--always=")
                || a.starts_with("--log-level=")
                || a.starts_with("--log-file=") => {}
            _ => out.push(arg.clone()),
        }
    }

    out.push("--timeout=0".to_string());
    out.push("--log-level=error".to_string());
    out
}

/// Command line that re-runs the current invocation as a Direct child.
pub fn reexec_command_line() -> Result<CommandLine> {
    let exe = std::env::current_exe().context("resolving current executable")?;
    let argv: Vec<String> = std::env::args().skip(1).collect();
    Ok(CommandLine::new(exe.to_string_lossy()).args(reexec_args(&argv)))
}
