// src/task/shell.rs

use std::process::Stdio;

use anyhow::{Context, bail};
use tokio::process::Command;
use tracing::debug;

use crate::config::TaskConfig;
use crate::task::{Task, TaskDefinition, TaskFuture};

/// A task that runs a shell command.
///
/// Parameters become positional arguments of the script (`$1`, `$2`, ...).
/// stdout/stderr are inherited, so whoever supervises this process sees the
/// task's output directly.
#[derive(Debug, Clone)]
pub struct ShellTask {
    name: String,
    shell: String,
    cmd: String,
    definition: TaskDefinition,
}

impl ShellTask {
    pub fn new(name: impl Into<String>, shell: impl Into<String>, cmd: impl Into<String>, definition: TaskDefinition) -> Self {
        Self {
            name: name.into(),
            shell: shell.into(),
            cmd: cmd.into(),
            definition,
        }
    }

    pub fn from_config(name: &str, shell: &str, cfg: &TaskConfig) -> Self {
        Self::new(name, shell, cfg.cmd.clone(), cfg.definition())
    }

    pub fn cmd(&self) -> &str {
        &self.cmd
    }
}

impl Task for ShellTask {
    fn definition(&self) -> &TaskDefinition {
        &self.definition
    }

    fn run<'a>(&'a self, params: &'a [String]) -> TaskFuture<'a> {
        Box::pin(async move {
            debug!(task = %self.name, cmd = %self.cmd, ?params, "running shell task");

            let status = Command::new(&self.shell)
                .arg("-c")
                .arg(&self.cmd)
                .arg(&self.name)
                .args(params)
                .stdin(Stdio::null())
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit())
                .kill_on_drop(true)
                .status()
                .await
                .with_context(|| format!("spawning `{}` for task '{}'", self.shell, self.name))?;

            if !status.success() {
                bail!("task '{}' command `{}` exited with {}", self.name, self.cmd, status);
            }
            Ok(())
        })
    }
}
