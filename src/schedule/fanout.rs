// src/schedule/fanout.rs

//! Run every due task, each in its own child process.
//!
//! The parent filters tasks by eligibility and submits one `task run <name>`
//! re-invocation per due task as a single batch. The child re-checks the
//! schedule itself, since discovery and execution are not atomic.

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use tracing::{debug, error, info, warn};

use crate::exec::{BatchExecutor, CommandLine, ConcurrentExecutor, FinishedResult, ProcessSpec};
use crate::schedule::clock::{self, Eligibility, SkipReason};
use crate::schedule::marker::MarkerStore;
use crate::schedule::task_run::history_line;
use crate::task::TaskRegistry;

/// How to re-invoke this binary for a single task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelfInvocation {
    program: String,
    base_args: Vec<String>,
}

impl SelfInvocation {
    pub fn new(program: impl Into<String>, base_args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            base_args,
        }
    }

    /// The running executable with `--config <config_path>`.
    pub fn current(config_path: &Path) -> Result<Self> {
        let exe = std::env::current_exe().context("resolving current executable")?;
        let config = std::path::absolute(config_path)
            .with_context(|| format!("resolving config path {:?}", config_path))?;
        Ok(Self::new(
            exe.to_string_lossy(),
            vec!["--config".to_string(), config.to_string_lossy().into_owned()],
        ))
    }

    /// `<program> <base args> --timeout=0 --log-level=error task run <name>`.
    ///
    /// The child runs Direct: the deadline is enforced by the parent's
    /// batch, not by another re-exec.
    pub fn task_command(&self, name: &str) -> CommandLine {
        CommandLine::new(&self.program)
            .args(self.base_args.iter().cloned())
            .args(["--timeout=0", "--log-level=error", "task", "run", name])
    }
}

/// What one fan-out pass did.
#[derive(Debug, Default)]
pub struct FanOutSummary {
    /// Tasks submitted to the executor, in name order.
    pub due: Vec<String>,
    pub skipped: Vec<(String, SkipReason)>,
    /// Results in completion order.
    pub results: Vec<FinishedResult>,
}

pub struct ScheduleFanOut<E: BatchExecutor = ConcurrentExecutor> {
    registry: TaskRegistry,
    markers: MarkerStore,
    invocation: SelfInvocation,
    executor: E,
}

impl ScheduleFanOut<ConcurrentExecutor> {
    pub fn new(registry: TaskRegistry, markers: MarkerStore, invocation: SelfInvocation) -> Self {
        Self::with_executor(registry, markers, invocation, ConcurrentExecutor::new())
    }
}

impl<E: BatchExecutor> ScheduleFanOut<E> {
    pub fn with_executor(
        registry: TaskRegistry,
        markers: MarkerStore,
        invocation: SelfInvocation,
        executor: E,
    ) -> Self {
        Self {
            registry,
            markers,
            invocation,
            executor,
        }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Run all tasks due at `now`. A non-empty `only` restricts the pass to
    /// those task names; naming an unknown task is an error.
    pub async fn run(&mut self, only: &[String], now: NaiveDateTime) -> Result<FanOutSummary> {
        let started = Instant::now();

        let names: Vec<String> = if only.is_empty() {
            self.registry.list().map(str::to_string).collect()
        } else {
            for name in only {
                self.registry.get(name)?;
            }
            let mut names = only.to_vec();
            names.sort();
            names.dedup();
            names
        };

        let mut summary = FanOutSummary::default();
        let mut specs = Vec::new();

        for name in names {
            let task = self.registry.get(&name)?;
            let definition = task.definition();

            let last_run = match self.markers.last_run(&name) {
                Ok(last_run) => last_run,
                Err(err) => {
                    warn!(target: "cronfan::schedule", task = %name, "cannot read marker, skipping: {err:#}");
                    continue;
                }
            };

            if let Eligibility::Skip(reason) = clock::check(definition, now, last_run) {
                debug!(target: "cronfan::schedule", task = %name, "not due: {reason}");
                summary.skipped.push((name, reason));
                continue;
            }

            let task_name = name.clone();
            let spec = ProcessSpec::new(self.invocation.task_command(&name))
                .with_timeout(definition.timeout)
                .on_finished(move |result| report_task_result(&task_name, result));
            specs.push(spec);
            summary.due.push(name);
        }

        if specs.is_empty() {
            debug!(target: "cronfan::schedule", "no task due");
            return Ok(summary);
        }

        info!(target: "cronfan::schedule", tasks = ?summary.due, "starting due tasks");
        summary.results = self.executor.run_batch(specs).await;

        info!(
            target: "cronfan::schedule",
            started = summary.due.len(),
            finished = summary.results.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "schedule pass done"
        );

        Ok(summary)
    }
}

fn report_task_result(task: &str, result: &FinishedResult) {
    info!(
        target: "cronfan::task::history",
        "{}",
        history_line(task, result.started_at, result.ended_at, result.elapsed)
    );

    if !result.stdout.is_empty() {
        print!("{}", result.stdout);
    }

    if result.is_timed_out() {
        error!(
            target: "cronfan::schedule",
            task = %task,
            pid = ?result.pid,
            elapsed_ms = result.elapsed.as_millis() as u64,
            "task timed out and was killed"
        );
    }

    let stderr = result.stderr.trim_end();
    if !stderr.is_empty() {
        error!(target: "cronfan::schedule", task = %task, "{stderr}");
    } else if !result.is_timed_out() && !result.succeeded() {
        error!(
            target: "cronfan::schedule",
            task = %task,
            exit_code = ?result.exit_code,
            "task process failed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_command_runs_child_direct_and_quiet() {
        let inv = SelfInvocation::new(
            "/usr/bin/cronfan",
            vec!["--config".into(), "/etc/cronfan.toml".into()],
        );
        let cmd = inv.task_command("reports.daily");

        assert_eq!(cmd.program(), "/usr/bin/cronfan");
        assert_eq!(
            cmd.get_args(),
            [
                "--config",
                "/etc/cronfan.toml",
                "--timeout=0",
                "--log-level=error",
                "task",
                "run",
                "reports.daily"
            ]
        );
    }
}
