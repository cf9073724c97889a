// src/schedule/task_run.rs

//! Run a single task: re-check its schedule, touch its marker, run it.

use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Local};
use tracing::{debug, error, info};

use crate::schedule::clock::{self, Eligibility, SkipReason};
use crate::schedule::marker::MarkerStore;
use crate::task::TaskRegistry;

/// Options of `task run`.
#[derive(Debug, Clone)]
pub struct TaskRunOptions {
    /// Re-check eligibility before running. `false` forces the run.
    pub schedule: bool,
    /// Overrides the task's configured params when set.
    pub params: Option<Vec<String>>,
}

impl Default for TaskRunOptions {
    fn default() -> Self {
        Self {
            schedule: true,
            params: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskRunOutcome {
    Skipped(SkipReason),
    Succeeded,
    /// The task returned an error; it has been logged.
    Failed,
}

/// `name|start|end|elapsed s`, logged on `cronfan::task::history`.
pub fn history_line(
    name: &str,
    started_at: DateTime<Local>,
    ended_at: DateTime<Local>,
    elapsed: Duration,
) -> String {
    const FMT: &str = "%Y-%m-%d %H:%M:%S";
    format!(
        "{name}|{}|{}|{:.3} s",
        started_at.format(FMT),
        ended_at.format(FMT),
        elapsed.as_secs_f64()
    )
}

/// `"a;b;c"` -> `["a", "b", "c"]`. An empty string means no params.
pub fn split_params(raw: &str) -> Vec<String> {
    if raw.is_empty() {
        return Vec::new();
    }
    raw.split(';').map(str::to_string).collect()
}

/// Resolve `name`, and run it if it is due at `now` (or unconditionally when
/// `opts.schedule` is false).
///
/// The marker is touched before the task starts, so a task that crashes
/// does not fire again in the same window. Errors from the task itself are
/// logged and reported as [`TaskRunOutcome::Failed`]; only lookup and marker
/// errors are returned.
pub async fn run_task(
    registry: &TaskRegistry,
    markers: &MarkerStore,
    name: &str,
    opts: &TaskRunOptions,
    now: DateTime<Local>,
) -> Result<TaskRunOutcome> {
    let task = registry.get(name)?;
    let definition = task.definition();

    markers.prepare(name)?;

    if opts.schedule {
        let last_run = markers.last_run(name)?;
        if let Eligibility::Skip(reason) = clock::check(definition, now.naive_local(), last_run) {
            debug!(target: "cronfan::task::run", task = %name, "skipped: {reason}");
            return Ok(TaskRunOutcome::Skipped(reason));
        }
    }

    markers.touch(name, now)?;

    let params = opts.params.as_deref().unwrap_or(&definition.params);
    info!(target: "cronfan::task::run", task = %name, ?params, "running task");

    match task.run(params).await {
        Ok(()) => Ok(TaskRunOutcome::Succeeded),
        Err(err) => {
            error!(target: "cronfan::task::run", task = %name, "task failed: {err:?}");
            Ok(TaskRunOutcome::Failed)
        }
    }
}
