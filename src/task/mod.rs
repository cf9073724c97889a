// src/task/mod.rs

//! Recurring tasks.
//!
//! A task is a named unit of work with a [`TaskDefinition`] describing when
//! it may run. Tasks are looked up by name in a [`TaskRegistry`]; the config
//! file contributes [`ShellTask`]s, and library users can register their own
//! [`Task`] implementations.

pub mod registry;
pub mod shell;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use regex::Regex;

use crate::errors::{CronfanError, Result};

pub use registry::TaskRegistry;
pub use shell::ShellTask;

/// Wall-clock constraints. `None` leaves a field unconstrained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeConstraints {
    /// 1..=12
    pub month: Option<u32>,
    /// 1..=31
    pub day_of_month: Option<u32>,
    /// 1 = Monday .. 7 = Sunday
    pub day_of_week: Option<u32>,
    /// 0..=23
    pub hour: Option<u32>,
    /// 0..=59
    pub minute: Option<u32>,
}

impl TimeConstraints {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Scheduling parameters of a task. Read-only at scheduling time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDefinition {
    pub constraints: TimeConstraints,
    /// Minimum gap between runs; only used when no constraint is set.
    pub interval: Duration,
    /// Deadline for one run; zero disables it.
    pub timeout: Duration,
    /// Parameters used when none are given on the command line.
    pub params: Vec<String>,
}

impl Default for TaskDefinition {
    fn default() -> Self {
        Self {
            constraints: TimeConstraints::default(),
            interval: Duration::from_secs(60),
            timeout: Duration::ZERO,
            params: Vec::new(),
        }
    }
}

impl TaskDefinition {
    pub fn every(interval: Duration) -> Self {
        Self {
            interval,
            ..Self::default()
        }
    }

    pub fn in_month(mut self, month: u32) -> Self {
        self.constraints.month = Some(month);
        self
    }

    pub fn on_day_of_month(mut self, day: u32) -> Self {
        self.constraints.day_of_month = Some(day);
        self
    }

    pub fn on_day_of_week(mut self, day: u32) -> Self {
        self.constraints.day_of_week = Some(day);
        self
    }

    pub fn at_hour(mut self, hour: u32) -> Self {
        self.constraints.hour = Some(hour);
        self
    }

    pub fn at_minute(mut self, minute: u32) -> Self {
        self.constraints.minute = Some(minute);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Boxed future returned by [`Task::run`].
pub type TaskFuture<'a> = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>>;

/// A unit of work the scheduler can run.
pub trait Task: Send + Sync + fmt::Debug {
    fn definition(&self) -> &TaskDefinition;

    /// Execute the task once with the given parameters.
    fn run<'a>(&'a self, params: &'a [String]) -> TaskFuture<'a>;
}

/// Task names are dotted paths (`reports.daily`); each segment becomes a
/// directory level of the marker path, so nothing that could escape it is
/// allowed.
pub fn validate_task_name(name: &str) -> Result<()> {
    let pattern = Regex::new(r"^[A-Za-z0-9_-]+(\.[A-Za-z0-9_-]+)*$").map_err(anyhow::Error::from)?;
    if pattern.is_match(name) {
        Ok(())
    } else {
        Err(CronfanError::InvalidTaskName(format!(
            "'{name}' (expected dot-separated segments of letters, digits, '_' or '-')"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_name_rules() {
        assert!(validate_task_name("heartbeat").is_ok());
        assert!(validate_task_name("reports.daily_v2").is_ok());
        assert!(validate_task_name("a.b-c.d").is_ok());

        for bad in ["", ".a", "a.", "a..b", "a/b", "../x", "a b"] {
            assert!(validate_task_name(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn builder_sets_constraints() {
        let def = TaskDefinition::every(Duration::from_secs(5))
            .at_hour(3)
            .at_minute(15);
        assert_eq!(def.interval, Duration::from_secs(5));
        assert_eq!(def.constraints.hour, Some(3));
        assert_eq!(def.constraints.minute, Some(15));
        assert!(!def.constraints.is_empty());
        assert!(TaskDefinition::default().constraints.is_empty());
    }
}
