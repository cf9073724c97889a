// src/runner/shutdown.rs

use std::fmt;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};

/// Passed to the shutdown hook.
#[derive(Debug, Clone)]
pub struct ShutdownReport {
    pub started_at: DateTime<Local>,
    pub ended_at: DateTime<Local>,
    pub elapsed: Duration,
    /// The command is going down because of a panic.
    pub panicking: bool,
}

type Hook = Box<dyn FnOnce(&ShutdownReport) + Send>;

/// Runs its hook exactly once when dropped: on normal return, on an error
/// return, on panic unwind, and when the owning future is dropped (which is
/// how Ctrl-C is handled in `main`).
pub struct ShutdownHook {
    hook: Option<Hook>,
    started_at: DateTime<Local>,
    started: Instant,
}

impl ShutdownHook {
    pub fn new<F>(hook: F) -> Self
    where
        F: FnOnce(&ShutdownReport) + Send + 'static,
    {
        Self {
            hook: Some(Box::new(hook)),
            started_at: Local::now(),
            started: Instant::now(),
        }
    }

    /// Replace the hook, keeping the original start time.
    pub fn replace<F>(&mut self, hook: F)
    where
        F: FnOnce(&ShutdownReport) + Send + 'static,
    {
        self.hook = Some(Box::new(hook));
    }

    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

impl fmt::Debug for ShutdownHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShutdownHook")
            .field("armed", &self.hook.is_some())
            .field("started_at", &self.started_at)
            .finish()
    }
}

impl Drop for ShutdownHook {
    fn drop(&mut self) {
        if let Some(hook) = self.hook.take() {
            let report = ShutdownReport {
                started_at: self.started_at,
                ended_at: Local::now(),
                elapsed: self.started.elapsed(),
                panicking: std::thread::panicking(),
            };
            hook(&report);
        }
    }
}
