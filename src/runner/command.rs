// src/runner/command.rs

//! Execute a command's work in its resolved [`RunMode`].
//!
//! Watchdog and Supervised modes never run the work in this process: they
//! re-exec the same invocation as a Direct child through a [`BatchExecutor`]
//! and relay what the child printed. Killing a child is the only safe way to
//! abort arbitrary blocking work.

use std::future::Future;
use std::time::Duration;

use anyhow::{Result, bail};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::exec::{BatchExecutor, CommandLine, ConcurrentExecutor, FinishedResult, ProcessSpec, TICK};
use crate::runner::mode::{RunMode, reexec_command_line};
use crate::runner::shutdown::{ShutdownHook, ShutdownReport};

pub struct CommandRunner<E: BatchExecutor = ConcurrentExecutor> {
    name: String,
    mode: RunMode,
    child: Option<CommandLine>,
    executor: E,
    pause: Duration,
    shutdown: ShutdownHook,
}

impl CommandRunner<ConcurrentExecutor> {
    /// Runner for the current process invocation. The shutdown hook is
    /// armed from this point on.
    pub fn new(name: impl Into<String>, mode: RunMode) -> Result<Self> {
        let child = match mode {
            RunMode::Direct => None,
            _ => Some(reexec_command_line()?),
        };
        Ok(Self::with_executor(name, mode, child, ConcurrentExecutor::new()))
    }
}

impl<E: BatchExecutor> CommandRunner<E> {
    /// `child` is required for every mode but Direct.
    pub fn with_executor(
        name: impl Into<String>,
        mode: RunMode,
        child: Option<CommandLine>,
        executor: E,
    ) -> Self {
        let name = name.into();
        let hook_name = name.clone();
        Self {
            name,
            mode,
            child,
            executor,
            pause: TICK,
            shutdown: ShutdownHook::new(move |report| log_shutdown(&hook_name, report)),
        }
    }

    /// Pause between Supervised iterations (one tick by default).
    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    /// Replace the default shutdown hook. It still fires exactly once, when
    /// the runner is dropped.
    pub fn on_shutdown<F>(&mut self, hook: F)
    where
        F: FnOnce(&ShutdownReport) + Send + 'static,
    {
        self.shutdown.replace(hook);
    }

    pub fn mode(&self) -> RunMode {
        self.mode
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Run `work` according to the mode.
    ///
    /// Direct returns the work's error after logging it. The re-exec modes
    /// report the child's outcome through the log and only fail when the
    /// child could not be started; Supervised never returns otherwise.
    pub async fn execute<F, Fut>(&mut self, work: F) -> Result<()>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        match self.mode {
            RunMode::Direct => {
                debug!(target: "cronfan::command", command = %self.name, "running direct");
                let res = work().await;
                if let Err(err) = &res {
                    error!(target: "cronfan::command", command = %self.name, "{err:?}");
                }
                res
            }
            RunMode::Watchdog { timeout } => {
                debug!(
                    target: "cronfan::command",
                    command = %self.name,
                    timeout_s = timeout.as_secs(),
                    "running under watchdog"
                );
                match self.run_child(Some(timeout)).await {
                    Some(_) => Ok(()),
                    None => bail!("could not start child process for '{}'", self.name),
                }
            }
            RunMode::Supervised { timeout } => {
                info!(target: "cronfan::command", command = %self.name, "supervising");
                let mut iteration: u64 = 0;
                loop {
                    iteration += 1;
                    match self.run_child(timeout).await {
                        Some(result) => debug!(
                            target: "cronfan::command",
                            command = %self.name,
                            iteration,
                            elapsed_ms = result.elapsed.as_millis() as u64,
                            exit_code = ?result.exit_code,
                            stop_signal = ?result.stop_signal,
                            "child finished, restarting"
                        ),
                        None => warn!(
                            target: "cronfan::command",
                            command = %self.name,
                            iteration,
                            "child failed to start, retrying"
                        ),
                    }
                    sleep(self.pause).await;
                }
            }
        }
    }

    /// Run the re-exec child as a one-element batch.
    async fn run_child(&mut self, timeout: Option<Duration>) -> Option<FinishedResult> {
        let Some(child) = self.child.clone() else {
            error!(target: "cronfan::command", command = %self.name, "no child command line for {:?}", self.mode);
            return None;
        };

        let name = self.name.clone();
        let spec = ProcessSpec::new(child)
            .with_timeout(timeout.unwrap_or(Duration::ZERO))
            .on_finished(move |result| report_child_result(&name, result));

        self.executor.run_batch(vec![spec]).await.into_iter().next()
    }
}

fn log_shutdown(name: &str, report: &ShutdownReport) {
    debug!(
        target: "cronfan::command",
        command = %name,
        elapsed_ms = report.elapsed.as_millis() as u64,
        panicking = report.panicking,
        "command finished"
    );
}

fn report_child_result(name: &str, result: &FinishedResult) {
    if !result.stdout.is_empty() {
        print!("{}", result.stdout);
    }

    for failure in child_failures(result) {
        match failure {
            ChildFailure::TimedOut => error!(
                target: "cronfan::command",
                command = %name,
                pid = ?result.pid,
                elapsed_ms = result.elapsed.as_millis() as u64,
                "child timed out and was killed"
            ),
            ChildFailure::Stderr(stderr) => {
                error!(target: "cronfan::command", command = %name, "{stderr}")
            }
            ChildFailure::ExitCode => error!(
                target: "cronfan::command",
                command = %name,
                exit_code = ?result.exit_code,
                "child process failed"
            ),
        }
    }
}

/// Error-level findings about a finished child, in log order.
#[derive(Debug, PartialEq, Eq)]
enum ChildFailure<'a> {
    TimedOut,
    Stderr(&'a str),
    /// Non-zero exit that left nothing on stderr.
    ExitCode,
}

fn child_failures(result: &FinishedResult) -> Vec<ChildFailure<'_>> {
    let mut failures = Vec::new();
    if result.is_timed_out() {
        failures.push(ChildFailure::TimedOut);
    }

    let stderr = result.stderr.trim_end();
    if !stderr.is_empty() {
        failures.push(ChildFailure::Stderr(stderr));
    } else if !result.is_timed_out() && !result.succeeded() {
        failures.push(ChildFailure::ExitCode);
    }
    failures
}
