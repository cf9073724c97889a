// src/exec/executor.rs

//! Concurrent batch executor.
//!
//! Spawns every [`ProcessSpec`] of a batch up front, then drives them from a
//! single polling loop: sleep one tick, visit each pending handle once
//! (drain ready output, check deadline, check liveness), finish the ones
//! that exited or timed out. The OS runs the children in parallel; this
//! loop only watches them, so there are no reader tasks and no threads.
//! A timed-out process is killed together with its process group.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::exec::process::{FinishedResult, ProcessHandle, ProcessSpec, ProcessStatus};

/// Fixed polling interval of the executor loop.
pub const TICK: Duration = Duration::from_millis(200);

/// How long an exited process's pipes are still read. A background process
/// that inherited them can keep them open indefinitely.
const EXIT_DRAIN_GRACE: Duration = Duration::from_secs(1);

/// What a single visit decided about a handle.
enum Visit {
    Pending,
    Exited(Option<std::process::ExitStatus>),
    TimedOut,
}

#[derive(Debug, Clone, Copy)]
pub struct ConcurrentExecutor {
    tick: Duration,
}

impl Default for ConcurrentExecutor {
    fn default() -> Self {
        Self { tick: TICK }
    }
}

impl ConcurrentExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the polling interval (tests only need this).
    pub fn with_tick(tick: Duration) -> Self {
        Self { tick }
    }

    pub fn tick(&self) -> Duration {
        self.tick
    }

    /// Run the batch to completion.
    ///
    /// Results are returned in completion order. Each spec's callback is
    /// invoked exactly once, right before its result is appended. Specs
    /// whose process cannot be spawned are logged and dropped.
    pub async fn run(&self, specs: Vec<ProcessSpec>) -> Vec<FinishedResult> {
        if specs.is_empty() {
            return Vec::new();
        }

        let mut pending: VecDeque<ProcessHandle> = specs
            .into_iter()
            .filter_map(|spec| {
                let cmd = spec.command().to_string();
                match ProcessHandle::spawn(spec) {
                    Ok(handle) => {
                        debug!(cmd = %cmd, pid = ?handle.pid(), "spawned process");
                        Some(handle)
                    }
                    Err(e) => {
                        warn!(cmd = %cmd, error = %e, "failed to spawn process; skipping");
                        None
                    }
                }
            })
            .collect();

        let mut finished = Vec::with_capacity(pending.len());

        while !pending.is_empty() {
            sleep(self.tick).await;

            // One full round. Still-pending handles go back to the tail, so
            // order among them is preserved.
            for _ in 0..pending.len() {
                let Some(mut handle) = pending.pop_front() else {
                    break;
                };

                match visit(&mut handle).await {
                    Visit::Pending => pending.push_back(handle),
                    Visit::Exited(exit) => {
                        if !handle.pipes_closed() {
                            debug!(
                                cmd = %handle.command(),
                                pid = ?handle.pid(),
                                "pipes still held open after exit; closing them"
                            );
                            handle.close_pipes();
                        }
                        finished.push(complete(handle, ProcessStatus::Completed, exit));
                    }
                    Visit::TimedOut => {
                        info!(
                            cmd = %handle.command(),
                            pid = ?handle.pid(),
                            elapsed_ms = handle.elapsed().as_millis() as u64,
                            "process exceeded its timeout; killing"
                        );
                        let exit = handle.kill().await;
                        finished.push(complete(handle, ProcessStatus::TimedOut, exit));
                    }
                }
            }
        }

        finished
    }
}

async fn visit(handle: &mut ProcessHandle) -> Visit {
    handle.drain_ready().await;

    if handle.exit_status().is_none() {
        let past_deadline = handle.is_past_deadline();

        match handle.try_exit() {
            Ok(Some(status)) => {
                handle.record_exit(status);
                handle.drain_ready().await;
            }
            Ok(None) if past_deadline => return Visit::TimedOut,
            Ok(None) => return Visit::Pending,
            Err(e) => {
                // Liveness unknown; treat like a deadline so the handle cannot
                // linger forever.
                warn!(cmd = %handle.command(), error = %e, "failed to query process status");
                return Visit::TimedOut;
            }
        }
    }

    // Exited. Keep reading on later ticks until EOF or the grace runs out.
    let grace_over = handle.exited_for().is_some_and(|t| t >= EXIT_DRAIN_GRACE);
    if handle.pipes_closed() || grace_over {
        Visit::Exited(handle.exit_status())
    } else {
        Visit::Pending
    }
}

fn complete(
    handle: ProcessHandle,
    status: ProcessStatus,
    exit: Option<std::process::ExitStatus>,
) -> FinishedResult {
    let (result, callback) = handle.finish(status, exit);

    debug!(
        cmd = %result.command,
        pid = ?result.pid,
        status = ?result.status,
        exit_code = ?result.exit_code,
        elapsed_ms = result.elapsed.as_millis() as u64,
        "process finished"
    );

    if let Some(callback) = callback {
        callback(&result);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::process::CommandLine;
    use std::sync::{Arc, Mutex};
    use std::time::Instant;

    fn sh(script: &str) -> CommandLine {
        CommandLine::shell("sh", script)
    }

    #[tokio::test]
    async fn empty_batch_returns_immediately() {
        let started = Instant::now();
        let results = ConcurrentExecutor::new().run(Vec::new()).await;
        assert!(results.is_empty());
        assert!(started.elapsed() < TICK);
    }

    #[tokio::test]
    async fn every_spec_gets_one_result_and_one_callback() {
        let calls = Arc::new(Mutex::new(Vec::new()));

        let specs = (0..4)
            .map(|i| {
                let calls = Arc::clone(&calls);
                ProcessSpec::new(sh(&format!("echo job{i}")))
                    .on_finished(move |r| calls.lock().unwrap().push(r.stdout.clone()))
            })
            .collect();

        let results = ConcurrentExecutor::with_tick(Duration::from_millis(20))
            .run(specs)
            .await;

        assert_eq!(results.len(), 4);
        assert!(results.iter().all(|r| r.status == ProcessStatus::Completed));
        assert!(results.iter().all(|r| r.exit_code == Some(0)));

        let mut seen = calls.lock().unwrap().clone();
        seen.sort();
        assert_eq!(seen, vec!["job0\n", "job1\n", "job2\n", "job3\n"]);
    }

    #[tokio::test]
    async fn unbounded_process_output_is_captured_in_full() {
        let spec = ProcessSpec::new(sh("sleep 1; echo ok")).with_timeout_secs(0);
        let results = ConcurrentExecutor::new().run(vec![spec]).await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].status, ProcessStatus::Completed);
        assert_eq!(results[0].stdout, "ok\n");
    }

    #[tokio::test]
    async fn timeout_kills_the_process() {
        let spec = ProcessSpec::new(CommandLine::new("sleep").arg("5")).with_timeout_secs(1);

        let started = Instant::now();
        let results = ConcurrentExecutor::new().run(vec![spec]).await;
        let took = started.elapsed();

        assert_eq!(results.len(), 1);
        let r = &results[0];
        assert!(r.is_timed_out());
        assert!(took >= Duration::from_secs(1));
        assert!(took < Duration::from_millis(1800), "took {took:?}");

        #[cfg(unix)]
        assert_eq!(r.stop_signal, Some(9));

        // The pid must be gone once the executor returns.
        #[cfg(target_os = "linux")]
        if let Some(pid) = r.pid {
            assert!(!std::path::Path::new(&format!("/proc/{pid}")).exists());
        }
    }

    #[tokio::test]
    async fn stderr_and_exit_code_are_reported() {
        let spec = ProcessSpec::new(sh("echo boom >&2; exit 3")).with_timeout_secs(5);
        let results = ConcurrentExecutor::with_tick(Duration::from_millis(20))
            .run(vec![spec])
            .await;

        assert_eq!(results[0].stderr, "boom\n");
        assert_eq!(results[0].exit_code, Some(3));
        assert!(!results[0].succeeded());
    }

    #[tokio::test]
    async fn results_follow_completion_order() {
        let specs = vec![
            ProcessSpec::new(sh("sleep 0.6; echo slow")),
            ProcessSpec::new(sh("echo fast")),
        ];
        let results = ConcurrentExecutor::with_tick(Duration::from_millis(50))
            .run(specs)
            .await;

        let outputs: Vec<_> = results.iter().map(|r| r.stdout.as_str()).collect();
        assert_eq!(outputs, vec!["fast\n", "slow\n"]);
    }

    #[tokio::test]
    async fn unspawnable_spec_is_dropped() {
        let specs = vec![
            ProcessSpec::new(CommandLine::new("/definitely/not/a/binary")),
            ProcessSpec::new(sh("echo fine")),
        ];
        let results = ConcurrentExecutor::with_tick(Duration::from_millis(20))
            .run(specs)
            .await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].stdout, "fine\n");
    }

    #[tokio::test]
    async fn large_output_does_not_stall_timed_process() {
        // More than a pipe buffer's worth; must be drained while running.
        let spec = ProcessSpec::new(sh("head -c 300000 /dev/zero | tr '\\0' x"))
            .with_timeout_secs(10);
        let results = ConcurrentExecutor::with_tick(Duration::from_millis(20))
            .run(vec![spec])
            .await;

        assert_eq!(results[0].status, ProcessStatus::Completed);
        assert_eq!(results[0].stdout.len(), 300_000);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn timeout_kills_what_the_child_forked() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let marker = dir.path().join("DONE");
        // The inner shell is a grandchild of the executor.
        let script = format!("sh -c 'sleep 2; touch {}'; true", marker.display());
        let spec = ProcessSpec::new(sh(&script)).with_timeout_secs(1);

        let results = ConcurrentExecutor::with_tick(Duration::from_millis(50))
            .run(vec![spec])
            .await;
        assert!(results[0].is_timed_out());

        sleep(Duration::from_millis(2500)).await;
        assert!(!marker.exists(), "grandchild survived the timeout kill");
        Ok(())
    }

    #[tokio::test]
    async fn background_holder_of_pipes_does_not_stall_siblings() {
        let specs = vec![
            ProcessSpec::new(sh("sleep 6 & echo hi")),
            ProcessSpec::new(CommandLine::new("sleep").arg("20")).with_timeout_secs(1),
        ];

        let started = Instant::now();
        let results = ConcurrentExecutor::new().run(specs).await;
        let took = started.elapsed();

        assert_eq!(results.len(), 2);
        assert!(took < Duration::from_secs(3), "took {took:?}");

        let echoed = results.iter().find(|r| !r.is_timed_out()).unwrap();
        assert_eq!(echoed.stdout, "hi\n");
        assert_eq!(echoed.exit_code, Some(0));

        let killed = results.iter().find(|r| r.is_timed_out()).unwrap();
        assert!(killed.elapsed < Duration::from_millis(2500), "{:?}", killed.elapsed);
    }
}
