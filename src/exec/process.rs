// src/exec/process.rs

//! Process data model: what to run ([`ProcessSpec`]), the live state of a
//! spawned process ([`ProcessHandle`]) and what came out of it
//! ([`FinishedResult`]).

use std::fmt;
use std::pin::Pin;
use std::process::{ExitStatus, Stdio};
use std::task::Poll;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use tokio::io::{AsyncRead, ReadBuf};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tracing::warn;

use crate::exec::group::ProcessGroup;

/// Size of a single non-blocking read from a pipe.
const READ_CHUNK: usize = 8192;

/// Upper bound on reads per pipe per visit, so one chatty process cannot
/// monopolise a tick.
const MAX_READS_PER_VISIT: usize = 16;

/// Completion callback attached to a [`ProcessSpec`]. Called exactly once.
pub type Callback = Box<dyn FnOnce(&FinishedResult) + Send>;

/// A program plus its argument list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    program: String,
    args: Vec<String>,
}

impl CommandLine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// `<shell> -c <script>`.
    pub fn shell(shell: &str, script: &str) -> Self {
        Self::new(shell).arg("-c").arg(script)
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", quote(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", quote(arg))?;
        }
        Ok(())
    }
}

fn quote(s: &str) -> String {
    let plain = !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,@%+".contains(c));
    if plain {
        s.to_string()
    } else {
        format!("'{}'", s.replace('\'', r"'\''"))
    }
}

/// Immutable description of one process to run as part of a batch.
pub struct ProcessSpec {
    command: CommandLine,
    timeout: Option<Duration>,
    callback: Option<Callback>,
}

impl ProcessSpec {
    pub fn new(command: CommandLine) -> Self {
        Self {
            command,
            timeout: None,
            callback: None,
        }
    }

    /// Deadline for the process. `Duration::ZERO` means unbounded.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = (!timeout.is_zero()).then_some(timeout);
        self
    }

    pub fn with_timeout_secs(self, secs: u64) -> Self {
        self.with_timeout(Duration::from_secs(secs))
    }

    pub fn on_finished<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(&FinishedResult) + Send + 'static,
    {
        self.callback = Some(Box::new(callback));
        self
    }

    pub fn command(&self) -> &CommandLine {
        &self.command
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Split into parts; used by executors that do not spawn real processes.
    pub fn into_parts(self) -> (CommandLine, Option<Duration>, Option<Callback>) {
        (self.command, self.timeout, self.callback)
    }
}

impl fmt::Debug for ProcessSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessSpec")
            .field("command", &self.command)
            .field("timeout", &self.timeout)
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}

/// How a process left the pending set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    Completed,
    TimedOut,
}

/// Produced exactly once per spawned [`ProcessSpec`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishedResult {
    pub command: String,
    pub pid: Option<u32>,
    pub started_at: DateTime<Local>,
    pub ended_at: DateTime<Local>,
    pub elapsed: Duration,
    pub stdout: String,
    pub stderr: String,
    pub status: ProcessStatus,
    pub exit_code: Option<i32>,
    /// Signal that terminated the process, if any.
    pub stop_signal: Option<i32>,
}

impl FinishedResult {
    pub fn is_timed_out(&self) -> bool {
        self.status == ProcessStatus::TimedOut
    }

    pub fn succeeded(&self) -> bool {
        self.status == ProcessStatus::Completed && self.exit_code == Some(0)
    }
}

/// Live state of one spawned process. Owned by the executor until the
/// process exits or is killed.
pub struct ProcessHandle {
    command: CommandLine,
    timeout: Option<Duration>,
    callback: Option<Callback>,
    child: Child,
    pid: Option<u32>,
    stdout_pipe: Option<ChildStdout>,
    stderr_pipe: Option<ChildStderr>,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    group: ProcessGroup,
    exited: Option<(ExitStatus, Instant)>,
    started_at: DateTime<Local>,
    started: Instant,
}

impl fmt::Debug for ProcessHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessHandle")
            .field("command", &self.command)
            .field("pid", &self.pid)
            .field("timeout", &self.timeout)
            .field("stdout_open", &self.stdout_pipe.is_some())
            .field("stderr_open", &self.stderr_pipe.is_some())
            .field("exited", &self.exited.map(|(status, _)| status))
            .field("group_armed", &self.group.is_armed())
            .finish_non_exhaustive()
    }
}

impl ProcessHandle {
    /// Spawn the process with stdin closed and stdout/stderr piped. On unix
    /// the child leads a fresh process group.
    pub fn spawn(spec: ProcessSpec) -> std::io::Result<Self> {
        let (command, timeout, callback) = spec.into_parts();

        let mut cmd = command.to_command();
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);
        let mut child = cmd.spawn()?;

        let pid = child.id();
        let stdout_pipe = child.stdout.take();
        let stderr_pipe = child.stderr.take();

        Ok(Self {
            command,
            timeout,
            callback,
            child,
            pid,
            stdout_pipe,
            stderr_pipe,
            stdout: Vec::new(),
            stderr: Vec::new(),
            group: ProcessGroup::new(pid),
            exited: None,
            started_at: Local::now(),
            started: Instant::now(),
        })
    }

    pub fn command(&self) -> &CommandLine {
        &self.command
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn is_past_deadline(&self) -> bool {
        self.timeout.is_some_and(|t| self.elapsed() >= t)
    }

    /// Move whatever is readable right now into the buffers. Pipes that hit
    /// EOF are closed.
    pub async fn drain_ready(&mut self) {
        drain_pipe_ready(&mut self.stdout_pipe, &mut self.stdout, &self.command).await;
        drain_pipe_ready(&mut self.stderr_pipe, &mut self.stderr, &self.command).await;
    }

    /// Both pipes reached EOF.
    pub fn pipes_closed(&self) -> bool {
        self.stdout_pipe.is_none() && self.stderr_pipe.is_none()
    }

    /// Non-blocking liveness query. `Some(status)` once the process exited.
    pub fn try_exit(&mut self) -> std::io::Result<Option<ExitStatus>> {
        self.child.try_wait()
    }

    /// Remember that the process exited by itself. Its group is left alone
    /// from here on.
    pub fn record_exit(&mut self, status: ExitStatus) {
        self.group.release();
        self.exited.get_or_insert((status, Instant::now()));
    }

    /// Exit status recorded by [`record_exit`](Self::record_exit).
    pub fn exit_status(&self) -> Option<ExitStatus> {
        self.exited.map(|(status, _)| status)
    }

    /// Time since the exit was recorded.
    pub fn exited_for(&self) -> Option<Duration> {
        self.exited.map(|(_, at)| at.elapsed())
    }

    /// Stop reading. Anything a leftover background process writes later is
    /// lost.
    pub fn close_pipes(&mut self) {
        self.stdout_pipe = None;
        self.stderr_pipe = None;
    }

    /// SIGKILL the whole process group (just the child off unix), then reap.
    pub async fn kill(&mut self) -> Option<ExitStatus> {
        self.group.kill();
        if let Err(e) = self.child.kill().await {
            warn!(cmd = %self.command, pid = ?self.pid, error = %e, "failed to kill process");
        }
        self.close_pipes();
        self.child.try_wait().ok().flatten()
    }

    /// Consume the handle, producing the result and handing back the
    /// callback so the caller decides when to invoke it.
    pub fn finish(
        self,
        status: ProcessStatus,
        exit: Option<ExitStatus>,
    ) -> (FinishedResult, Option<Callback>) {
        let result = FinishedResult {
            command: self.command.to_string(),
            pid: self.pid,
            started_at: self.started_at,
            ended_at: Local::now(),
            elapsed: self.started.elapsed(),
            stdout: String::from_utf8_lossy(&self.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&self.stderr).into_owned(),
            status,
            exit_code: exit.and_then(|s| s.code()),
            stop_signal: exit.and_then(termination_signal),
        };
        (result, self.callback)
    }
}

/// Zero-wait readiness check plus read, repeated while data keeps coming.
async fn drain_pipe_ready<R>(pipe: &mut Option<R>, buf: &mut Vec<u8>, command: &CommandLine)
where
    R: AsyncRead + Unpin,
{
    let mut close = false;

    if let Some(reader) = pipe.as_mut() {
        let mut chunk = [0u8; READ_CHUNK];

        for _ in 0..MAX_READS_PER_VISIT {
            let polled = std::future::poll_fn(|cx| {
                let mut read_buf = ReadBuf::new(&mut chunk);
                let res = Pin::new(&mut *reader)
                    .poll_read(cx, &mut read_buf)
                    .map_ok(|()| read_buf.filled().len());
                Poll::Ready(res)
            })
            .await;

            match polled {
                Poll::Pending => break,
                Poll::Ready(Ok(0)) => {
                    close = true;
                    break;
                }
                Poll::Ready(Ok(n)) => buf.extend_from_slice(&chunk[..n]),
                Poll::Ready(Err(e)) => {
                    warn!(cmd = %command, error = %e, "pipe read failed; closing it");
                    close = true;
                    break;
                }
            }
        }
    }

    if close {
        *pipe = None;
    }
}

#[cfg(unix)]
fn termination_signal(status: ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn termination_signal(_status: ExitStatus) -> Option<i32> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_quotes_only_when_needed() {
        let cmd = CommandLine::shell("sh", "echo 'hi there'");
        assert_eq!(cmd.to_string(), r"sh -c 'echo '\''hi there'\'''");

        let plain = CommandLine::new("/usr/bin/cronfan").args(["task", "run", "a.b", "--timeout=0"]);
        assert_eq!(plain.to_string(), "/usr/bin/cronfan task run a.b --timeout=0");
    }

    #[test]
    fn zero_timeout_means_unbounded() {
        let spec = ProcessSpec::new(CommandLine::new("true")).with_timeout_secs(0);
        assert_eq!(spec.timeout(), None);

        let spec = ProcessSpec::new(CommandLine::new("true")).with_timeout_secs(3);
        assert_eq!(spec.timeout(), Some(Duration::from_secs(3)));
    }
}
