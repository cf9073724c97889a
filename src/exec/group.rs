// src/exec/group.rs

//! Every spawned child leads its own process group, so a kill reaches the
//! shell it started and anything that shell forked.

use tracing::warn;

/// Kill switch for one child's process group. Armed from spawn until the
/// leader exits on its own; firing it twice is harmless.
#[derive(Debug)]
pub(crate) struct ProcessGroup {
    pgid: Option<u32>,
}

impl ProcessGroup {
    pub(crate) fn new(leader: Option<u32>) -> Self {
        Self { pgid: leader }
    }

    pub(crate) fn is_armed(&self) -> bool {
        self.pgid.is_some()
    }

    /// SIGKILL every member of the group.
    pub(crate) fn kill(&mut self) {
        if let Some(pgid) = self.pgid.take() {
            kill_group(pgid);
        }
    }

    /// The leader exited by itself. Leftover background processes are not
    /// ours to kill.
    pub(crate) fn release(&mut self) {
        self.pgid = None;
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        self.kill();
    }
}

#[cfg(unix)]
fn kill_group(pgid: u32) {
    use nix::errno::Errno;
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    match killpg(Pid::from_raw(pgid as i32), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => warn!(pgid, error = %e, "failed to kill process group"),
    }
}

#[cfg(not(unix))]
fn kill_group(pgid: u32) {
    warn!(pgid, "process groups are unix-only; only the direct child is killed");
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn released_group_is_disarmed() {
        let mut group = ProcessGroup::new(Some(u32::MAX / 2));
        assert!(group.is_armed());
        group.release();
        assert!(!group.is_armed());
    }

    #[test]
    fn killing_a_vanished_group_is_quiet() {
        // No such process group; ESRCH is swallowed.
        let mut group = ProcessGroup::new(Some(i32::MAX as u32));
        group.kill();
        group.kill();
        assert!(!group.is_armed());
    }
}
