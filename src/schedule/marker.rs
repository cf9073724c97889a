// src/schedule/marker.rs

//! Last-run markers.
//!
//! One empty file per task under `<state_dir>/task/`, with the dotted task
//! name mapped to nested directories (`reports.daily` ->
//! `task/reports/daily`). Only the file's modification time is meaningful.
//! Markers are never deleted here. There is no locking: two schedulers on
//! the same host can both read a stale marker and run the task twice.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use anyhow::Result;
use chrono::{DateTime, Local, NaiveDateTime, SubsecRound};

use crate::fs::FileSystem;

#[derive(Debug, Clone)]
pub struct MarkerStore {
    fs: Arc<dyn FileSystem>,
    root: PathBuf,
}

impl MarkerStore {
    /// `state_dir` is the configured state directory; markers live in its
    /// `task/` subdirectory.
    pub fn new(fs: Arc<dyn FileSystem>, state_dir: impl AsRef<Path>) -> Self {
        Self {
            fs,
            root: state_dir.as_ref().join("task"),
        }
    }

    pub fn path_for(&self, task: &str) -> PathBuf {
        task.split('.')
            .fold(self.root.clone(), |path, segment| path.join(segment))
    }

    /// Local wall-clock time of the last run to the second, `None` if never
    /// run.
    pub fn last_run(&self, task: &str) -> Result<Option<NaiveDateTime>> {
        let mtime = self.fs.modified(&self.path_for(task))?;
        Ok(mtime.map(|t| DateTime::<Local>::from(t).naive_local().trunc_subsecs(0)))
    }

    /// Create the marker's parent directories.
    pub fn prepare(&self, task: &str) -> Result<()> {
        match self.path_for(task).parent() {
            Some(parent) => self.fs.create_dir_all(parent),
            None => Ok(()),
        }
    }

    /// Record a run starting at `at`, truncated to the second.
    pub fn touch(&self, task: &str, at: DateTime<Local>) -> Result<()> {
        self.prepare(task)?;
        self.fs
            .touch(&self.path_for(task), SystemTime::from(at.trunc_subsecs(0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;
    use chrono::TimeZone;

    #[test]
    fn dotted_names_become_nested_paths() {
        let store = MarkerStore::new(Arc::new(MockFileSystem::new()), "/state");
        assert_eq!(
            store.path_for("reports.daily"),
            PathBuf::from("/state/task/reports/daily")
        );
        assert_eq!(store.path_for("ping"), PathBuf::from("/state/task/ping"));
    }

    #[test]
    fn touch_then_read_back() {
        let fs = MockFileSystem::new();
        let store = MarkerStore::new(Arc::new(fs.clone()), "/state");

        assert_eq!(store.last_run("reports.daily").unwrap(), None);

        let when = Local.with_ymd_and_hms(2024, 6, 12, 12, 0, 0).unwrap();
        store.touch("reports.daily", when).unwrap();

        assert!(fs.is_dir(Path::new("/state/task/reports")));
        assert_eq!(
            store.last_run("reports.daily").unwrap(),
            Some(when.naive_local())
        );
    }

    #[test]
    fn marker_times_are_whole_seconds() {
        let fs = MockFileSystem::new();
        let store = MarkerStore::new(Arc::new(fs.clone()), "/state");

        let second = Local.with_ymd_and_hms(2024, 6, 12, 12, 0, 0).unwrap();
        store
            .touch("ping", second + chrono::TimeDelta::milliseconds(350))
            .unwrap();

        assert_eq!(store.last_run("ping").unwrap(), Some(second.naive_local()));
        assert_eq!(
            fs.modified(Path::new("/state/task/ping")).unwrap(),
            Some(SystemTime::from(second))
        );
    }

    #[test]
    fn real_filesystem_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = MarkerStore::new(Arc::new(crate::fs::RealFileSystem), dir.path());

        let when = Local.with_ymd_and_hms(2024, 6, 12, 12, 0, 0).unwrap();
        store.touch("a.b.c", when).unwrap();

        assert!(dir.path().join("task/a/b/c").is_file());
        assert_eq!(store.last_run("a.b.c").unwrap(), Some(when.naive_local()));
    }
}
