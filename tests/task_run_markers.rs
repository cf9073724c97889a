// tests/task_run_markers.rs
mod common;
use crate::common::init_tracing;

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, TimeDelta, TimeZone};
use cronfan_test_utils::{CountingTask, with_timeout};

use cronfan::fs::RealFileSystem;
use cronfan::schedule::{MarkerStore, TaskRunOptions, TaskRunOutcome, run_task};
use cronfan::task::{TaskDefinition, TaskRegistry};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn interval_task_runs_once_per_interval_on_disk() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let markers = MarkerStore::new(Arc::new(RealFileSystem), dir.path());

    let task = CountingTask::new(TaskDefinition::every(Duration::from_secs(60)));
    let runs = task.runs();
    let mut registry = TaskRegistry::new();
    registry.register("ops.heartbeat", Arc::new(task))?;

    let t0 = Local.with_ymd_and_hms(2024, 6, 12, 12, 0, 0).unwrap();
    let opts = TaskRunOptions::default();

    let first = run_task(&registry, &markers, "ops.heartbeat", &opts, t0).await?;
    let second = run_task(&registry, &markers, "ops.heartbeat", &opts, t0 + TimeDelta::seconds(30)).await?;
    let third = run_task(&registry, &markers, "ops.heartbeat", &opts, t0 + TimeDelta::seconds(61)).await?;

    assert_eq!(first, TaskRunOutcome::Succeeded);
    assert!(matches!(second, TaskRunOutcome::Skipped(_)));
    assert_eq!(third, TaskRunOutcome::Succeeded);
    assert_eq!(runs.lock().unwrap().len(), 2);

    assert!(dir.path().join("task/ops/heartbeat").is_file());
    assert_eq!(
        markers.last_run("ops.heartbeat")?,
        Some((t0 + TimeDelta::seconds(61)).naive_local())
    );

    Ok(())
}

#[tokio::test]
async fn daily_task_waits_for_next_day() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let markers = MarkerStore::new(Arc::new(RealFileSystem), dir.path());

    let task = CountingTask::new(TaskDefinition::default().at_hour(12).at_minute(0));
    let runs = task.runs();
    let mut registry = TaskRegistry::new();
    registry.register("reports.noon", Arc::new(task))?;

    let opts = TaskRunOptions::default();
    let day1 = Local.with_ymd_and_hms(2024, 6, 12, 12, 0, 0).unwrap();
    let day1_later = Local.with_ymd_and_hms(2024, 6, 12, 12, 0, 40).unwrap();
    let day2 = Local.with_ymd_and_hms(2024, 6, 13, 12, 0, 0).unwrap();

    run_task(&registry, &markers, "reports.noon", &opts, day1).await?;
    run_task(&registry, &markers, "reports.noon", &opts, day1_later).await?;
    run_task(&registry, &markers, "reports.noon", &opts, day2).await?;

    assert_eq!(runs.lock().unwrap().len(), 2);
    Ok(())
}

#[tokio::test]
async fn sub_second_start_jitter_does_not_skip_an_interval_run() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let markers = MarkerStore::new(Arc::new(RealFileSystem), dir.path());

    let task = CountingTask::new(TaskDefinition::every(Duration::from_secs(60)));
    let runs = task.runs();
    let mut registry = TaskRegistry::new();
    registry.register("ops.heartbeat", Arc::new(task))?;

    // Two cron starts, the second one landing slightly earlier in its second.
    let minute = Local.with_ymd_and_hms(2024, 6, 12, 12, 0, 0).unwrap();
    let first_start = minute + TimeDelta::milliseconds(350);
    let next_start = minute + TimeDelta::seconds(60) + TimeDelta::milliseconds(300);
    let opts = TaskRunOptions::default();

    let first = with_timeout(run_task(&registry, &markers, "ops.heartbeat", &opts, first_start)).await?;
    let next = with_timeout(run_task(&registry, &markers, "ops.heartbeat", &opts, next_start)).await?;

    assert_eq!(first, TaskRunOutcome::Succeeded);
    assert_eq!(next, TaskRunOutcome::Succeeded);
    assert_eq!(runs.lock().unwrap().len(), 2);

    Ok(())
}
