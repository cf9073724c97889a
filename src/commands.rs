// src/commands.rs

//! One function per CLI subcommand.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use chrono::Local;
use tracing::{debug, info};

use crate::cli::{CliArgs, Command, ScheduleCommand, TaskCommand};
use crate::config::{ConfigFile, load_and_validate, resolve_state_dir};
use crate::fs::RealFileSystem;
use crate::runner::{CommandRunner, RunMode};
use crate::schedule::{
    MarkerStore, ScheduleFanOut, SelfInvocation, TaskRunOptions, TaskRunOutcome, clock, crontab,
    history_line, run_task, split_params,
};
use crate::task::TaskRegistry;

/// Config-derived state shared by the commands.
struct Loaded {
    registry: TaskRegistry,
    markers: MarkerStore,
}

fn load(args: &CliArgs) -> Result<Loaded> {
    let cfg: ConfigFile = load_and_validate(&args.config)
        .with_context(|| format!("loading config {:?}", args.config))?;
    let state_dir = resolve_state_dir(&cfg, &args.config);
    debug!(config = ?args.config, ?state_dir, tasks = cfg.task.len(), "config loaded");

    Ok(Loaded {
        registry: TaskRegistry::from_config(&cfg)?,
        markers: MarkerStore::new(Arc::new(RealFileSystem), state_dir),
    })
}

pub async fn dispatch(args: CliArgs) -> Result<()> {
    match &args.command {
        Command::Schedule(ScheduleCommand::Run { tasks }) => schedule_run(&args, tasks).await,
        Command::Schedule(ScheduleCommand::Install { print }) => {
            crontab::install(&args.config, *print).await
        }
        Command::Task(TaskCommand::Run {
            name,
            schedule,
            params,
        }) => task_run(&args, name, *schedule, params.as_deref()).await,
        Command::Task(TaskCommand::List) => task_list(&args),
    }
}

async fn schedule_run(args: &CliArgs, only: &[String]) -> Result<()> {
    let loaded = load(args)?;
    let mode = RunMode::resolve(args.always, args.timeout.unwrap_or(0));
    let mut runner = CommandRunner::new("schedule run", mode)?;

    runner
        .execute(|| async move {
            let invocation = SelfInvocation::current(&args.config)?;
            let mut fanout = ScheduleFanOut::new(loaded.registry, loaded.markers, invocation);
            fanout.run(only, Local::now().naive_local()).await?;
            Ok(())
        })
        .await
}

async fn task_run(args: &CliArgs, name: &str, schedule: bool, params: Option<&str>) -> Result<()> {
    let loaded = load(args)?;
    let task = loaded.registry.get(name)?;

    let timeout = args
        .timeout
        .unwrap_or_else(|| task.definition().timeout.as_secs());
    let mode = RunMode::resolve(args.always, timeout);
    let mut runner = CommandRunner::new(format!("task run {name}"), mode)?;

    // In Direct mode only a run that was not skipped makes history; a
    // re-exec parent always records its child.
    let ran = Arc::new(AtomicBool::new(mode != RunMode::Direct));
    {
        let ran = Arc::clone(&ran);
        let name = name.to_string();
        runner.on_shutdown(move |report| {
            if ran.load(Ordering::SeqCst) {
                info!(
                    target: "cronfan::task::history",
                    "{}",
                    history_line(&name, report.started_at, report.ended_at, report.elapsed)
                );
            }
        });
    }

    runner
        .execute(|| async move {
            let opts = TaskRunOptions {
                schedule,
                params: params.map(split_params),
            };
            let outcome =
                run_task(&loaded.registry, &loaded.markers, name, &opts, Local::now()).await?;
            if !matches!(outcome, TaskRunOutcome::Skipped(_)) {
                ran.store(true, Ordering::SeqCst);
            }
            Ok(())
        })
        .await
}

fn task_list(args: &CliArgs) -> Result<()> {
    let loaded = load(args)?;
    let now = Local::now().naive_local();

    for name in loaded.registry.list() {
        let task = loaded.registry.get(name)?;
        let definition = task.definition();
        let last_run = loaded.markers.last_run(name)?;

        let last = last_run
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "never".to_string());
        let status = match clock::check(definition, now, last_run) {
            clock::Eligibility::Eligible => "due now".to_string(),
            clock::Eligibility::Skip(reason) => format!("not due: {reason}"),
        };

        println!("{name}");
        println!("    schedule: {}", clock::describe(definition));
        if !definition.timeout.is_zero() {
            println!("    timeout:  {}s", definition.timeout.as_secs());
        }
        if !definition.params.is_empty() {
            println!("    params:   {}", definition.params.join(";"));
        }
        println!("    last run: {last}");
        println!("    status:   {status}");
    }

    Ok(())
}
