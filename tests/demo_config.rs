// tests/demo_config.rs
mod common;
use crate::common::init_tracing;

use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;

use cronfan::config::load_and_validate;
use cronfan::schedule::clock;
use cronfan::task::TaskRegistry;

type TestResult = Result<(), Box<dyn Error>>;

/// Sanity-check that demos/Cronfan.toml is wired the way its comments say.
#[test]
fn demo_config_is_parsed_correctly() -> TestResult {
    init_tracing();

    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let cfg = load_and_validate(manifest_dir.join("demos/Cronfan.toml"))?;

    assert_eq!(cfg.config.state_dir, PathBuf::from(".cronfan"));
    assert_eq!(cfg.config.shell, "sh");
    assert_eq!(cfg.task.len(), 4);

    let daily = cfg.task.get("reports.daily").expect("reports.daily must exist");
    assert_eq!((daily.hour, daily.minute), (Some(3), Some(0)));
    assert_eq!(daily.timeout, 600);
    assert_eq!(daily.params, vec!["--format".to_string(), "csv".to_string()]);

    let vacuum = cfg.task.get("maintenance.vacuum").expect("maintenance.vacuum must exist");
    assert_eq!(vacuum.day_of_week, Some(7));

    let heartbeat = cfg.task.get("heartbeat").expect("heartbeat must exist");
    assert!(heartbeat.constraints().is_empty());
    assert_eq!(heartbeat.definition().interval, Duration::from_secs(300));

    Ok(())
}

#[test]
fn demo_registry_describes_every_task() -> TestResult {
    init_tracing();

    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let cfg = load_and_validate(manifest_dir.join("demos/Cronfan.toml"))?;
    let registry = TaskRegistry::from_config(&cfg)?;

    let names: Vec<&str> = registry.list().collect();
    assert_eq!(
        names,
        ["billing.invoice", "heartbeat", "maintenance.vacuum", "reports.daily"]
    );

    let described: Vec<String> = names
        .iter()
        .map(|n| registry.get(n).map(|t| clock::describe(t.definition())))
        .collect::<Result<_, _>>()?;
    assert_eq!(
        described,
        [
            "day_of_month=01 hour=00 minute=30",
            "every 300s",
            "day_of_week=07 hour=23 minute=45",
            "hour=03 minute=00",
        ]
    );

    Ok(())
}
