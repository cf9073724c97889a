// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::task::{TaskDefinition, TimeConstraints};

/// Configuration file as deserialised from TOML, before validation.
///
/// ```toml
/// [config]
/// state_dir = ".cronfan"
///
/// [task."reports.daily"]
/// cmd = "./bin/report --daily"
/// hour = 3
/// minute = 0
/// timeout = 600
///
/// [task.heartbeat]
/// cmd = "curl -fsS https://example.invalid/ping"
/// interval = 300
/// ```
///
/// All sections are optional at this stage; [`ConfigFile`] is only produced
/// through validation (see `validate.rs`).
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    /// Global settings from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// All tasks from `[task.<name>]`, keyed by dotted task name.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,
}

/// Validated configuration.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub task: BTreeMap<String, TaskConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(config: ConfigSection, task: BTreeMap<String, TaskConfig>) -> Self {
        Self { config, task }
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigSection {
    /// Directory holding last-run markers. Relative paths are resolved
    /// against the directory of the config file.
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,

    /// Shell used to run task commands (`<shell> -c <cmd>`).
    #[serde(default = "default_shell")]
    pub shell: String,
}

fn default_state_dir() -> PathBuf {
    PathBuf::from(".cronfan")
}

fn default_shell() -> String {
    "sh".to_string()
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            state_dir: default_state_dir(),
            shell: default_shell(),
        }
    }
}

/// `[task.<name>]` section.
///
/// Any of `month`, `day_of_month`, `day_of_week`, `hour`, `minute` pins the
/// task to matching wall-clock times. With none of them set, the task runs
/// whenever `interval` seconds have passed since its last run.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskConfig {
    /// Shell command to execute.
    pub cmd: String,

    #[serde(default)]
    pub month: Option<u32>,

    #[serde(default)]
    pub day_of_month: Option<u32>,

    /// 1 = Monday .. 7 = Sunday.
    #[serde(default)]
    pub day_of_week: Option<u32>,

    #[serde(default)]
    pub hour: Option<u32>,

    #[serde(default)]
    pub minute: Option<u32>,

    /// Seconds between runs when no time constraint is set.
    #[serde(default = "default_interval")]
    pub interval: u64,

    /// Seconds before the task process is killed; 0 disables.
    #[serde(default)]
    pub timeout: u64,

    /// Default parameters passed to the command as positional arguments.
    #[serde(default)]
    pub params: Vec<String>,
}

fn default_interval() -> u64 {
    60
}

impl TaskConfig {
    pub fn constraints(&self) -> TimeConstraints {
        TimeConstraints {
            month: self.month,
            day_of_month: self.day_of_month,
            day_of_week: self.day_of_week,
            hour: self.hour,
            minute: self.minute,
        }
    }

    pub fn definition(&self) -> TaskDefinition {
        TaskDefinition {
            constraints: self.constraints(),
            interval: Duration::from_secs(self.interval),
            timeout: Duration::from_secs(self.timeout),
            params: self.params.clone(),
        }
    }
}
