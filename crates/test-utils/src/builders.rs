#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::Path;

use cronfan::config::{ConfigFile, ConfigSection, RawConfigFile, TaskConfig};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                task: BTreeMap::new(),
            },
        }
    }

    pub fn state_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.config.config.state_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn shell(mut self, shell: &str) -> Self {
        self.config.config.shell = shell.to_string();
        self
    }

    pub fn with_task(mut self, name: &str, task: TaskConfig) -> Self {
        self.config.task.insert(name.to_string(), task);
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`. Starts as an interval task (60s, no timeout).
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn new(cmd: &str) -> Self {
        Self {
            task: TaskConfig {
                cmd: cmd.to_string(),
                month: None,
                day_of_month: None,
                day_of_week: None,
                hour: None,
                minute: None,
                interval: 60,
                timeout: 0,
                params: vec![],
            },
        }
    }

    pub fn month(mut self, month: u32) -> Self {
        self.task.month = Some(month);
        self
    }

    pub fn day_of_month(mut self, day: u32) -> Self {
        self.task.day_of_month = Some(day);
        self
    }

    pub fn day_of_week(mut self, day: u32) -> Self {
        self.task.day_of_week = Some(day);
        self
    }

    pub fn hour(mut self, hour: u32) -> Self {
        self.task.hour = Some(hour);
        self
    }

    pub fn minute(mut self, minute: u32) -> Self {
        self.task.minute = Some(minute);
        self
    }

    pub fn interval(mut self, secs: u64) -> Self {
        self.task.interval = secs;
        self
    }

    pub fn timeout(mut self, secs: u64) -> Self {
        self.task.timeout = secs;
        self
    }

    pub fn param(mut self, param: &str) -> Self {
        self.task.params.push(param.to_string());
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}
