// src/task/registry.rs

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::ConfigFile;
use crate::errors::{CronfanError, Result};
use crate::task::{ShellTask, Task, validate_task_name};

/// Name -> task lookup, resolved once at startup.
#[derive(Debug, Default, Clone)]
pub struct TaskRegistry {
    tasks: BTreeMap<String, Arc<dyn Task>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// One [`ShellTask`] per `[task.<name>]` section.
    pub fn from_config(cfg: &ConfigFile) -> Result<Self> {
        let mut registry = Self::new();
        for (name, task_cfg) in cfg.task.iter() {
            let task = ShellTask::from_config(name, &cfg.config.shell, task_cfg);
            registry.register(name, Arc::new(task))?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, name: &str, task: Arc<dyn Task>) -> Result<()> {
        validate_task_name(name)?;
        if self.tasks.contains_key(name) {
            return Err(CronfanError::ConfigError(format!(
                "task '{name}' is registered twice"
            )));
        }
        self.tasks.insert(name.to_string(), task);
        Ok(())
    }

    /// All task names, sorted.
    pub fn list(&self) -> impl Iterator<Item = &str> {
        self.tasks.keys().map(String::as_str)
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Task>> {
        self.tasks
            .get(name)
            .cloned()
            .ok_or_else(|| CronfanError::TaskNotFound(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
