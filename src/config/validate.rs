// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile, TaskConfig};
use crate::errors::{CronfanError, Result};
use crate::task::validate_task_name;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = CronfanError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.config, raw.task))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_global_config(cfg)?;
    for (name, task) in cfg.task.iter() {
        validate_task_name(name)?;
        validate_task(name, task)?;
    }
    Ok(())
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(CronfanError::ConfigError(
            "config must contain at least one [task.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.shell.trim().is_empty() {
        return Err(CronfanError::ConfigError(
            "[config].shell must not be empty".to_string(),
        ));
    }
    if cfg.config.state_dir.as_os_str().is_empty() {
        return Err(CronfanError::ConfigError(
            "[config].state_dir must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_task(name: &str, task: &TaskConfig) -> Result<()> {
    if task.cmd.trim().is_empty() {
        return Err(CronfanError::ConfigError(format!(
            "task '{name}' has an empty `cmd`"
        )));
    }

    check_range(name, "month", task.month, 1, 12)?;
    check_range(name, "day_of_month", task.day_of_month, 1, 31)?;
    check_range(name, "day_of_week", task.day_of_week, 1, 7)?;
    check_range(name, "hour", task.hour, 0, 23)?;
    check_range(name, "minute", task.minute, 0, 59)?;

    if task.interval == 0 {
        return Err(CronfanError::ConfigError(format!(
            "task '{name}': `interval` must be >= 1 second (got 0)"
        )));
    }

    Ok(())
}

fn check_range(task: &str, field: &str, value: Option<u32>, min: u32, max: u32) -> Result<()> {
    match value {
        Some(v) if v < min || v > max => Err(CronfanError::ConfigError(format!(
            "task '{task}': `{field}` must be within {min}..={max} (got {v})"
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_src: &str) -> Result<ConfigFile> {
        let raw: RawConfigFile = toml::from_str(toml_src)?;
        ConfigFile::try_from(raw)
    }

    #[test]
    fn empty_config_is_rejected() {
        let err = parse("").unwrap_err();
        assert!(matches!(err, CronfanError::ConfigError(_)));
    }

    #[test]
    fn out_of_range_fields_are_rejected() {
        let err = parse(
            r#"
            [task.a]
            cmd = "x"
            day_of_week = 0
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("day_of_week"));

        let err = parse(
            r#"
            [task.a]
            cmd = "x"
            minute = 60
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("minute"));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let err = parse(
            r#"
            [task.a]
            cmd = "x"
            interval = 0
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("interval"));
    }

    #[test]
    fn bad_task_names_are_rejected() {
        let err = parse(
            r#"
            [task."../escape"]
            cmd = "x"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, CronfanError::InvalidTaskName(_)));
    }

    #[test]
    fn valid_config_passes() {
        let cfg = parse(
            r#"
            [task."reports.daily"]
            cmd = "report"
            hour = 23
            minute = 59
            "#,
        )
        .unwrap();
        assert!(cfg.task.contains_key("reports.daily"));
    }
}
