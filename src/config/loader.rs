// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and run validation.
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` default functions).
/// - Checks task names, field ranges and global settings.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// Default config path: `Cronfan.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Cronfan.toml")
}

/// Directory the config file lives in.
///
/// A bare filename like "Cronfan.toml" has an empty parent; fall back to the
/// current working directory then.
pub fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Resolve `[config].state_dir` against the config file's directory.
pub fn resolve_state_dir(cfg: &ConfigFile, config_path: &Path) -> PathBuf {
    let state_dir = &cfg.config.state_dir;
    if state_dir.is_absolute() {
        state_dir.clone()
    } else {
        config_root_dir(config_path).join(state_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn relative_state_dir_follows_config_location() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Cronfan.toml");
        let mut f = fs::File::create(&path).unwrap();
        writeln!(f, "[task.a]\ncmd = \"true\"").unwrap();

        let cfg = load_and_validate(&path).unwrap();
        assert_eq!(resolve_state_dir(&cfg, &path), dir.path().join(".cronfan"));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_and_validate("/nonexistent/Cronfan.toml").unwrap_err();
        assert!(matches!(err, crate::errors::CronfanError::IoError(_)));
    }
}
