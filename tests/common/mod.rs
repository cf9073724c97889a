#![allow(dead_code)]

use std::path::{Path, PathBuf};

pub use cronfan_test_utils::init_tracing;

/// Write `contents` as `Cronfan.toml` in `dir` and return its path.
pub fn write_config(dir: &Path, contents: &str) -> PathBuf {
    let path = dir.join("Cronfan.toml");
    std::fs::write(&path, contents).expect("write config");
    path
}

/// TOML string literal for a path.
pub fn toml_path(path: &Path) -> String {
    format!("'{}'", path.display())
}
