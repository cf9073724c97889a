// src/config/mod.rs

//! Configuration loading and validation for cronfan.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate task names, field ranges and global settings (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, resolve_state_dir};
pub use model::{ConfigFile, ConfigSection, RawConfigFile, TaskConfig};
