// src/fs/mod.rs

use std::fmt::Debug;
use std::fs;
use std::io;
use std::path::Path;
use std::time::SystemTime;

use anyhow::{Context, Result};

pub mod mock;

/// The slice of filesystem behaviour the marker store relies on.
pub trait FileSystem: Send + Sync + Debug {
    /// Modification time, or `None` if the path does not exist.
    fn modified(&self, path: &Path) -> Result<Option<SystemTime>>;

    /// Create the file if missing and set its modification time.
    fn touch(&self, path: &Path, at: SystemTime) -> Result<()>;

    fn create_dir_all(&self, path: &Path) -> Result<()>;
}

/// Implementation that uses `std::fs`.
#[derive(Debug, Clone, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn modified(&self, path: &Path) -> Result<Option<SystemTime>> {
        match fs::metadata(path) {
            Ok(meta) => {
                let mtime = meta
                    .modified()
                    .with_context(|| format!("reading mtime of {:?}", path))?;
                Ok(Some(mtime))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("stat {:?}", path)),
        }
    }

    fn touch(&self, path: &Path, at: SystemTime) -> Result<()> {
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("opening {:?}", path))?;
        file.set_modified(at)
            .with_context(|| format!("setting mtime of {:?}", path))?;
        Ok(())
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).with_context(|| format!("creating dir {:?}", path))
    }
}
