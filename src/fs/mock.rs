// src/fs/mock.rs

use super::FileSystem;
use anyhow::{Result, anyhow};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

#[derive(Debug, Clone)]
pub enum MockEntry {
    File { modified: SystemTime },
    Dir,
}

/// In-memory filesystem for marker tests. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    entries: Arc<Mutex<HashMap<PathBuf, MockEntry>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed a file with the given mtime (parents are created implicitly).
    pub fn add_file(&self, path: impl AsRef<Path>, modified: SystemTime) {
        let path = path.as_ref();
        let mut entries = self.entries.lock().unwrap();
        if let Some(parent) = path.parent() {
            Self::ensure_dirs(&mut entries, parent);
        }
        entries.insert(path.to_path_buf(), MockEntry::File { modified });
    }

    pub fn is_dir(&self, path: &Path) -> bool {
        let entries = self.entries.lock().unwrap();
        matches!(entries.get(path), Some(MockEntry::Dir))
    }

    fn ensure_dirs(entries: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
        for ancestor in path.ancestors() {
            if ancestor.as_os_str().is_empty() {
                continue;
            }
            entries
                .entry(ancestor.to_path_buf())
                .or_insert(MockEntry::Dir);
        }
    }
}

impl FileSystem for MockFileSystem {
    fn modified(&self, path: &Path) -> Result<Option<SystemTime>> {
        let entries = self.entries.lock().unwrap();
        match entries.get(path) {
            Some(MockEntry::File { modified }) => Ok(Some(*modified)),
            Some(MockEntry::Dir) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Ok(None),
        }
    }

    fn touch(&self, path: &Path, at: SystemTime) -> Result<()> {
        let mut entries = self.entries.lock().unwrap();
        let parent_exists = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                matches!(entries.get(parent), Some(MockEntry::Dir))
            }
            _ => true,
        };
        if !parent_exists {
            return Err(anyhow!("Parent directory not found: {:?}", path));
        }
        if let Some(MockEntry::Dir) = entries.get(path) {
            return Err(anyhow!("Is a directory: {:?}", path));
        }
        entries.insert(path.to_path_buf(), MockEntry::File { modified: at });
        Ok(())
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        let mut entries = self.entries.lock().unwrap();
        if let Some(MockEntry::File { .. }) = entries.get(path) {
            return Err(anyhow!("File exists: {:?}", path));
        }
        Self::ensure_dirs(&mut entries, path);
        Ok(())
    }
}
