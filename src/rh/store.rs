//! Persistence for the HR workflow.
//!
//! Everything is addressed by keys relative to the root folder, such as
//! `3/01_2025/payslip.pdf` or `14/base_01_2025.pdf`.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use log::debug;
use walkdir::WalkDir;

use super::scan::Snapshot;
use super::Layout;
use crate::output::write_atomic;

/// Snapshot of the last scan of a month.
pub trait SnapshotStore {
    fn load(&self, year: &str, month: &str) -> Result<Option<Snapshot>>;
    fn save(&self, year: &str, month: &str, snapshot: &Snapshot) -> Result<()>;
}

/// Files addressed by relative keys.
pub trait ArtifactStore {
    fn read(&self, key: &str) -> Result<Vec<u8>>;

    /// Replace the artifact at `key`; readers never observe a partial write.
    fn write(&self, key: &str, bytes: &[u8]) -> Result<()>;

    /// Names of the regular files directly inside `dir`, sorted.
    /// Fails when the directory does not exist.
    fn list(&self, dir: &str) -> Result<Vec<String>>;
}

/// Stores everything under a root folder on disk.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
    layout: Layout,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_layout(root, Layout::default())
    }

    pub fn with_layout(root: impl Into<PathBuf>, layout: Layout) -> Self {
        FsStore {
            root: root.into(),
            layout,
        }
    }

    pub fn path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

impl ArtifactStore for FsStore {
    fn read(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.path(key);
        std::fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))
    }

    fn write(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        debug!("Writing {} bytes to {}", bytes.len(), path.display());
        write_atomic(&path, bytes)
    }

    fn list(&self, dir: &str) -> Result<Vec<String>> {
        let path = self.path(dir);
        if !path.is_dir() {
            bail!("Directory not found: {}", path.display());
        }

        let mut names = Vec::new();
        for entry in WalkDir::new(&path)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry =
                entry.with_context(|| format!("Failed to list {}", path.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }
}

impl SnapshotStore for FsStore {
    fn load(&self, year: &str, month: &str) -> Result<Option<Snapshot>> {
        let key = self.layout.snapshot_key(year, month);
        if !self.path(&key).exists() {
            return Ok(None);
        }
        let bytes = self.read(&key)?;
        let snapshot = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse snapshot {}", key))?;
        Ok(Some(snapshot))
    }

    fn save(&self, year: &str, month: &str, snapshot: &Snapshot) -> Result<()> {
        let key = self.layout.snapshot_key(year, month);
        let json = serde_json::to_vec_pretty(snapshot)?;
        self.write(&key, &json)
    }
}

#[cfg(test)]
pub use memory::MemoryStore;

#[cfg(test)]
mod memory {
    use std::cell::RefCell;
    use std::collections::BTreeMap;

    use anyhow::{anyhow, bail, Result};

    use super::{ArtifactStore, SnapshotStore};
    use crate::rh::scan::Snapshot;

    /// In-memory store for tests. A directory exists once a file was put in it.
    #[derive(Default)]
    pub struct MemoryStore {
        files: RefCell<BTreeMap<String, Vec<u8>>>,
        snapshots: RefCell<BTreeMap<(String, String), Snapshot>>,
    }

    impl MemoryStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn put(&self, key: &str, bytes: Vec<u8>) {
            self.files.borrow_mut().insert(key.to_string(), bytes);
        }

        pub fn remove(&self, key: &str) {
            self.files.borrow_mut().remove(key);
        }

        pub fn contains(&self, key: &str) -> bool {
            self.files.borrow().contains_key(key)
        }
    }

    impl ArtifactStore for MemoryStore {
        fn read(&self, key: &str) -> Result<Vec<u8>> {
            self.files
                .borrow()
                .get(key)
                .cloned()
                .ok_or_else(|| anyhow!("No such file: {}", key))
        }

        fn write(&self, key: &str, bytes: &[u8]) -> Result<()> {
            self.put(key, bytes.to_vec());
            Ok(())
        }

        fn list(&self, dir: &str) -> Result<Vec<String>> {
            let prefix = format!("{}/", dir.trim_end_matches('/'));
            let files = self.files.borrow();
            let mut found = false;
            let mut names = Vec::new();
            for key in files.keys() {
                if let Some(rest) = key.strip_prefix(&prefix) {
                    found = true;
                    if !rest.contains('/') {
                        names.push(rest.to_string());
                    }
                }
            }
            if !found {
                bail!("Directory not found: {}", dir);
            }
            Ok(names)
        }
    }

    impl SnapshotStore for MemoryStore {
        fn load(&self, year: &str, month: &str) -> Result<Option<Snapshot>> {
            Ok(self
                .snapshots
                .borrow()
                .get(&(year.to_string(), month.to_string()))
                .cloned())
        }

        fn save(&self, year: &str, month: &str, snapshot: &Snapshot) -> Result<()> {
            self.snapshots
                .borrow_mut()
                .insert((year.to_string(), month.to_string()), snapshot.clone());
            Ok(())
        }
    }
}
