// src/ledger/mod.rs

//! Dependency ledger: the project's dependency list and its lock snapshot

pub mod deplist;
pub mod lockfile;

pub use deplist::{DependencyEntries, DependencyEntry, DependencyList, LATEST, UpsertOutcome};
pub use lockfile::{LOCKFILE_NAME, LockMetadata, LockSnapshot};

use crate::error::Result;
use crate::manifest::ProjectManifest;
use std::path::{Path, PathBuf};

/// Dependency list file name at the project root
pub const DEPENDENCY_FILE: &str = "SwiftList.txt";

/// Both ledger files of one project directory
#[derive(Debug, Clone)]
pub struct Ledger {
    root: PathBuf,
}

impl Ledger {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn dependencies(&self) -> DependencyList {
        DependencyList::new(self.root.join(DEPENDENCY_FILE))
    }

    pub fn lock_path(&self) -> PathBuf {
        self.root.join(LOCKFILE_NAME)
    }

    /// Hash `archive` and replace the lock file with a fresh snapshot
    pub fn write_lock_snapshot(
        &self,
        manifest: &ProjectManifest,
        archive: &Path,
        files: Vec<String>,
    ) -> Result<LockSnapshot> {
        let label = archive
            .strip_prefix(&self.root)
            .unwrap_or(archive)
            .to_string_lossy()
            .replace('\\', "/");
        let snapshot = LockSnapshot::capture(manifest, archive, &label, files)?;
        snapshot.save(&self.lock_path())?;
        Ok(snapshot)
    }

    pub fn read_lock_snapshot(&self) -> Result<LockSnapshot> {
        LockSnapshot::from_file(&self.lock_path())
    }
}
