// src/ledger/lockfile.rs

//! Lock snapshot (zarch.lock) written by every build
//!
//! The snapshot records what one build produced: the manifest as packed, the
//! archive's content hash and the archived file list. It is replaced wholesale
//! on each build, never merged.
//!
//! # Format
//!
//! ```json
//! {
//!   "lock": {
//!     "format": 1,
//!     "built_at": 1760745600,
//!     "hash": "9f2c...",
//!     "archive": "dist/widget-v1.0.0.tar.gz",
//!     "generator": "zarch 0.1.0"
//!   },
//!   "package": { "name": "widget", "version": "1.0.0", ... },
//!   "files": ["README.md", "src/main.swf", "zarch.json"]
//! }
//! ```
//!
//! `built_at` lives only here. The archive never contains it, so the hash of
//! an unchanged tree is the same from one build to the next.

use crate::error::{Error, Result};
use crate::filesystem::write_atomic;
use crate::hash;
use crate::manifest::ProjectManifest;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Current lock file format version
pub const LOCKFILE_VERSION: u32 = 1;

/// Lock file name at the project root
pub const LOCKFILE_NAME: &str = "zarch.lock";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockSnapshot {
    pub lock: LockMetadata,

    /// Manifest as it was packed, readme included
    pub package: ProjectManifest,

    /// Archived paths relative to the project root, sorted
    #[serde(default)]
    pub files: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockMetadata {
    pub format: u32,

    /// Unix seconds
    pub built_at: i64,

    /// SHA-256 of the archive bytes
    pub hash: String,

    /// Archive path relative to the project root
    pub archive: String,

    pub generator: String,
}

impl LockSnapshot {
    /// Hash `archive` (streaming) and build a snapshot for it
    pub fn capture(
        manifest: &ProjectManifest,
        archive: &Path,
        archive_label: &str,
        files: Vec<String>,
    ) -> Result<Self> {
        let hash = hash::hash_file(archive).map_err(|e| Error::io(archive, e))?;
        debug!("Archive {} sha256 {}", archive.display(), hash);

        Ok(Self {
            lock: LockMetadata {
                format: LOCKFILE_VERSION,
                built_at: Utc::now().timestamp(),
                hash,
                archive: archive_label.to_string(),
                generator: format!("zarch {}", env!("CARGO_PKG_VERSION")),
            },
            package: manifest.clone(),
            files,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let snapshot: LockSnapshot =
            serde_json::from_str(&content).map_err(|e| Error::malformed(path, e))?;
        if snapshot.lock.format != LOCKFILE_VERSION {
            return Err(Error::malformed(
                path,
                format!(
                    "unsupported lock format {} (expected {})",
                    snapshot.lock.format, LOCKFILE_VERSION
                ),
            ));
        }
        Ok(snapshot)
    }

    /// Overwrite `path` with this snapshot
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut json = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Io(format!("serializing lock snapshot: {e}")))?;
        json.push('\n');
        write_atomic(path, json.as_bytes())
    }

    pub fn hash(&self) -> &str {
        &self.lock.hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_capture_hashes_archive() {
        let temp_dir = TempDir::new().unwrap();
        let archive = temp_dir.path().join("w-v1.0.0.tar.gz");
        std::fs::write(&archive, b"hello world").unwrap();

        let manifest = ProjectManifest::new_minimal("w");
        let snapshot =
            LockSnapshot::capture(&manifest, &archive, "dist/w-v1.0.0.tar.gz", vec![]).unwrap();

        assert_eq!(snapshot.hash(), hash::sha256(b"hello world"));
        assert_eq!(snapshot.lock.format, LOCKFILE_VERSION);
        assert!(snapshot.lock.built_at > 0);
    }

    #[test]
    fn test_save_overwrites_previous_snapshot() {
        let temp_dir = TempDir::new().unwrap();
        let archive = temp_dir.path().join("a.tar.gz");
        let lock_path = temp_dir.path().join(LOCKFILE_NAME);

        std::fs::write(&archive, b"one").unwrap();
        let first = LockSnapshot::capture(
            &ProjectManifest::new_minimal("w"),
            &archive,
            "a.tar.gz",
            vec!["old.swf".to_string()],
        )
        .unwrap();
        first.save(&lock_path).unwrap();

        std::fs::write(&archive, b"two").unwrap();
        let second = LockSnapshot::capture(
            &ProjectManifest::new_minimal("w"),
            &archive,
            "a.tar.gz",
            vec!["new.swf".to_string()],
        )
        .unwrap();
        second.save(&lock_path).unwrap();

        let loaded = LockSnapshot::from_file(&lock_path).unwrap();
        assert_eq!(loaded, second);
        assert_eq!(loaded.files, vec!["new.swf".to_string()]);
    }

    #[test]
    fn test_missing_archive_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let err = LockSnapshot::capture(
            &ProjectManifest::new_minimal("w"),
            &temp_dir.path().join("missing.tar.gz"),
            "missing.tar.gz",
            vec![],
        )
        .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::NotFound);
    }
}
