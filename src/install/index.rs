// src/install/index.rs

//! Module index: which spec owns which directory under the module root
//!
//! Modules are installed under their bare name so existing import paths keep
//! working. When a second scope publishes the same bare name, the newcomer is
//! installed as `{scope}.{name}` instead of overwriting the first owner.

use crate::error::{Error, Result};
use crate::filesystem::write_atomic;
use crate::pkgspec::PackageSpec;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Index file name inside the module root
pub const INDEX_FILE: &str = ".zarch-index.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Directory name under the module root
    pub dir: String,
    pub version: String,
    pub installed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct ModuleIndex {
    path: PathBuf,
    entries: BTreeMap<String, IndexEntry>,
}

impl ModuleIndex {
    /// Load the index of `module_root`; a missing file is an empty index
    pub fn load(module_root: &Path) -> Result<Self> {
        let path = module_root.join(INDEX_FILE);
        let entries = match std::fs::read_to_string(&path) {
            Ok(content) => {
                serde_json::from_str(&content).map_err(|e| Error::malformed(&path, e))?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(Error::io(&path, e)),
        };
        Ok(Self { path, entries })
    }

    pub fn get(&self, spec: &PackageSpec) -> Option<&IndexEntry> {
        self.entries.get(&spec.to_string())
    }

    pub fn entries(&self) -> &BTreeMap<String, IndexEntry> {
        &self.entries
    }

    /// Directory this spec installs into
    ///
    /// A spec keeps the directory it was given before. Otherwise it gets its
    /// bare name, unless another spec already owns that name.
    pub fn dir_for(&self, spec: &PackageSpec) -> String {
        let key = spec.to_string();
        if let Some(entry) = self.entries.get(&key) {
            return entry.dir.clone();
        }

        let owned_by_other = |dir: &str| {
            self.entries
                .iter()
                .any(|(owner, entry)| owner != &key && entry.dir == dir)
        };

        if !owned_by_other(&spec.name) {
            spec.name.clone()
        } else {
            format!("{}.{}", spec.scope, spec.name)
        }
    }

    pub fn record(&mut self, spec: &PackageSpec, dir: &str, version: &str) {
        self.entries.insert(
            spec.to_string(),
            IndexEntry {
                dir: dir.to_string(),
                version: version.to_string(),
                installed_at: Utc::now(),
            },
        );
    }

    pub fn save(&self) -> Result<()> {
        let mut json = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| Error::Io(format!("serializing module index: {e}")))?;
        json.push('\n');
        write_atomic(&self.path, json.as_bytes())
    }
}
