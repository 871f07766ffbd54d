// src/install/mod.rs

//! Install engine
//!
//! Two resolution paths share one download and extract core:
//!
//! - **Single**: look the package up, download, stage, swap into place, then
//!   record the resolved version in the project's dependency list.
//! - **Batch**: resolve every dependency-list entry in one registry request
//!   and install all of them or none.
//!
//! # Batch phases
//!
//! 1. Validate: any member the registry could not resolve aborts the batch
//!    before a byte is downloaded.
//! 2. Download every archive to temp files (checksums verified).
//! 3. Stage every archive. Only when all are unpacked are the module
//!    directories swapped and the index saved.
//!
//! The dependency list is not rewritten by a batch install, so `latest`
//! entries stay `latest`.

mod download;
mod extract;
mod index;

pub use download::{DownloadedArchive, fetch_archive};
pub use extract::{StagedModule, stage_archive};
pub use index::{INDEX_FILE, IndexEntry, ModuleIndex};

use crate::error::{Error, Result};
use crate::ledger::{DependencyEntry, DependencyList};
use crate::pkgspec::PackageSpec;
use crate::progress::ProgressMode;
use crate::registry::{Registry, Resolution, ResolvedPackage};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// One package on disk after an install
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledModule {
    pub spec: PackageSpec,
    pub version: String,
    pub dir: PathBuf,
}

/// Result of a batch install
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    /// The dependency list had no entries; nothing was requested
    Empty,
    Installed(Vec<InstalledModule>),
}

pub struct Installer<'a> {
    registry: &'a dyn Registry,
    modules_dir: PathBuf,
    download_dir: PathBuf,
    progress: ProgressMode,
}

impl<'a> Installer<'a> {
    pub fn new(
        registry: &'a dyn Registry,
        modules_dir: impl Into<PathBuf>,
        download_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            registry,
            modules_dir: modules_dir.into(),
            download_dir: download_dir.into(),
            progress: ProgressMode::default(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressMode) -> Self {
        self.progress = progress;
        self
    }

    pub fn modules_dir(&self) -> &Path {
        &self.modules_dir
    }

    /// Install one package and upsert its resolved version into `deps`
    pub fn install_single(
        &self,
        spec: &PackageSpec,
        deps: &DependencyList,
    ) -> Result<InstalledModule> {
        info!("Resolving {}", spec);
        let resolved: ResolvedPackage = self.registry.package_info(spec)?.into();
        debug!("{} resolved to {} at {}", spec, resolved.version, resolved.url);

        let archive = self.download(spec, &resolved)?;
        let staged = stage_archive(archive.path(), &self.modules_dir)?;

        let mut index = ModuleIndex::load(&self.modules_dir)?;
        let module = self.commit(&mut index, spec, &resolved.version, staged)?;
        index.save()?;
        archive.discard()?;

        deps.upsert(spec, &resolved.version)?;
        Ok(module)
    }

    /// Install every entry of a dependency list, all or nothing
    pub fn install_batch(&self, entries: &[DependencyEntry]) -> Result<BatchOutcome> {
        if entries.is_empty() {
            warn!("Dependency list has no entries; nothing to install");
            return Ok(BatchOutcome::Empty);
        }

        let requested: BTreeMap<String, String> = entries
            .iter()
            .map(|e| (e.spec.to_string(), e.version.clone()))
            .collect();
        info!("Batch resolving {} packages", requested.len());

        let response = self.registry.resolve_batch(&requested)?;
        let plan = validate_resolution(entries, &requested, response)?;

        // Phase 2: every archive on local disk before anything is touched
        let mut downloads = Vec::with_capacity(plan.len());
        for (spec, resolved) in &plan {
            downloads.push(self.download(spec, resolved)?);
        }

        // Phase 3: unpack all, then swap all
        let mut staged = Vec::with_capacity(plan.len());
        for archive in &downloads {
            staged.push(stage_archive(archive.path(), &self.modules_dir)?);
        }

        let mut index = ModuleIndex::load(&self.modules_dir)?;
        let mut installed = Vec::with_capacity(plan.len());
        for ((spec, resolved), module) in plan.iter().zip(staged) {
            match self.commit(&mut index, spec, &resolved.version, module) {
                Ok(done) => installed.push(done),
                Err(e) => {
                    // Members already swapped in must stay owned in the index
                    if !installed.is_empty() {
                        warn!(
                            "Batch stopped at {} after {} package(s) were swapped in",
                            spec,
                            installed.len()
                        );
                        index.save()?;
                    }
                    return Err(e);
                }
            }
        }
        index.save()?;

        for archive in downloads {
            archive.discard()?;
        }

        info!("Installed {} packages", installed.len());
        Ok(BatchOutcome::Installed(installed))
    }

    fn download(
        &self,
        spec: &PackageSpec,
        resolved: &ResolvedPackage,
    ) -> Result<DownloadedArchive> {
        let progress = self.progress.tracker(&format!("{} {}", spec, resolved.version));
        fetch_archive(
            self.registry,
            &resolved.url,
            &self.download_dir,
            resolved.sha256.as_deref(),
            progress.as_ref(),
        )
    }

    fn commit(
        &self,
        index: &mut ModuleIndex,
        spec: &PackageSpec,
        version: &str,
        staged: StagedModule,
    ) -> Result<InstalledModule> {
        let dir_name = index.dir_for(spec);
        let dir = self.modules_dir.join(&dir_name);
        staged.commit(&dir)?;
        index.record(spec, &dir_name, version);

        Ok(InstalledModule {
            spec: spec.clone(),
            version: version.to_string(),
            dir,
        })
    }
}

/// Phase 1: every requested spec must come back resolved
///
/// Response keys are canonicalized, so `@user/x` and `x` match. All failures
/// are reported together.
fn validate_resolution(
    entries: &[DependencyEntry],
    requested: &BTreeMap<String, String>,
    response: BTreeMap<String, Resolution>,
) -> Result<Vec<(PackageSpec, ResolvedPackage)>> {
    let mut by_spec: BTreeMap<String, Resolution> = BTreeMap::new();
    for (key, resolution) in response {
        let canonical = PackageSpec::parse(&key)
            .map(|s| s.to_string())
            .unwrap_or(key);
        by_spec.insert(canonical, resolution);
    }

    let mut plan = Vec::with_capacity(requested.len());
    let mut failures = Vec::new();
    let mut seen = std::collections::BTreeSet::new();

    for entry in entries {
        let key = entry.spec.to_string();
        if !seen.insert(key.clone()) {
            continue;
        }
        match by_spec.remove(&key) {
            Some(Resolution::Resolved(resolved)) => plan.push((entry.spec.clone(), resolved)),
            Some(Resolution::Failed { error }) => failures.push(format!("{key}: {error}")),
            None => failures.push(format!("{key}: missing from registry response")),
        }
    }

    if failures.is_empty() {
        Ok(plan)
    } else {
        warn!("Batch resolution failed for {} package(s)", failures.len());
        Err(Error::ServerRejected {
            status: 200,
            message: format!(
                "batch install aborted, nothing installed: {}",
                failures.join("; ")
            ),
        })
    }
}
