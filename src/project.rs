// src/project.rs

//! Lifecycle orchestrator
//!
//! Sequences the stores, the archive builder, the registry and the install
//! engine into the user-facing operations. A project directory moves through
//! `uninitialized -> initialized -> built -> published`; install and link are
//! orthogonal to that chain.
//!
//! Every operation takes the project root explicitly. Nothing here reads the
//! process environment or the working directory.

use crate::archive::{ArchiveBuilder, BuildOutcome, DIST_DIR};
use crate::config::Config;
use crate::credentials::{CredentialStore, Credentials, LogoutOutcome};
use crate::error::{Error, Result};
use crate::install::{BatchOutcome, InstalledModule, Installer};
use crate::ledger::{Ledger, LockSnapshot};
use crate::manifest::{LinkEntry, ManifestStore, ProjectManifest};
use crate::pkgspec::PackageSpec;
use crate::progress::ProgressMode;
use crate::registry::{Registry, SearchHit, UploadReceipt, UploadRequest};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// What `build` produced
#[derive(Debug, Clone)]
pub enum BuildReport {
    Skipped { build_mode: String },
    Built { archive: PathBuf, lock: LockSnapshot },
}

#[derive(Debug, Clone)]
pub struct Initialized {
    pub root: PathBuf,
    pub manifest: ProjectManifest,
}

#[derive(Debug, Clone)]
pub struct Published {
    pub spec: PackageSpec,
    pub version: String,
    pub archive: PathBuf,
    /// Set when publish had to build the archive first
    pub built: bool,
    pub receipt: UploadReceipt,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallReport {
    Single(InstalledModule),
    Batch(BatchOutcome),
}

pub struct Lifecycle<'a> {
    config: &'a Config,
    /// Absent for purely local commands
    registry: Option<&'a dyn Registry>,
    credentials: CredentialStore,
    progress: ProgressMode,
}

impl<'a> Lifecycle<'a> {
    pub fn new(config: &'a Config, registry: &'a dyn Registry) -> Self {
        Self {
            registry: Some(registry),
            ..Self::local(config)
        }
    }

    /// Orchestrator without a registry: init, build, link and logout only
    ///
    /// Operations that need the network fail with `NetworkError`.
    pub fn local(config: &'a Config) -> Self {
        Self {
            config,
            registry: None,
            credentials: CredentialStore::new(&config.credentials_path),
            progress: ProgressMode::default(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressMode) -> Self {
        self.progress = progress;
        self
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    /// Scaffold a project
    ///
    /// With a name, the project is created in `cwd/name`. Without one, `cwd`
    /// itself is initialized and the package is named after it.
    pub fn init(&self, cwd: &Path, name: Option<&str>) -> Result<Initialized> {
        let (root, name) = match name {
            Some(name) => (cwd.join(name), name.to_string()),
            None => {
                let name = cwd
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .ok_or_else(|| Error::InvalidSpec {
                        spec: cwd.display().to_string(),
                        reason: "cannot derive a package name from this directory".to_string(),
                    })?;
                (cwd.to_path_buf(), name)
            }
        };

        let manifest = ManifestStore::new(&root).initialize(&name)?;
        Ok(Initialized { root, manifest })
    }

    /// Pack the project and write a fresh lock snapshot
    pub fn build(&self, root: &Path) -> Result<BuildReport> {
        let manifest = ManifestStore::new(root).load()?;

        let builder = ArchiveBuilder::new(root, manifest).with_mtime(self.config.archive_mtime);
        match builder.build()? {
            BuildOutcome::Skipped { build_mode } => Ok(BuildReport::Skipped { build_mode }),
            BuildOutcome::Built(built) => {
                let lock = Ledger::new(root).write_lock_snapshot(
                    &built.snapshot,
                    &built.path,
                    built.files,
                )?;
                info!("Lock snapshot written, hash {}", lock.hash());
                Ok(BuildReport::Built {
                    archive: built.path,
                    lock,
                })
            }
        }
    }

    /// Upload the project's archive
    ///
    /// Credentials are checked before anything else, so an anonymous publish
    /// fails without touching the network. When no explicit archive is given
    /// and the dist archive is missing, the project is built first.
    pub fn publish(&self, root: &Path, file: Option<&Path>) -> Result<Published> {
        let token = self.credentials.require_token()?;
        let manifest = ManifestStore::new(root).load()?;
        let spec = PackageSpec::new(&manifest.scope, &manifest.name)?;

        let (archive, built) = match file {
            Some(file) => {
                let path = root.join(file);
                if !path.is_file() {
                    return Err(Error::NotFound(format!("archive {}", path.display())));
                }
                (path, false)
            }
            None => {
                let expected = root.join(DIST_DIR).join(manifest.archive_name());
                if expected.is_file() {
                    (expected, false)
                } else {
                    debug!("{} missing, building first", expected.display());
                    match self.build(root)? {
                        BuildReport::Built { archive, .. } => (archive, true),
                        BuildReport::Skipped { build_mode } => {
                            return Err(Error::NotFound(format!(
                                "no archive to publish and build mode is '{build_mode}'"
                            )));
                        }
                    }
                }
            }
        };

        info!("Publishing {} {} from {}", spec, manifest.version, archive.display());
        let receipt = self.registry()?.upload(
            &token,
            UploadRequest {
                spec: &spec,
                version: &manifest.version,
                description: &manifest.description,
                archive: &archive,
            },
        )?;

        Ok(Published {
            spec,
            version: manifest.version,
            archive,
            built,
            receipt,
        })
    }

    /// Install one package (needs a manifest) or the whole dependency list
    pub fn install(&self, root: &Path, spec: Option<&str>) -> Result<InstallReport> {
        let ledger = Ledger::new(root);
        let installer = Installer::new(
            self.registry()?,
            &self.config.modules_dir,
            &self.config.download_dir,
        )
        .with_progress(self.progress);

        match spec {
            Some(spec) => {
                let spec = PackageSpec::parse(spec)?;
                ManifestStore::new(root).load()?;
                let module = installer.install_single(&spec, &ledger.dependencies())?;
                Ok(InstallReport::Single(module))
            }
            None => {
                let entries = ledger.dependencies().read_all()?;
                Ok(InstallReport::Batch(installer.install_batch(&entries)?))
            }
        }
    }

    pub fn link(&self, root: &Path, file: &str, alias: Option<&str>) -> Result<LinkEntry> {
        ManifestStore::new(root).link(file, alias)
    }

    pub fn login(&self, username: &str, password: &str) -> Result<Credentials> {
        self.credentials.login(self.registry()?, username, password)
    }

    pub fn register(&self, username: &str, password: &str, email: &str) -> Result<Credentials> {
        self.credentials
            .register(self.registry()?, username, password, email)
    }

    pub fn logout(&self) -> Result<LogoutOutcome> {
        self.credentials.logout()
    }

    pub fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        self.registry()?.search(query)
    }

    fn registry(&self) -> Result<&'a dyn Registry> {
        self.registry.ok_or_else(|| {
            Error::NetworkError("no registry configured for this command".to_string())
        })
    }
}
