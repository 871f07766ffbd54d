// src/lib.rs

//! zarch: package manager client for SwiftFlow projects
//!
//! Scaffolds projects, builds reproducible archives, publishes them to a
//! registry, and installs dependencies (one at a time or as an all-or-nothing
//! batch) into a shared module directory.
//!
//! # Architecture
//!
//! - Stores own one file each: `zarch.json` (manifest), `SwiftList.txt`
//!   (dependency list), `zarch.lock` (lock snapshot), credentials
//! - Every write is temp file + rename; installs stage before swapping
//! - The registry is a trait, so every network path can run against a fake
//! - Configuration is resolved once and passed in; no component reads globals

pub mod archive;
pub mod config;
pub mod credentials;
mod error;
pub mod filesystem;
pub mod hash;
pub mod install;
pub mod ledger;
pub mod manifest;
pub mod pkgspec;
pub mod progress;
pub mod project;
pub mod registry;

pub use archive::{ArchiveBuilder, BuildOutcome, ExcludeRules};
pub use config::Config;
pub use credentials::{CredentialStore, Credentials, LogoutOutcome};
pub use error::{Error, ErrorKind, Result};
pub use install::{BatchOutcome, InstalledModule, Installer, ModuleIndex};
pub use ledger::{DependencyEntry, DependencyList, Ledger, LockSnapshot};
pub use manifest::{LinkEntry, ManifestStore, ProjectManifest};
pub use pkgspec::PackageSpec;
pub use progress::{
    CallbackProgress, CliProgress, LogProgress, ProgressEvent, ProgressMode, ProgressTracker,
    SilentProgress,
};
pub use project::{BuildReport, InstallReport, Lifecycle, Published};
pub use registry::{HttpRegistry, Registry};
