// src/install/extract.rs

//! Staged extraction of package archives
//!
//! An archive is unpacked into a hidden staging directory inside the module
//! root. Only once every entry is on disk is the old module directory removed
//! and the staging directory renamed into its place, so a corrupt archive
//! never disturbs what was installed before.

use crate::error::{Error, Result};
use crate::filesystem::{ensure_dir, remove_dir_if_exists, sanitize_entry};
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io;
use std::path::Path;
use tempfile::TempDir;
use tracing::{debug, info};

const STAGING_PREFIX: &str = ".zarch-stage-";

/// An archive unpacked and waiting to be moved into place
///
/// Dropping it without calling [`StagedModule::commit`] removes the staging
/// directory.
#[derive(Debug)]
pub struct StagedModule {
    staging: TempDir,
    pub files: usize,
}

impl StagedModule {
    pub fn path(&self) -> &Path {
        self.staging.path()
    }

    /// Replace `target` with the staged tree
    ///
    /// Failure to remove the previous directory for lack of privilege is
    /// reported as `PermissionDenied`.
    pub fn commit(self, target: &Path) -> Result<()> {
        // Staging dirs are created owner-only; modules are shared
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(self.staging.path(), fs::Permissions::from_mode(0o755))
                .map_err(|e| Error::io(self.staging.path(), e))?;
        }

        if remove_dir_if_exists(target)? {
            debug!("Removed previous module at {}", target.display());
        }
        fs::rename(self.staging.path(), target).map_err(|e| Error::io(target, e))?;
        info!("Installed module into {}", target.display());
        // The staging path no longer exists; TempDir's drop ignores that
        Ok(())
    }
}

/// Unpack a gzip tarball into a fresh staging directory under `module_root`
pub fn stage_archive(archive_path: &Path, module_root: &Path) -> Result<StagedModule> {
    ensure_dir(module_root)?;
    let staging = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .tempdir_in(module_root)
        .map_err(|e| Error::io(module_root, e))?;

    let file = File::open(archive_path).map_err(|e| Error::io(archive_path, e))?;
    let mut archive = tar::Archive::new(GzDecoder::new(file));
    let corrupt = |e: io::Error| {
        Error::CorruptArchive(format!("{}: {}", archive_path.display(), e))
    };

    let mut files = 0;
    for entry in archive.entries().map_err(corrupt)? {
        let mut entry = entry.map_err(corrupt)?;
        let raw_path = entry.path().map_err(corrupt)?.into_owned();
        let relative = sanitize_entry(&raw_path)?;
        if relative.as_os_str().is_empty() {
            continue;
        }

        match entry.header().entry_type() {
            tar::EntryType::Link => {
                return Err(Error::CorruptArchive(format!(
                    "hard link entries are not supported: {}",
                    raw_path.display()
                )));
            }
            tar::EntryType::Symlink => {
                let target = entry.link_name().map_err(corrupt)?.ok_or_else(|| {
                    Error::CorruptArchive(format!("symlink without target: {}", raw_path.display()))
                })?;
                // Link targets must stay inside the module as well
                let resolved = relative.parent().unwrap_or(Path::new("")).join(&*target);
                sanitize_entry(&resolved)?;
            }
            _ => {}
        }

        let dest = staging.path().join(&relative);
        if let Some(parent) = dest.parent() {
            ensure_dir(parent)?;
        }
        entry.unpack(&dest).map_err(|e| match e.kind() {
            io::ErrorKind::PermissionDenied => Error::io(&dest, e),
            _ => corrupt(e),
        })?;

        if entry.header().entry_type().is_file() {
            files += 1;
        }
    }

    debug!(
        "Staged {} files from {} in {}",
        files,
        archive_path.display(),
        staging.path().display()
    );
    Ok(StagedModule { staging, files })
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn tarball(dir: &Path, entries: &[(&str, &[u8])]) -> PathBuf {
        let path = dir.join("pkg.tar.gz");
        let encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (name, data) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, *data).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
        path
    }

    /// Write an entry whose name bypasses tar's own path checks
    fn tarball_with_raw_name(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join("evil.tar.gz");
        let encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        let mut header = tar::Header::new_old();
        header.as_old_mut().name[..name.len()].copy_from_slice(name.as_bytes());
        header.set_size(1);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append(&header, &b"x"[..]).unwrap();
        builder.into_inner().unwrap().finish().unwrap();
        path
    }

    #[test]
    fn test_stage_and_commit_replaces_old_module() {
        let temp_dir = TempDir::new().unwrap();
        let modules = temp_dir.path().join("modules");
        let target = modules.join("widget");
        fs::create_dir_all(&target).unwrap();
        fs::write(target.join("stale.swf"), "old").unwrap();

        let archive = tarball(
            temp_dir.path(),
            &[("zarch.json", b"{}"), ("src/main.swf", b"main();")],
        );
        let staged = stage_archive(&archive, &modules).unwrap();
        assert_eq!(staged.files, 2);
        staged.commit(&target).unwrap();

        assert!(target.join("src/main.swf").is_file());
        assert!(!target.join("stale.swf").exists());
        // Only the module remains in the root
        assert_eq!(fs::read_dir(&modules).unwrap().count(), 1);
    }

    #[test]
    fn test_corrupt_archive_leaves_previous_module() {
        let temp_dir = TempDir::new().unwrap();
        let modules = temp_dir.path().join("modules");
        let target = modules.join("widget");
        fs::create_dir_all(&target).unwrap();
        fs::write(target.join("keep.swf"), "old").unwrap();

        let archive = temp_dir.path().join("garbage.tar.gz");
        fs::write(&archive, b"definitely not gzip").unwrap();

        let err = stage_archive(&archive, &modules).unwrap_err();
        assert!(matches!(err, Error::CorruptArchive(_)), "{err:?}");
        assert_eq!(fs::read_to_string(target.join("keep.swf")).unwrap(), "old");
        assert_eq!(fs::read_dir(&modules).unwrap().count(), 1);
    }

    #[test]
    fn test_traversal_entry_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let modules = temp_dir.path().join("modules");
        let archive = tarball_with_raw_name(temp_dir.path(), "../escape.swf");

        let err = stage_archive(&archive, &modules).unwrap_err();
        assert!(matches!(err, Error::CorruptArchive(_)), "{err:?}");
        assert!(!temp_dir.path().join("escape.swf").exists());
        assert_eq!(fs::read_dir(&modules).unwrap().count(), 0);
    }
}
