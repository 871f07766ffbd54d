// src/filesystem/mod.rs

//! Filesystem helpers shared by the stores and the install engine
//!
//! Every project file is replaced by writing a sibling temp file and renaming
//! it over the target, so a reader sees either the old or the new content.
//! Directory removal keeps permission failures distinct from other I/O.

pub mod path;

use crate::error::{Error, Result};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

pub use path::{is_plain_segment, safe_join, sanitize_entry};

/// Replace `target` with `contents` via temp file + rename
pub fn write_atomic(target: &Path, contents: &[u8]) -> Result<()> {
    let parent = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(parent).map_err(|e| Error::io(parent, e))?;
    tmp.write_all(contents).map_err(|e| Error::io(tmp.path(), e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| Error::io(tmp.path(), e))?;
    tmp.persist(target)
        .map_err(|e| Error::io(target, e.error))?;

    debug!("Wrote {} ({} bytes)", target.display(), contents.len());
    Ok(())
}

/// Same as [`write_atomic`], then restrict the file to its owner
pub fn write_private(target: &Path, contents: &[u8]) -> Result<()> {
    write_atomic(target, contents)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(target, fs::Permissions::from_mode(0o600))
            .map_err(|e| Error::io(target, e))?;
    }

    Ok(())
}

/// Remove a directory tree if it exists
///
/// Returns `Ok(false)` when there was nothing to remove.
pub fn remove_dir_if_exists(dir: &Path) -> Result<bool> {
    match fs::remove_dir_all(dir) {
        Ok(()) => {
            debug!("Removed directory: {}", dir.display());
            Ok(true)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::io(dir, e)),
    }
}

/// Create a directory and its parents
pub fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))
}
