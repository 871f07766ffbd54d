// src/filesystem/path.rs

//! Checks for paths that come from untrusted archives
//!
//! Downloaded package archives are extracted into a shared module root, so
//! entry names must never be allowed to climb out of the staging directory.

use crate::error::{Error, Result};
use std::path::{Component, Path, PathBuf};

/// Normalize an archive entry name into a relative path
///
/// `.` components are dropped. `..`, absolute roots and drive prefixes are
/// rejected outright rather than stripped, since a well-formed package never
/// contains them.
pub fn sanitize_entry(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    let mut normalized = PathBuf::new();

    for component in path.components() {
        match component {
            Component::Normal(c) => normalized.push(c),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(Error::CorruptArchive(format!(
                    "entry escapes the extraction root: {}",
                    path.display()
                )));
            }
        }
    }

    Ok(normalized)
}

/// Join a sanitized entry name onto `root`
pub fn safe_join(root: &Path, entry: impl AsRef<Path>) -> Result<PathBuf> {
    Ok(root.join(sanitize_entry(entry)?))
}

/// Check that a single path segment (a package or scope name) is usable as a
/// directory name
pub fn is_plain_segment(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && !name.chars().any(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_entry_normal() {
        assert_eq!(
            sanitize_entry("src/main.swf").unwrap(),
            PathBuf::from("src/main.swf")
        );
        assert_eq!(
            sanitize_entry("./zarch.json").unwrap(),
            PathBuf::from("zarch.json")
        );
    }

    #[test]
    fn test_sanitize_entry_rejects_traversal() {
        for bad in ["../evil", "src/../../evil", "/etc/passwd"] {
            let err = sanitize_entry(bad).unwrap_err();
            assert_eq!(err.kind(), crate::error::ErrorKind::CorruptArchive, "{bad}");
        }
    }

    #[test]
    fn test_safe_join() {
        let root = Path::new("/usr/local/lib/swift/.stage");
        assert_eq!(
            safe_join(root, "lib/a.swf").unwrap(),
            PathBuf::from("/usr/local/lib/swift/.stage/lib/a.swf")
        );
        assert!(safe_join(root, "../a.swf").is_err());
    }

    #[test]
    fn test_plain_segment() {
        assert!(is_plain_segment("left-pad"));
        assert!(!is_plain_segment(""));
        assert!(!is_plain_segment(".."));
        assert!(!is_plain_segment("a/b"));
        assert!(!is_plain_segment("a b"));
    }
}
