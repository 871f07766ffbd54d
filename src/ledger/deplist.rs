// src/ledger/deplist.rs

//! Line-oriented dependency list (SwiftList.txt)
//!
//! Each data line is `spec [version]`, whitespace separated. Blank lines and
//! lines starting with `#` are skipped, and a spec with no version means
//! `latest`. Comments and ordering survive an upsert.

use crate::error::{Error, Result};
use crate::filesystem::write_atomic;
use crate::pkgspec::PackageSpec;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Version placeholder meaning "whatever the registry has newest"
pub const LATEST: &str = "latest";

const COMMENT_MARKER: char = '#';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyEntry {
    pub spec: PackageSpec,
    pub version: String,
}

/// What `upsert` did to the file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Replaced,
    Appended,
}

#[derive(Debug, Clone)]
pub struct DependencyList {
    path: PathBuf,
}

impl DependencyList {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Lazily parse the list
    ///
    /// Each call reopens the file, so the sequence can be restarted and
    /// reflects the file as it is at the time of the call.
    pub fn entries(&self) -> Result<DependencyEntries> {
        let file = File::open(&self.path).map_err(|e| Error::io(&self.path, e))?;
        Ok(DependencyEntries {
            path: self.path.clone(),
            lines: BufReader::new(file).lines(),
            line_no: 0,
        })
    }

    pub fn read_all(&self) -> Result<Vec<DependencyEntry>> {
        self.entries()?.collect()
    }

    /// Set `spec` to `version`, replacing its line in place or appending one
    ///
    /// Later lines for the same spec are dropped so the list never holds two
    /// entries for one package. A missing file is created.
    pub fn upsert(&self, spec: &PackageSpec, version: &str) -> Result<UpsertOutcome> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(Error::io(&self.path, e)),
        };

        let replacement = format!("{} {}", spec, version);
        let mut outcome = None;
        let mut lines: Vec<String> = Vec::new();

        for line in content.lines() {
            if line_spec(line).as_ref() == Some(spec) {
                if outcome.is_none() {
                    lines.push(replacement.clone());
                    outcome = Some(UpsertOutcome::Replaced);
                } else {
                    debug!("Dropping duplicate entry for {}: {}", spec, line);
                }
                continue;
            }
            lines.push(line.to_string());
        }

        let outcome = outcome.unwrap_or_else(|| {
            lines.push(replacement);
            UpsertOutcome::Appended
        });

        let mut out = lines.join("\n");
        out.push('\n');
        write_atomic(&self.path, out.as_bytes())?;

        debug!("Recorded {} {} in {}", spec, version, self.path.display());
        Ok(outcome)
    }
}

/// First token of a data line, if it is a valid spec
fn line_spec(line: &str) -> Option<PackageSpec> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with(COMMENT_MARKER) {
        return None;
    }
    trimmed
        .split_whitespace()
        .next()
        .and_then(|token| PackageSpec::parse(token).ok())
}

/// Iterator returned by [`DependencyList::entries`]
#[derive(Debug)]
pub struct DependencyEntries {
    path: PathBuf,
    lines: Lines<BufReader<File>>,
    line_no: usize,
}

impl Iterator for DependencyEntries {
    type Item = Result<DependencyEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(Error::io(&self.path, e))),
            };
            self.line_no += 1;

            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with(COMMENT_MARKER) {
                continue;
            }

            let mut tokens = trimmed.split_whitespace();
            let spec_token = tokens.next()?;
            let version = tokens.next().unwrap_or(LATEST).to_string();
            if tokens.next().is_some() {
                return Some(Err(Error::malformed(
                    &self.path,
                    format!("line {}: expected 'spec [version]'", self.line_no),
                )));
            }

            return Some(
                PackageSpec::parse(spec_token)
                    .map(|spec| DependencyEntry { spec, version })
                    .map_err(|e| {
                        Error::malformed(&self.path, format!("line {}: {}", self.line_no, e))
                    }),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn list_with(content: &str) -> (TempDir, DependencyList) {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("SwiftList.txt");
        std::fs::write(&path, content).unwrap();
        (temp_dir, DependencyList::new(path))
    }

    fn spec(s: &str) -> PackageSpec {
        PackageSpec::parse(s).unwrap()
    }

    #[test]
    fn test_parse_skips_comments_and_blanks() {
        let (_tmp, list) = list_with("# deps\n\nleft-pad\n  @acme/widget   2.0.0  \n# end\n");
        let entries = list.read_all().unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].spec, spec("left-pad"));
        assert_eq!(entries[0].version, LATEST);
        assert_eq!(entries[1].spec, spec("@acme/widget"));
        assert_eq!(entries[1].version, "2.0.0");
    }

    #[test]
    fn test_entries_restartable() {
        let (_tmp, list) = list_with("a 1.0.0\nb\n");
        let first: Vec<_> = list.entries().unwrap().map(|e| e.unwrap()).collect();
        let second: Vec<_> = list.entries().unwrap().map(|e| e.unwrap()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_bad_line_is_malformed() {
        let (_tmp, list) = list_with("ok 1.0.0\n@broken\n");
        let mut entries = list.entries().unwrap();
        assert!(entries.next().unwrap().is_ok());

        let err = entries.next().unwrap().unwrap_err();
        assert!(matches!(err, Error::Malformed { .. }));
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let list = DependencyList::new(temp_dir.path().join("SwiftList.txt"));
        assert!(matches!(list.entries().unwrap_err(), Error::NotFound(_)));
    }

    #[test]
    fn test_upsert_twice_keeps_one_line() {
        let (_tmp, list) = list_with("# deps\nleft-pad\n");

        assert_eq!(
            list.upsert(&spec("@acme/widget"), "2.0.0").unwrap(),
            UpsertOutcome::Appended
        );
        let lines_before = std::fs::read_to_string(list.path()).unwrap().lines().count();

        assert_eq!(
            list.upsert(&spec("@acme/widget"), "2.1.0").unwrap(),
            UpsertOutcome::Replaced
        );
        let content = std::fs::read_to_string(list.path()).unwrap();
        assert_eq!(content.lines().count(), lines_before);
        assert_eq!(content, "# deps\nleft-pad\n@acme/widget 2.1.0\n");
    }

    #[test]
    fn test_upsert_preserves_position_and_matches_canonical_spec() {
        let (_tmp, list) = list_with("@user/left-pad 1.0.0\n@acme/widget 2.0.0\n");
        list.upsert(&spec("left-pad"), "1.3.0").unwrap();

        let content = std::fs::read_to_string(list.path()).unwrap();
        assert_eq!(content, "left-pad 1.3.0\n@acme/widget 2.0.0\n");
    }

    #[test]
    fn test_upsert_collapses_duplicates() {
        let (_tmp, list) = list_with("widget 1.0.0\nother\nwidget 0.9.0\n");
        list.upsert(&spec("widget"), "2.0.0").unwrap();

        let entries = list.read_all().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].version, "2.0.0");
    }

    #[test]
    fn test_upsert_creates_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let list = DependencyList::new(temp_dir.path().join("SwiftList.txt"));
        list.upsert(&spec("left-pad"), "1.3.0").unwrap();
        assert_eq!(
            std::fs::read_to_string(list.path()).unwrap(),
            "left-pad 1.3.0\n"
        );
    }
}
