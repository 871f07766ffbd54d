// src/archive.rs

//! Package archive builder
//!
//! Packs a project tree into `dist/{name}-v{version}.tar.gz`. The output is
//! reproducible: entries are walked in sorted order, every header carries the
//! same mtime and owner, and the gzip header has no timestamp. Building an
//! unchanged tree twice therefore gives byte-identical archives.
//!
//! The archived `zarch.json` is an in-memory snapshot of the manifest with the
//! project readme embedded as `markdown`; the working-tree manifest is never
//! modified.

use crate::error::{Error, Result};
use crate::filesystem::{ensure_dir, remove_dir_if_exists};
use crate::ledger::LOCKFILE_NAME;
use crate::manifest::{MANIFEST_FILE, ProjectManifest, README_FILE};
use flate2::Compression;
use flate2::write::GzEncoder;
use glob::Pattern;
use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

/// Output directory, relative to the project root
pub const DIST_DIR: &str = "dist";

/// Header mtime when no build timestamp is configured (2024-01-01 00:00:00 UTC)
pub const DEFAULT_MTIME: u64 = 1704067200;

/// Directory and file names never packed, wherever they appear
const ALWAYS_EXCLUDED: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    "__pycache__",
    ".cache",
    "node_modules",
    ".DS_Store",
];

/// One exclusion predicate
#[derive(Debug, Clone)]
pub enum ExcludeRule {
    /// A top-level entry of the project root
    Root(String),
    /// Any path component matching the pattern, at any depth
    AnyComponent(Pattern),
}

impl ExcludeRule {
    fn matches(&self, relative: &Path) -> bool {
        match self {
            ExcludeRule::Root(name) => relative
                .components()
                .next()
                .is_some_and(|c| c.as_os_str() == name.as_str()),
            ExcludeRule::AnyComponent(pattern) => relative.components().any(|c| match c {
                Component::Normal(name) => pattern.matches(&name.to_string_lossy()),
                _ => false,
            }),
        }
    }
}

/// Set of paths left out of the archive
///
/// Evaluated once per walked entry. A matching directory is pruned whole, so
/// nothing below it is ever visited.
#[derive(Debug, Clone)]
pub struct ExcludeRules {
    rules: Vec<ExcludeRule>,
}

impl ExcludeRules {
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Output directory, lock file, VCS metadata and caches
    pub fn project_defaults() -> Self {
        let mut rules = Self::empty().with_root(DIST_DIR).with_root(LOCKFILE_NAME);
        for name in ALWAYS_EXCLUDED {
            // Literal names are always valid patterns
            if let Ok(pattern) = Pattern::new(&Pattern::escape(name)) {
                rules.rules.push(ExcludeRule::AnyComponent(pattern));
            }
        }
        rules
    }

    pub fn with_root(mut self, name: &str) -> Self {
        self.rules.push(ExcludeRule::Root(name.to_string()));
        self
    }

    /// Exclude any component matching a glob pattern such as `*.tmp`
    pub fn with_pattern(mut self, pattern: &str) -> Result<Self> {
        let compiled = Pattern::new(pattern).map_err(|e| Error::Malformed {
            path: "exclude pattern".to_string(),
            reason: format!("{pattern}: {e}"),
        })?;
        self.rules.push(ExcludeRule::AnyComponent(compiled));
        Ok(self)
    }

    /// Whether a path relative to the project root is excluded
    pub fn matches(&self, relative: &Path) -> bool {
        self.rules.iter().any(|rule| rule.matches(relative))
    }
}

impl Default for ExcludeRules {
    fn default() -> Self {
        Self::project_defaults()
    }
}

/// Result of a build request
#[derive(Debug, Clone)]
pub enum BuildOutcome {
    /// Build mode is not `all`; nothing was written
    Skipped { build_mode: String },
    Built(BuiltArchive),
}

#[derive(Debug, Clone)]
pub struct BuiltArchive {
    pub path: PathBuf,
    /// Archived paths relative to the project root, in archive order
    pub files: Vec<String>,
    /// Manifest as packed, readme embedded
    pub snapshot: ProjectManifest,
}

pub struct ArchiveBuilder {
    root: PathBuf,
    manifest: ProjectManifest,
    excludes: ExcludeRules,
    mtime: u64,
}

impl ArchiveBuilder {
    /// Builder with the default exclusions and [`DEFAULT_MTIME`]
    pub fn new(root: &Path, manifest: ProjectManifest) -> Self {
        Self {
            root: root.to_path_buf(),
            manifest,
            excludes: ExcludeRules::project_defaults(),
            mtime: DEFAULT_MTIME,
        }
    }

    pub fn with_excludes(mut self, excludes: ExcludeRules) -> Self {
        self.excludes = excludes;
        self
    }

    pub fn with_mtime(mut self, mtime: u64) -> Self {
        self.mtime = mtime;
        self
    }

    /// Where the archive for this manifest goes
    pub fn output_path(&self) -> PathBuf {
        self.root.join(DIST_DIR).join(self.manifest.archive_name())
    }

    pub fn build(&self) -> Result<BuildOutcome> {
        if !self.manifest.build_enabled() {
            warn!(
                "Build mode is '{}', not 'all'; skipping packaging",
                self.manifest.build
            );
            return Ok(BuildOutcome::Skipped {
                build_mode: self.manifest.build.clone(),
            });
        }

        let snapshot = self.snapshot()?;
        let snapshot_json = snapshot.to_json()?;
        let entries = self.scan()?;

        let dist = self.root.join(DIST_DIR);
        remove_dir_if_exists(&dist)?;
        ensure_dir(&dist)?;

        let output = self.output_path();
        let tmp = NamedTempFile::new_in(&dist).map_err(|e| Error::io(&dist, e))?;
        let files = self
            .write_archive(tmp.as_file(), &entries, snapshot_json.as_bytes())
            .map_err(|e| Error::io(&output, e))?;
        tmp.persist(&output).map_err(|e| Error::io(&output, e.error))?;

        info!("Built {} ({} files)", output.display(), files.len());
        Ok(BuildOutcome::Built(BuiltArchive {
            path: output,
            files,
            snapshot,
        }))
    }

    /// Manifest copy with the readme embedded, when there is one
    fn snapshot(&self) -> Result<ProjectManifest> {
        let readme = self.root.join(README_FILE);
        match fs::read_to_string(&readme) {
            Ok(content) => Ok(self.manifest.with_markdown(&content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No {} to embed", README_FILE);
                Ok(self.manifest.clone())
            }
            Err(e) => Err(Error::io(&readme, e)),
        }
    }

    /// Sorted walk of everything that goes into the archive
    fn scan(&self) -> Result<Vec<DirEntry>> {
        let root = self.root.as_path();
        let excludes = &self.excludes;
        let walker = WalkDir::new(root)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
                !excludes.matches(relative)
            });

        let mut entries = Vec::new();
        for entry in walker {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(root).to_path_buf();
                Error::io(&path, io::Error::from(e))
            })?;
            if !entry.file_type().is_dir() {
                entries.push(entry);
            }
        }
        Ok(entries)
    }

    fn write_archive(
        &self,
        out: &File,
        entries: &[DirEntry],
        manifest_bytes: &[u8],
    ) -> io::Result<Vec<String>> {
        let encoder = GzEncoder::new(out, Compression::default());
        let mut archive = tar::Builder::new(encoder);
        let mut files = Vec::with_capacity(entries.len());

        for entry in entries {
            let relative = entry
                .path()
                .strip_prefix(&self.root)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
            let name = archive_name(relative);

            let mut header = tar::Header::new_gnu();
            header.set_mtime(self.mtime);
            header.set_uid(0);
            header.set_gid(0);

            if entry.file_type().is_symlink() {
                let target = fs::read_link(entry.path())?;
                header.set_entry_type(tar::EntryType::Symlink);
                header.set_mode(0o777);
                header.set_size(0);
                header.set_cksum();
                archive.append_link(&mut header, &name, &target)?;
            } else if name == MANIFEST_FILE {
                header.set_entry_type(tar::EntryType::Regular);
                header.set_mode(0o644);
                header.set_size(manifest_bytes.len() as u64);
                header.set_cksum();
                archive.append_data(&mut header, &name, manifest_bytes)?;
            } else {
                let metadata = entry.metadata().map_err(io::Error::from)?;
                header.set_entry_type(tar::EntryType::Regular);
                header.set_mode(normalized_mode(&metadata));
                header.set_size(metadata.len());
                header.set_cksum();
                archive.append_data(&mut header, &name, File::open(entry.path())?)?;
            }

            debug!("Packed {}", name);
            files.push(name);
        }

        let encoder = archive.into_inner()?;
        encoder.finish()?;
        Ok(files)
    }
}

/// `/`-separated entry name
fn archive_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// 0o755 for anything executable, 0o644 otherwise, independent of umask
fn normalized_mode(metadata: &fs::Metadata) -> u32 {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if metadata.permissions().mode() & 0o111 != 0 {
            return 0o755;
        }
    }
    #[cfg(not(unix))]
    let _ = metadata;
    0o644
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;
    use tempfile::TempDir;

    fn project() -> (TempDir, ProjectManifest) {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::write(root.join("src/main.swf"), "main();\n").unwrap();
        fs::write(root.join("README.md"), "# widget\n\nDoes things.\n").unwrap();

        let manifest = ProjectManifest::new_minimal("widget");
        fs::write(root.join(MANIFEST_FILE), manifest.to_json().unwrap()).unwrap();
        (temp_dir, manifest)
    }

    fn read_entries(path: &Path) -> Vec<(String, Vec<u8>)> {
        let mut archive = tar::Archive::new(GzDecoder::new(File::open(path).unwrap()));
        archive
            .entries()
            .unwrap()
            .map(|e| {
                let mut e = e.unwrap();
                let name = e.path().unwrap().to_string_lossy().into_owned();
                let mut data = Vec::new();
                e.read_to_end(&mut data).unwrap();
                (name, data)
            })
            .collect()
    }

    fn built(outcome: BuildOutcome) -> BuiltArchive {
        match outcome {
            BuildOutcome::Built(archive) => archive,
            BuildOutcome::Skipped { build_mode } => panic!("skipped with mode {build_mode}"),
        }
    }

    #[test]
    fn test_exclude_rules() {
        let rules = ExcludeRules::project_defaults();
        assert!(rules.matches(Path::new("dist")));
        assert!(rules.matches(Path::new("dist/widget-v1.0.0.tar.gz")));
        assert!(rules.matches(Path::new("zarch.lock")));
        assert!(rules.matches(Path::new(".git/HEAD")));
        assert!(rules.matches(Path::new("src/__pycache__/x.pyc")));
        assert!(!rules.matches(Path::new("src/dist/keep.swf")));
        assert!(!rules.matches(Path::new("src/main.swf")));

        let rules = ExcludeRules::empty().with_pattern("*.tmp").unwrap();
        assert!(rules.matches(Path::new("a/b/c.tmp")));
        assert!(ExcludeRules::empty().with_pattern("[").is_err());
    }

    #[test]
    fn test_build_skipped_when_mode_not_all() {
        let (temp_dir, mut manifest) = project();
        manifest.build = "none".to_string();

        let outcome = ArchiveBuilder::new(temp_dir.path(), manifest).build().unwrap();
        assert!(matches!(outcome, BuildOutcome::Skipped { .. }));
        assert!(!temp_dir.path().join(DIST_DIR).exists());
    }

    #[test]
    fn test_archive_contents_and_snapshot() {
        let (temp_dir, manifest) = project();
        let root = temp_dir.path();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::write(root.join(".git/HEAD"), "ref").unwrap();
        fs::write(root.join(LOCKFILE_NAME), "{}").unwrap();
        let on_disk = fs::read(root.join(MANIFEST_FILE)).unwrap();

        let archive = built(ArchiveBuilder::new(root, manifest).build().unwrap());
        assert_eq!(archive.path, root.join("dist/widget-v1.0.0.tar.gz"));
        assert_eq!(archive.files, vec!["README.md", "src/main.swf", "zarch.json"]);

        let entries = read_entries(&archive.path);
        let names: Vec<_> = entries.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, archive.files);

        let packed: ProjectManifest = serde_json::from_slice(&entries[2].1).unwrap();
        assert_eq!(
            packed.markdown,
            Some(vec![
                "# widget".to_string(),
                String::new(),
                "Does things.".to_string()
            ])
        );
        assert_eq!(packed, archive.snapshot);

        // Working-tree manifest untouched
        assert_eq!(fs::read(root.join(MANIFEST_FILE)).unwrap(), on_disk);
    }

    #[test]
    fn test_build_is_deterministic_and_never_packs_dist() {
        let (temp_dir, manifest) = project();
        let root = temp_dir.path();

        let first = built(ArchiveBuilder::new(root, manifest.clone()).build().unwrap());
        let first_bytes = fs::read(&first.path).unwrap();

        // A stale artifact in dist must vanish and must not be packed
        fs::write(root.join(DIST_DIR).join("stale.tar.gz"), "old").unwrap();

        let second = built(ArchiveBuilder::new(root, manifest).build().unwrap());
        assert_eq!(fs::read(&second.path).unwrap(), first_bytes);
        assert!(!root.join(DIST_DIR).join("stale.tar.gz").exists());
        assert!(second.files.iter().all(|f| !f.starts_with("dist/")));
    }

    #[test]
    fn test_custom_excludes_and_mtime() {
        let (temp_dir, manifest) = project();
        let root = temp_dir.path();
        fs::write(root.join("src/scratch.tmp"), "junk").unwrap();

        let rules = ExcludeRules::project_defaults().with_pattern("*.tmp").unwrap();
        let archive = built(
            ArchiveBuilder::new(root, manifest)
                .with_excludes(rules)
                .with_mtime(42)
                .build()
                .unwrap(),
        );
        assert!(!archive.files.iter().any(|f| f.ends_with(".tmp")));

        let mut tar = tar::Archive::new(GzDecoder::new(File::open(&archive.path).unwrap()));
        for entry in tar.entries().unwrap() {
            assert_eq!(entry.unwrap().header().mtime().unwrap(), 42);
        }
    }

    #[test]
    fn test_without_readme_no_markdown() {
        let (temp_dir, manifest) = project();
        fs::remove_file(temp_dir.path().join(README_FILE)).unwrap();

        let archive = built(ArchiveBuilder::new(temp_dir.path(), manifest).build().unwrap());
        assert!(archive.snapshot.markdown.is_none());
    }
}
