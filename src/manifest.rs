// src/manifest.rs
//! Project manifest (zarch.json) parsing, persistence and scaffolding
//!
//! The manifest is the per-project declaration of identity, version and build
//! settings. Keys this crate does not know about are carried through a
//! load/save cycle untouched so hand edits survive `zarch link`.

use crate::error::{Error, Result};
use crate::filesystem::{ensure_dir, is_plain_segment, write_atomic};
use crate::ledger::DEPENDENCY_FILE;
use crate::pkgspec::DEFAULT_SCOPE;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Manifest file name at the project root
pub const MANIFEST_FILE: &str = "zarch.json";

/// Readme embedded into the archived manifest
pub const README_FILE: &str = "README.md";

/// Build-mode value that enables packaging
pub const BUILD_ALL: &str = "all";

const DEFAULT_VERSION: &str = "1.0.0";
const DEFAULT_DESCRIPTION: &str = "A SwiftFlow package";
const DEFAULT_AUTHOR: &str = "anonymous";
const DEFAULT_LICENSE: &str = "MIT";
const DEFAULT_ENTRY: &str = "src/main.swf";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectManifest {
    pub name: String,
    pub version: String,

    #[serde(default)]
    pub description: String,

    /// Entry-point source file, relative to the project root
    #[serde(default)]
    pub main: String,

    #[serde(default)]
    pub author: String,

    #[serde(default)]
    pub license: String,

    /// Namespace the package is published under
    #[serde(default = "default_scope")]
    pub scope: String,

    /// `all` enables packaging, anything else skips it
    #[serde(default = "default_build")]
    pub build: String,

    /// Readme lines; only ever set on the archived snapshot
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markdown: Option<Vec<String>>,

    /// Local file path -> alias mapping maintained by `link`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub swift: BTreeMap<String, LinkEntry>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkEntry {
    #[serde(rename = "as")]
    pub alias: String,
}

fn default_scope() -> String {
    DEFAULT_SCOPE.to_string()
}

fn default_build() -> String {
    BUILD_ALL.to_string()
}

impl ProjectManifest {
    /// Manifest written by `init`
    pub fn new_minimal(name: &str) -> Self {
        Self {
            name: name.to_string(),
            version: DEFAULT_VERSION.to_string(),
            description: DEFAULT_DESCRIPTION.to_string(),
            main: DEFAULT_ENTRY.to_string(),
            author: DEFAULT_AUTHOR.to_string(),
            license: DEFAULT_LICENSE.to_string(),
            scope: default_scope(),
            build: default_build(),
            markdown: None,
            swift: BTreeMap::new(),
            extra: serde_json::Map::new(),
        }
    }

    /// Parse manifest JSON; `origin` is only used in error messages
    pub fn parse(content: &str, origin: &Path) -> Result<Self> {
        let manifest: ProjectManifest =
            serde_json::from_str(content).map_err(|e| Error::malformed(origin, e))?;
        manifest
            .validate()
            .map_err(|reason| Error::malformed(origin, reason))?;
        Ok(manifest)
    }

    /// Check required fields and the version format
    pub fn validate(&self) -> std::result::Result<(), String> {
        if !is_plain_segment(&self.name) {
            return Err(format!("invalid package name '{}'", self.name));
        }
        semver::Version::parse(&self.version)
            .map_err(|e| format!("version '{}' is not semantic: {}", self.version, e))?;
        if !is_plain_segment(&self.scope) {
            return Err(format!("invalid scope '{}'", self.scope));
        }
        Ok(())
    }

    pub fn build_enabled(&self) -> bool {
        self.build == BUILD_ALL
    }

    /// `{name}-v{version}.tar.gz`
    pub fn archive_name(&self) -> String {
        format!("{}-v{}.tar.gz", self.name, self.version)
    }

    /// Copy of this manifest with readme lines embedded
    pub fn with_markdown(&self, readme: &str) -> Self {
        let mut snapshot = self.clone();
        snapshot.markdown = Some(readme.lines().map(str::to_string).collect());
        snapshot
    }

    pub fn to_json(&self) -> Result<String> {
        let mut json = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Io(format!("serializing manifest: {e}")))?;
        json.push('\n');
        Ok(json)
    }
}

/// Reads and writes the manifest of one project directory
#[derive(Debug, Clone)]
pub struct ManifestStore {
    root: PathBuf,
}

impl ManifestStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    pub fn exists(&self) -> bool {
        self.path().is_file()
    }

    pub fn load(&self) -> Result<ProjectManifest> {
        let path = self.path();
        let content = std::fs::read_to_string(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::NotFound(format!(
                "no {} in {}",
                MANIFEST_FILE,
                self.root.display()
            )),
            _ => Error::io(&path, e),
        })?;
        ProjectManifest::parse(&content, &path)
    }

    pub fn save(&self, manifest: &ProjectManifest) -> Result<()> {
        write_atomic(&self.path(), manifest.to_json()?.as_bytes())
    }

    /// Scaffold a new project in the store's root directory
    ///
    /// Files that already exist (other than the manifest, which is an error)
    /// are left alone.
    pub fn initialize(&self, name: &str) -> Result<ProjectManifest> {
        if self.exists() {
            return Err(Error::AlreadyExists(self.path().display().to_string()));
        }

        let manifest = ProjectManifest::new_minimal(name);
        manifest
            .validate()
            .map_err(|reason| Error::InvalidSpec {
                spec: name.to_string(),
                reason,
            })?;

        ensure_dir(&self.root)?;
        ensure_dir(&self.root.join("src"))?;
        ensure_dir(&self.root.join("tests"))?;

        self.write_if_missing(DEPENDENCY_FILE, &dependency_template())?;
        self.write_if_missing(&manifest.main, &entry_template(&manifest))?;
        self.write_if_missing(README_FILE, &readme_template(&manifest))?;
        self.write_if_missing(".gitignore", GITIGNORE_TEMPLATE)?;

        // Manifest last, so a failed scaffold can be retried
        self.save(&manifest)?;
        info!("Initialized {} in {}", manifest.name, self.root.display());
        Ok(manifest)
    }

    /// Map a local file to an alias in the manifest's `swift` table
    ///
    /// The alias defaults to the file stem. Nothing is written unless both the
    /// file and the manifest exist.
    pub fn link(&self, file: &str, alias: Option<&str>) -> Result<LinkEntry> {
        let target = self.root.join(file);
        if !target.is_file() {
            return Err(Error::NotFound(format!("file {}", target.display())));
        }

        let mut manifest = self.load()?;
        let alias = match alias {
            Some(a) if !a.trim().is_empty() => a.trim().to_string(),
            _ => Path::new(file)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| file.to_string()),
        };

        let entry = LinkEntry { alias };
        manifest.swift.insert(file.to_string(), entry.clone());
        self.save(&manifest)?;

        debug!("Linked {} as {}", file, entry.alias);
        Ok(entry)
    }

    fn write_if_missing(&self, relative: &str, contents: &str) -> Result<()> {
        let path = self.root.join(relative);
        if path.exists() {
            debug!("Keeping existing {}", path.display());
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            ensure_dir(parent)?;
        }
        write_atomic(&path, contents.as_bytes())
    }
}

const GITIGNORE_TEMPLATE: &str = "\
# Build artifacts
dist/
zarch.lock

# Editors
.vscode/
.idea/

# OS
.DS_Store
";

fn dependency_template() -> String {
    "# Package dependencies\n# Format: spec [version]   e.g. @acme/widget 2.1.0\n\n".to_string()
}

fn entry_template(manifest: &ProjectManifest) -> String {
    format!(
        "// Package: {name}\n// Version: {version}\n\n\
         func main() {{\n    print(\"Hello from {name}\");\n}}\n\nmain();\n",
        name = manifest.name,
        version = manifest.version
    )
}

fn readme_template(manifest: &ProjectManifest) -> String {
    format!(
        "# {name}\n\n{description}\n\n## Installation\n\n```bash\nzarch install {name}\n```\n",
        name = manifest.name,
        description = manifest.description
    )
}
