// src/registry/mod.rs

//! Registry boundary
//!
//! Everything that talks to the package registry goes through the
//! [`Registry`] trait, so the install engine, the credential store and the
//! lifecycle commands can be driven by an in-memory registry in tests.
//! [`HttpRegistry`] is the production implementation.

mod http;

pub use http::HttpRegistry;

use crate::error::Result;
use crate::pkgspec::PackageSpec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::io::Read;
use std::path::Path;

/// Registry answer for a single package lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageInfo {
    pub latest_version: String,
    pub download_url: String,

    #[serde(default)]
    pub size: Option<u64>,

    #[serde(default)]
    pub sha256: Option<String>,
}

/// One member of a batch-resolve answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Resolution {
    /// The registry could not resolve this member
    Failed { error: String },
    Resolved(ResolvedPackage),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPackage {
    pub version: String,
    pub url: String,

    #[serde(default)]
    pub sha256: Option<String>,
}

impl From<PackageInfo> for ResolvedPackage {
    fn from(info: PackageInfo) -> Self {
        Self {
            version: info.latest_version,
            url: info.download_url,
            sha256: info.sha256,
        }
    }
}

/// Archive body being streamed from the registry
pub struct DownloadStream {
    pub reader: Box<dyn Read + Send>,
    /// Declared length, when the server sent one
    pub content_length: Option<u64>,
}

impl fmt::Debug for DownloadStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadStream")
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Everything needed to publish one archive
#[derive(Debug, Clone, Copy)]
pub struct UploadRequest<'a> {
    pub spec: &'a PackageSpec,
    pub version: &'a str,
    pub description: &'a str,
    pub archive: &'a Path,
}

/// Registry acknowledgement of a publish
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReceipt {
    #[serde(default)]
    pub message: Option<String>,

    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub name: String,

    #[serde(default = "default_scope")]
    pub scope: String,

    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub description: String,
}

fn default_scope() -> String {
    crate::pkgspec::DEFAULT_SCOPE.to_string()
}

impl SearchHit {
    /// The hit as a package spec, in the form the dependency list uses
    pub fn spec(&self) -> Result<PackageSpec> {
        PackageSpec::new(&self.scope, &self.name)
    }
}

impl fmt::Display for SearchHit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.spec() {
            Ok(spec) => write!(f, "{} ({})", spec, self.version)?,
            Err(_) => write!(f, "@{}/{} ({})", self.scope, self.name, self.version)?,
        }
        if !self.description.is_empty() {
            write!(f, " - {}", self.description)?;
        }
        Ok(())
    }
}

/// Operations the client needs from a package registry
///
/// Implementations never retry; a failure is returned to the caller as is.
pub trait Registry {
    /// Latest version and download location for one package
    ///
    /// A package the registry does not know is `Error::PackageNotFound`.
    fn package_info(&self, spec: &PackageSpec) -> Result<PackageInfo>;

    /// Resolve many `spec -> version` requests in one round trip
    fn resolve_batch(
        &self,
        dependencies: &BTreeMap<String, String>,
    ) -> Result<BTreeMap<String, Resolution>>;

    /// Open an archive for streaming; relative URLs are registry-relative
    fn download(&self, url: &str) -> Result<DownloadStream>;

    fn upload(&self, token: &str, request: UploadRequest<'_>) -> Result<UploadReceipt>;

    /// Returns the bearer token issued by the registry
    fn login(&self, username: &str, password: &str) -> Result<String>;

    fn register(&self, username: &str, password: &str, email: &str) -> Result<String>;

    fn search(&self, query: &str) -> Result<Vec<SearchHit>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_variants() {
        let json = r#"{
            "left-pad": {"error": "Package not found"},
            "@acme/widget": {"version": "2.0.0", "url": "/dl/widget-2.0.0.tgz"}
        }"#;
        let parsed: BTreeMap<String, Resolution> = serde_json::from_str(json).unwrap();

        assert_eq!(
            parsed["left-pad"],
            Resolution::Failed {
                error: "Package not found".to_string()
            }
        );
        match &parsed["@acme/widget"] {
            Resolution::Resolved(pkg) => {
                assert_eq!(pkg.version, "2.0.0");
                assert!(pkg.sha256.is_none());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_search_hit_display() {
        let hit: SearchHit =
            serde_json::from_str(r#"{"name": "widget", "version": "2.1.0", "description": "UI"}"#)
                .unwrap();
        assert_eq!(hit.to_string(), "widget (2.1.0) - UI");

        let scoped: SearchHit =
            serde_json::from_str(r#"{"name": "widget", "scope": "acme", "version": "2.1.0"}"#)
                .unwrap();
        assert_eq!(scoped.to_string(), "@acme/widget (2.1.0)");
    }
}
