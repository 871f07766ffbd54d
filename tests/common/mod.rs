// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

#![allow(dead_code)]

use flate2::Compression;
use flate2::write::GzEncoder;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use zarch::Config;
use zarch::pkgspec::PackageSpec;
use zarch::registry::{
    DownloadStream, PackageInfo, Registry, Resolution, SearchHit, UploadReceipt, UploadRequest,
};
use zarch::{Error, Result};

/// A registry call, recorded in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    PackageInfo(String),
    ResolveBatch(Vec<String>),
    Download(String),
    Upload { spec: String, version: String },
    Login(String),
    Register(String),
    Search(String),
}

/// In-memory registry double
#[derive(Default)]
pub struct FakeRegistry {
    pub packages: BTreeMap<String, PackageInfo>,
    pub resolutions: BTreeMap<String, Resolution>,
    pub archives: BTreeMap<String, Vec<u8>>,
    /// Omit Content-Length on downloads
    pub hide_length: bool,
    pub accept_login: Option<(String, String)>,
    /// Usernames `register` refuses as already taken
    pub taken_usernames: Vec<String>,
    pub hits: Vec<SearchHit>,
    pub calls: RefCell<Vec<Call>>,
}

impl FakeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `files` as the latest version of `spec` at `url`
    pub fn with_package(
        mut self,
        spec: &str,
        version: &str,
        url: &str,
        files: &[(&str, &str)],
    ) -> Self {
        self.packages.insert(
            spec.to_string(),
            PackageInfo {
                latest_version: version.to_string(),
                download_url: url.to_string(),
                size: None,
                sha256: None,
            },
        );
        self.archives.insert(url.to_string(), tarball(files));
        self
    }

    pub fn with_resolution(mut self, spec: &str, resolution: Resolution) -> Self {
        self.resolutions.insert(spec.to_string(), resolution);
        self
    }

    pub fn with_archive(mut self, url: &str, bytes: Vec<u8>) -> Self {
        self.archives.insert(url.to_string(), bytes);
        self
    }

    pub fn with_login(mut self, username: &str, password: &str) -> Self {
        self.accept_login = Some((username.to_string(), password.to_string()));
        self
    }

    pub fn with_taken_username(mut self, username: &str) -> Self {
        self.taken_usernames.push(username.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn downloads(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Download(_)))
            .count()
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }
}

impl Registry for FakeRegistry {
    fn package_info(&self, spec: &PackageSpec) -> Result<PackageInfo> {
        self.record(Call::PackageInfo(spec.to_string()));
        self.packages
            .get(&spec.to_string())
            .or_else(|| self.packages.get(&spec.qualified()))
            .cloned()
            .ok_or_else(|| Error::PackageNotFound(spec.to_string()))
    }

    fn resolve_batch(
        &self,
        dependencies: &BTreeMap<String, String>,
    ) -> Result<BTreeMap<String, Resolution>> {
        self.record(Call::ResolveBatch(dependencies.keys().cloned().collect()));
        Ok(dependencies
            .keys()
            .filter_map(|k| self.resolutions.get(k).map(|r| (k.clone(), r.clone())))
            .collect())
    }

    fn download(&self, url: &str) -> Result<DownloadStream> {
        self.record(Call::Download(url.to_string()));
        let bytes = self
            .archives
            .get(url)
            .cloned()
            .ok_or_else(|| Error::ServerRejected {
                status: 404,
                message: format!("no archive at {url}"),
            })?;
        let content_length = (!self.hide_length).then_some(bytes.len() as u64);
        Ok(DownloadStream {
            reader: Box::new(std::io::Cursor::new(bytes)),
            content_length,
        })
    }

    fn upload(&self, _token: &str, request: UploadRequest<'_>) -> Result<UploadReceipt> {
        self.record(Call::Upload {
            spec: request.spec.to_string(),
            version: request.version.to_string(),
        });
        Ok(UploadReceipt {
            message: Some("published".to_string()),
            url: None,
        })
    }

    fn login(&self, username: &str, password: &str) -> Result<String> {
        self.record(Call::Login(username.to_string()));
        match &self.accept_login {
            Some((u, p)) if u == username && p == password => Ok(format!("token-{username}")),
            _ => Err(Error::Unauthorized("invalid credentials".to_string())),
        }
    }

    fn register(&self, username: &str, _password: &str, _email: &str) -> Result<String> {
        self.record(Call::Register(username.to_string()));
        if self.taken_usernames.iter().any(|u| u == username) {
            return Err(Error::ServerRejected {
                status: 409,
                message: "Username already taken".to_string(),
            });
        }
        Ok(format!("token-{username}"))
    }

    fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        self.record(Call::Search(query.to_string()));
        Ok(self
            .hits
            .iter()
            .filter(|h| h.name.contains(query))
            .cloned()
            .collect())
    }
}

/// Gzipped tarball holding `files` at its root
pub fn tarball(files: &[(&str, &str)]) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (path, content) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, path, content.as_bytes())
            .unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

/// Scratch workspace: a project dir plus isolated modules, downloads and credentials
pub struct Workspace {
    pub temp_dir: TempDir,
    pub project: PathBuf,
    pub config: Config,
}

impl Workspace {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let project = temp_dir.path().join("project");
        let modules = temp_dir.path().join("modules");
        let downloads = temp_dir.path().join("downloads");
        std::fs::create_dir_all(&project).unwrap();
        std::fs::create_dir_all(&modules).unwrap();
        std::fs::create_dir_all(&downloads).unwrap();

        let config = Config {
            registry_url: "http://registry.invalid".to_string(),
            modules_dir: modules,
            credentials_path: temp_dir.path().join("home/.zarch/credentials.json"),
            download_dir: downloads,
            http_timeout_secs: 5,
            archive_mtime: zarch::archive::DEFAULT_MTIME,
        };
        Self {
            temp_dir,
            project,
            config,
        }
    }

    pub fn modules(&self) -> &Path {
        &self.config.modules_dir
    }

    pub fn downloads(&self) -> &Path {
        &self.config.download_dir
    }

    /// Write a minimal manifest for `name`
    pub fn with_manifest(self, name: &str) -> Self {
        zarch::ManifestStore::new(&self.project)
            .initialize(name)
            .unwrap();
        self
    }

    pub fn write(&self, relative: &str, content: &str) {
        let path = self.project.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    pub fn read(&self, relative: &str) -> String {
        std::fs::read_to_string(self.project.join(relative)).unwrap()
    }

    /// Specs parsed from the project's SwiftList.txt, comments skipped
    pub fn dependency_specs(&self) -> Vec<String> {
        zarch::Ledger::new(&self.project)
            .dependencies()
            .read_all()
            .unwrap()
            .into_iter()
            .map(|entry| entry.spec.to_string())
            .collect()
    }

    /// Names left in the download dir
    pub fn leftover_downloads(&self) -> Vec<String> {
        std::fs::read_dir(self.downloads())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect()
    }
}
