// src/config.rs
//! Process-wide configuration
//!
//! Built once at startup and handed to every component by reference.
//! Layers, lowest precedence first: built-in defaults, `~/.zarch/config.toml`,
//! `ZARCH_*` environment variables, then command-line flags applied by the
//! binary.

use crate::archive::DEFAULT_MTIME;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Default registry location
pub const DEFAULT_REGISTRY_URL: &str = "https://zenv-hub.onrender.com";

/// Default shared module root
pub const DEFAULT_MODULES_DIR: &str = "/usr/local/lib/swift";

/// Default HTTP timeout in seconds
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Per-user state directory name under the home directory
const USER_DIR: &str = ".zarch";

pub const ENV_REGISTRY: &str = "ZARCH_REGISTRY";
pub const ENV_MODULES_DIR: &str = "ZARCH_MODULES_DIR";
pub const ENV_CREDENTIALS: &str = "ZARCH_CREDENTIALS";
pub const ENV_TMPDIR: &str = "ZARCH_TMPDIR";
/// Reproducible-builds convention for archive timestamps
pub const ENV_SOURCE_DATE_EPOCH: &str = "SOURCE_DATE_EPOCH";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Base URL of the package registry
    pub registry_url: String,
    /// Shared directory where installed packages are extracted
    pub modules_dir: PathBuf,
    /// Location of the persisted credential file
    pub credentials_path: PathBuf,
    /// Where archives are streamed to before extraction
    pub download_dir: PathBuf,
    pub http_timeout_secs: u64,
    /// Timestamp written into every archive entry
    pub archive_mtime: u64,
}

/// Optional overrides read from `config.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub registry_url: Option<String>,

    #[serde(default)]
    pub modules_dir: Option<PathBuf>,

    #[serde(default)]
    pub credentials_path: Option<PathBuf>,

    #[serde(default)]
    pub download_dir: Option<PathBuf>,

    #[serde(default)]
    pub http_timeout_secs: Option<u64>,
}

impl ConfigFile {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        toml::from_str(&content).map_err(|e| Error::malformed(path, e))
    }
}

impl Default for Config {
    fn default() -> Self {
        let user_dir = user_dir();
        Self {
            registry_url: DEFAULT_REGISTRY_URL.to_string(),
            modules_dir: PathBuf::from(DEFAULT_MODULES_DIR),
            credentials_path: user_dir.join("credentials.json"),
            download_dir: std::env::temp_dir(),
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            archive_mtime: DEFAULT_MTIME,
        }
    }
}

impl Config {
    /// Load configuration from the user config file and the process environment
    pub fn load() -> Result<Self> {
        let path = user_dir().join("config.toml");
        let file = if path.exists() {
            debug!("Reading configuration from {}", path.display());
            Some(ConfigFile::from_file(&path)?)
        } else {
            None
        };
        Ok(Self::resolve(file, |key| std::env::var(key).ok()))
    }

    /// Layer an optional config file and an environment lookup over the defaults
    pub fn resolve<F>(file: Option<ConfigFile>, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(file) = file {
            if let Some(url) = file.registry_url {
                config.registry_url = url;
            }
            if let Some(dir) = file.modules_dir {
                config.modules_dir = dir;
            }
            if let Some(path) = file.credentials_path {
                config.credentials_path = path;
            }
            if let Some(dir) = file.download_dir {
                config.download_dir = dir;
            }
            if let Some(secs) = file.http_timeout_secs {
                config.http_timeout_secs = secs;
            }
        }

        let non_empty = |key: &str| env(key).filter(|v| !v.trim().is_empty());
        if let Some(url) = non_empty(ENV_REGISTRY) {
            config.registry_url = url;
        }
        if let Some(dir) = non_empty(ENV_MODULES_DIR) {
            config.modules_dir = PathBuf::from(dir);
        }
        if let Some(path) = non_empty(ENV_CREDENTIALS) {
            config.credentials_path = PathBuf::from(path);
        }
        if let Some(dir) = non_empty(ENV_TMPDIR) {
            config.download_dir = PathBuf::from(dir);
        }
        match non_empty(ENV_SOURCE_DATE_EPOCH).map(|v| v.trim().parse::<u64>()) {
            Some(Ok(epoch)) => config.archive_mtime = epoch,
            Some(Err(_)) => warn!("Ignoring non-numeric {}", ENV_SOURCE_DATE_EPOCH),
            None => {}
        }

        config.registry_url = config.registry_url.trim_end_matches('/').to_string();
        config
    }

    /// Apply command-line overrides, the highest-precedence layer
    pub fn with_overrides(
        mut self,
        registry_url: Option<&str>,
        modules_dir: Option<&Path>,
    ) -> Self {
        if let Some(url) = registry_url {
            self.registry_url = url.trim_end_matches('/').to_string();
        }
        if let Some(dir) = modules_dir {
            self.modules_dir = dir.to_path_buf();
        }
        self
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

/// `~/.zarch`, falling back to the working directory when no home is known
fn user_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(USER_DIR)
}
