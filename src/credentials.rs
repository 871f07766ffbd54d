// src/credentials.rs

//! Persisted registry credentials
//!
//! One credential set per user account, stored outside any project tree.
//! Login and register replace it, logout deletes it. A missing file is
//! not an error: [`CredentialStore::current_token`] returns `None` so callers
//! can fail with `Unauthorized` before touching the network.

use crate::error::{Error, Result};
use crate::filesystem::{ensure_dir, write_private};
use crate::registry::Registry;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub token: String,
    pub login_time: DateTime<Utc>,
}

/// Result of [`CredentialStore::logout`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogoutOutcome {
    LoggedOut { username: String },
    /// There was no credential file; nothing to do
    NotLoggedIn,
}

#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Authenticate against the registry and persist the issued token
    ///
    /// Nothing is written when the registry refuses.
    pub fn login(
        &self,
        registry: &dyn Registry,
        username: &str,
        password: &str,
    ) -> Result<Credentials> {
        let token = registry.login(username, password)?;
        self.persist(username, token)
    }

    /// Create an account and persist the issued token
    pub fn register(
        &self,
        registry: &dyn Registry,
        username: &str,
        password: &str,
        email: &str,
    ) -> Result<Credentials> {
        let token = registry.register(username, password, email)?;
        self.persist(username, token)
    }

    pub fn logout(&self) -> Result<LogoutOutcome> {
        // A corrupt file is still removed
        let username = self.load().ok().flatten().map(|c| c.username);

        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                info!("Removed credentials at {}", self.path.display());
                Ok(LogoutOutcome::LoggedOut {
                    username: username.unwrap_or_default(),
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("No credentials stored at {}", self.path.display());
                Ok(LogoutOutcome::NotLoggedIn)
            }
            Err(e) => Err(Error::io(&self.path, e)),
        }
    }

    /// Stored credentials, or `None` when not logged in
    ///
    /// An unreadable or unparsable file is still an error.
    pub fn load(&self) -> Result<Option<Credentials>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::io(&self.path, e)),
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| Error::malformed(&self.path, e))
    }

    pub fn current_token(&self) -> Result<Option<String>> {
        Ok(self.load()?.map(|c| c.token))
    }

    /// Token or `Unauthorized`
    pub fn require_token(&self) -> Result<String> {
        self.current_token()?
            .ok_or_else(|| Error::Unauthorized("not logged in".to_string()))
    }

    fn persist(&self, username: &str, token: String) -> Result<Credentials> {
        let credentials = Credentials {
            username: username.to_string(),
            token,
            login_time: Utc::now(),
        };

        if let Some(parent) = self.path.parent() {
            ensure_dir(parent)?;
        }
        let json = serde_json::to_vec_pretty(&credentials)
            .map_err(|e| Error::Io(format!("serializing credentials: {e}")))?;
        write_private(&self.path, &json)?;

        info!("Stored credentials for {}", username);
        Ok(credentials)
    }
}
