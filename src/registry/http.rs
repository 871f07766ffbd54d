// src/registry/http.rs

//! HTTP implementation of the registry boundary
//!
//! Thin wrapper over a blocking reqwest client. Requests carry the configured
//! timeout and are never retried. Non-success statuses are turned into
//! `Unauthorized` (401/403) or `ServerRejected` carrying the server's own
//! error text.

use super::{
    DownloadStream, PackageInfo, Registry, Resolution, SearchHit, UploadReceipt, UploadRequest,
};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::pkgspec::PackageSpec;
use reqwest::StatusCode;
use reqwest::blocking::{Client, Response, multipart};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use tracing::{debug, info};
use url::Url;

#[derive(Deserialize)]
struct ResolveResponse {
    #[serde(default)]
    resolved: BTreeMap<String, Resolution>,
}

#[derive(Deserialize)]
struct AuthResponse {
    token: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

/// Error payload shapes the registry is known to send
#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

pub struct HttpRegistry {
    client: Client,
    base: Url,
}

impl HttpRegistry {
    pub fn new(config: &Config) -> Result<Self> {
        let base = Url::parse(&format!("{}/", config.registry_url.trim_end_matches('/')))
            .map_err(|e| Error::Malformed {
                path: "registry URL".to_string(),
                reason: format!("{}: {}", config.registry_url, e),
            })?;

        let client = Client::builder()
            .timeout(config.http_timeout())
            .user_agent(concat!("zarch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::NetworkError(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, base })
    }

    /// Resolve `path` against the registry base; absolute URLs pass through
    ///
    /// Root-relative paths (`/dl/x.tgz`) stay under the base path, so a
    /// registry mounted at a prefix serves downloads from that prefix too.
    pub fn url_for(&self, path: &str) -> Result<Url> {
        let relative = match path.strip_prefix('/') {
            Some(rest) if !rest.starts_with('/') => rest,
            _ => path,
        };
        self.base.join(relative).map_err(|e| Error::Malformed {
            path: "download URL".to_string(),
            reason: format!("{path}: {e}"),
        })
    }

    fn api(&self, path: &str) -> Result<Url> {
        self.url_for(path)
    }

    fn send(&self, request: reqwest::blocking::RequestBuilder) -> Result<Response> {
        let response = request.send()?;
        check_status(response)
    }

    fn json<T: DeserializeOwned>(response: Response) -> Result<T> {
        let url = response.url().to_string();
        response.json::<T>().map_err(|e| Error::ServerRejected {
            status: 200,
            message: format!("unexpected response from {url}: {e}"),
        })
    }
}

/// Map a non-success status to the error taxonomy
fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().unwrap_or_default();
    let message = server_message(&body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    });

    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::Unauthorized(message),
        _ => Error::ServerRejected {
            status: status.as_u16(),
            message,
        },
    })
}

/// Pull the human-readable text out of an error body
fn server_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str::<ErrorBody>(trimmed) {
        Ok(parsed) => parsed.error.or(parsed.message),
        Err(_) => Some(trimmed.chars().take(200).collect()),
    }
}

impl Registry for HttpRegistry {
    fn package_info(&self, spec: &PackageSpec) -> Result<PackageInfo> {
        let url = self.api(&format!("api/package/info/{}/{}", spec.scope, spec.name))?;
        debug!("GET {}", url);

        let response = self.client.get(url).send()?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::PackageNotFound(spec.to_string()));
        }
        Self::json(check_status(response)?)
    }

    fn resolve_batch(
        &self,
        dependencies: &BTreeMap<String, String>,
    ) -> Result<BTreeMap<String, Resolution>> {
        let url = self.api("api/package/resolve")?;
        info!("Resolving {} dependencies via {}", dependencies.len(), url);

        let body = serde_json::json!({ "dependencies": dependencies });
        let response = self.send(self.client.post(url).json(&body))?;
        let parsed: ResolveResponse = Self::json(response)?;
        Ok(parsed.resolved)
    }

    fn download(&self, url: &str) -> Result<DownloadStream> {
        let url = self.url_for(url)?;
        debug!("Downloading {}", url);

        let response = self.send(self.client.get(url))?;
        let content_length = response.content_length();
        Ok(DownloadStream {
            reader: Box::new(response),
            content_length,
        })
    }

    fn upload(&self, token: &str, request: UploadRequest<'_>) -> Result<UploadReceipt> {
        let url = self.api(&format!(
            "api/package/upload/{}/{}",
            request.spec.scope, request.spec.name
        ))?;
        info!("Uploading {} to {}", request.archive.display(), url);

        let form = multipart::Form::new()
            .text("version", request.version.to_string())
            .text("description", request.description.to_string())
            .file("file", request.archive)
            .map_err(|e| Error::io(request.archive, e))?;

        let response = self.send(self.client.post(url).bearer_auth(token).multipart(form))?;
        let text = response.text()?;
        Ok(serde_json::from_str(&text).unwrap_or_default())
    }

    fn login(&self, username: &str, password: &str) -> Result<String> {
        let url = self.api("api/auth/login")?;
        let body = serde_json::json!({ "username": username, "password": password });
        let response = self.send(self.client.post(url).json(&body))?;
        let parsed: AuthResponse = Self::json(response)?;
        Ok(parsed.token)
    }

    fn register(&self, username: &str, password: &str, email: &str) -> Result<String> {
        let url = self.api("api/auth/register")?;
        let body = serde_json::json!({
            "username": username,
            "password": password,
            "email": email,
        });
        let response = self.send(self.client.post(url).json(&body))?;
        let parsed: AuthResponse = Self::json(response)?;
        Ok(parsed.token)
    }

    fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        let url = self.api("api/package/search")?;
        let response = self.send(self.client.get(url).query(&[("q", query)]))?;
        let parsed: SearchResponse = Self::json(response)?;
        Ok(parsed.results)
    }
}
