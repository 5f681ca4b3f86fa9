//! Update manifest format and retrieval.
//!
//! A repository is a JSON document listing the published updates:
//!
//! ```json
//! {
//!   "updates": [
//!     {
//!       "id": "app",
//!       "version": "25.1",
//!       "properties": {
//!         "latest.changes.description": "Faster startup",
//!         "latest.changes.minimumRuntimeRequired": "21.0"
//!       },
//!       "artifact": { "url": "app-25.1.tar.gz", "sha256": "sha256:..." }
//!     }
//!   ]
//! }
//! ```
//!
//! Artifact URLs are resolved relative to the manifest. A repository URI that
//! does not name a `.json` file is treated as a directory containing
//! `updates.json`.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_retry::RetryIf;
use tokio_retry::strategy::ExponentialBackoff;
use tracing::debug;
use url::Url;

use crate::core::UpdateError;

/// File looked up in directory-style repositories.
pub const MANIFEST_FILE: &str = "updates.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub updates: Vec<ManifestEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub id: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    pub artifact: Artifact,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Absolute URL, or a path relative to the manifest.
    pub url: String,
    pub sha256: String,
}

impl Manifest {
    /// Parse a manifest read from `location`.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::ManifestParse`] for malformed JSON or a document
    /// that does not match the manifest schema.
    pub fn parse(content: &str, location: &Url) -> Result<Self, UpdateError> {
        serde_json::from_str(content).map_err(|e| UpdateError::ManifestParse {
            location: location.to_string(),
            reason: e.to_string(),
        })
    }
}

/// URL of the manifest document for a repository URI.
///
/// # Errors
///
/// Returns [`UpdateError::InvalidRepositoryUri`] if the URI cannot serve as a base.
pub fn manifest_location(repository: &Url) -> Result<Url, UpdateError> {
    if repository.path().ends_with(".json") {
        return Ok(repository.clone());
    }

    let mut base = repository.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(MANIFEST_FILE).map_err(|e| UpdateError::InvalidRepositoryUri {
        uri: repository.to_string(),
        reason: e.to_string(),
    })
}

/// Resolve an artifact URL against the manifest location.
///
/// # Errors
///
/// Returns [`UpdateError::ManifestParse`] if the artifact URL is invalid.
pub fn artifact_location(manifest: &Url, artifact: &Artifact) -> Result<Url, UpdateError> {
    manifest.join(&artifact.url).map_err(|e| UpdateError::ManifestParse {
        location: manifest.to_string(),
        reason: format!("invalid artifact URL '{}': {e}", artifact.url),
    })
}

/// Reads repository documents and artifacts over `file`, `http` and `https`.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    retries: usize,
}

impl Default for Fetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Fetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            retries: 3,
        }
    }

    /// Number of retries after a transient HTTP failure.
    #[must_use]
    pub const fn with_retries(mut self, retries: usize) -> Self {
        self.retries = retries;
        self
    }

    /// Fetch the bytes at `url`.
    ///
    /// # Errors
    ///
    /// - [`UpdateError::InvalidRepositoryUri`] for unsupported schemes or
    ///   `file` URLs that do not denote a local path
    /// - [`UpdateError::IoError`] if a local file cannot be read
    /// - [`UpdateError::NetworkError`] if the HTTP request fails
    pub async fn fetch(&self, url: &Url) -> Result<Vec<u8>, UpdateError> {
        match url.scheme() {
            "file" => {
                let path = url.to_file_path().map_err(|()| UpdateError::InvalidRepositoryUri {
                    uri: url.to_string(),
                    reason: "not a local file path".to_string(),
                })?;
                debug!("Reading {}", path.display());
                Ok(tokio::fs::read(&path).await?)
            }
            "http" | "https" => self.fetch_http(url).await,
            scheme => Err(UpdateError::InvalidRepositoryUri {
                uri: url.to_string(),
                reason: format!("unsupported scheme '{scheme}'"),
            }),
        }
    }

    async fn fetch_http(&self, url: &Url) -> Result<Vec<u8>, UpdateError> {
        let retry_strategy = ExponentialBackoff::from_millis(100)
            .factor(2)
            .max_delay(Duration::from_secs(2))
            .take(self.retries);

        RetryIf::start(
            retry_strategy,
            || {
                let client = self.client.clone();
                let url = url.clone();
                async move {
                    debug!("GET {}", url);
                    let response = client
                        .get(url)
                        .header(reqwest::header::USER_AGENT, concat!("updraft/", env!("CARGO_PKG_VERSION")))
                        .send()
                        .await?
                        .error_for_status()?;
                    response.bytes().await.map(|bytes| bytes.to_vec())
                }
            },
            is_transient,
        )
        .await
        .map_err(|e| UpdateError::NetworkError {
            operation: format!("GET {url}"),
            reason: e.to_string(),
        })
    }
}

fn is_transient(error: &reqwest::Error) -> bool {
    let transient = error.is_timeout()
        || error.is_connect()
        || error.status().is_some_and(|status| status.is_server_error());
    if transient {
        debug!("Transient network error, retrying: {error}");
    }
    transient
}
