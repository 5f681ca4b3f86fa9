use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use tokio::fs;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::core::UpdateError;
use crate::provider::comparison::parse_release_version;
use crate::provider::manifest::{
    Fetcher, Manifest, ManifestEntry, artifact_location, manifest_location,
};
use crate::provider::staging::{PendingUpdate, StagingArea};
use crate::provider::verification::ChecksumVerifier;
use crate::upgrade::collaborators::{
    ApplyStatus, Candidate, Installer, ProvisioningStatus, ResolveReport,
};

/// Resolution context of a [`ManifestInstaller`]: the entry selected for apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestOperation {
    /// Location of the manifest the entry was read from.
    pub manifest: Url,
    pub entry: ManifestEntry,
}

/// [`Installer`] backed by a JSON update manifest.
///
/// Offers every entry newer than the installed version, newest first. Applying
/// downloads the artifact into the staging directory, verifies its checksum and
/// records it as the pending update.
#[derive(Debug, Clone)]
pub struct ManifestInstaller {
    installed_version: String,
    staging: StagingArea,
    fetcher: Fetcher,
}

impl ManifestInstaller {
    pub fn new(installed_version: impl Into<String>, staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            installed_version: installed_version.into(),
            staging: StagingArea::new(staging_dir),
            fetcher: Fetcher::new(),
        }
    }

    #[must_use]
    pub fn with_fetcher(mut self, fetcher: Fetcher) -> Self {
        self.fetcher = fetcher;
        self
    }

    #[must_use]
    pub const fn staging(&self) -> &StagingArea {
        &self.staging
    }

    async fn try_resolve(&self, repository: &Url) -> Result<ResolveReport<ManifestOperation>, UpdateError> {
        let installed = parse_release_version(&self.installed_version).map_err(|e| {
            UpdateError::Configuration {
                message: format!("installed version '{}' is invalid: {e}", self.installed_version),
            }
        })?;

        let location = manifest_location(repository)?;
        let bytes = self.fetcher.fetch(&location).await?;
        let content = String::from_utf8_lossy(&bytes);
        let manifest = Manifest::parse(&content, &location)?;
        debug!("Manifest {} lists {} update(s)", location, manifest.updates.len());

        let mut newer: Vec<_> = manifest
            .updates
            .into_iter()
            .filter_map(|entry| {
                let Some(version) = entry.version.as_deref() else {
                    warn!("Skipping update '{}' without a version", entry.id);
                    return None;
                };
                match parse_release_version(version) {
                    Ok(parsed) => (parsed > installed).then_some((parsed, entry)),
                    Err(e) => {
                        warn!("Skipping update '{}' with invalid version '{version}': {e}", entry.id);
                        None
                    }
                }
            })
            .collect();

        if newer.is_empty() {
            return Ok(ResolveReport::empty(ProvisioningStatus::nothing_to_update()));
        }

        // Newest first; stable for equal versions so manifest order breaks ties
        newer.sort_by(|(a, _), (b, _)| b.cmp(a));

        let candidates = newer
            .iter()
            .map(|(_, entry)| Candidate {
                id: entry.id.clone(),
                version: entry.version.clone(),
                properties: entry.properties.clone(),
            })
            .collect();
        let operation = newer.into_iter().next().map(|(_, entry)| ManifestOperation {
            manifest: location,
            entry,
        });

        Ok(ResolveReport {
            status: ProvisioningStatus::resolved(),
            candidates,
            operation,
        })
    }

    async fn try_apply(
        &self,
        operation: &ManifestOperation,
        cancel: &CancellationToken,
    ) -> Result<ApplyStatus, UpdateError> {
        let entry = &operation.entry;
        let version = entry.version.clone().unwrap_or_default();
        let source = artifact_location(&operation.manifest, &entry.artifact)?;

        info!("Downloading {} {} from {}", entry.id, version, source);
        let bytes = tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(ApplyStatus::Cancelled),
            bytes = self.fetcher.fetch(&source) => bytes?,
        };

        let file_name = source.path_segments().and_then(|mut s| s.next_back()).unwrap_or_default();
        let target = self.staging.artifact_path(&entry.id, &version, file_name);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }

        let partial = target.with_extension("partial");
        fs::write(&partial, &bytes).await?;
        if let Err(e) = ChecksumVerifier::verify_checksum(&partial, &entry.artifact.sha256).await {
            let _ = fs::remove_file(&partial).await;
            return Err(e);
        }
        fs::rename(&partial, &target).await?;

        if cancel.is_cancelled() {
            let _ = fs::remove_file(&target).await;
            return Ok(ApplyStatus::Cancelled);
        }

        let pending = PendingUpdate {
            id: entry.id.clone(),
            version,
            artifact: target,
            sha256: ChecksumVerifier::normalize(&entry.artifact.sha256),
            source: source.to_string(),
            staged_at: Utc::now(),
        };
        self.staging.write_pending(&pending).await.map_err(|e| UpdateError::Other {
            message: format!("{e:#}"),
        })?;

        info!("Staged {} {} at {}", pending.id, pending.version, pending.artifact.display());
        Ok(ApplyStatus::Applied)
    }
}

#[async_trait]
impl Installer for ManifestInstaller {
    type Operation = ManifestOperation;

    async fn resolve(
        &self,
        repository: &Url,
        cancel: &CancellationToken,
    ) -> ResolveReport<ManifestOperation> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => ResolveReport::empty(ProvisioningStatus::cancelled()),
            result = self.try_resolve(repository) => result.unwrap_or_else(|e| {
                ResolveReport::empty(ProvisioningStatus::error(e.to_string()))
            }),
        }
    }

    async fn apply(&self, operation: &ManifestOperation, cancel: &CancellationToken) -> ApplyStatus {
        if cancel.is_cancelled() {
            return ApplyStatus::Cancelled;
        }
        self.try_apply(operation, cancel)
            .await
            .unwrap_or_else(|e| ApplyStatus::Failed(e.to_string()))
    }
}
