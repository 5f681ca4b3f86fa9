//! Staging directory for downloaded updates.
//!
//! An applied update is not swapped into place while the application runs. The
//! artifact is written to the staging directory and described by a
//! `pending-update.json` record that the host picks up on its next start.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::debug;

/// File name of the pending update record.
pub const PENDING_UPDATE_FILE: &str = "pending-update.json";

/// An update that has been downloaded and verified but not yet activated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingUpdate {
    pub id: String,
    pub version: String,
    /// Location of the staged artifact.
    pub artifact: PathBuf,
    /// Verified checksum in `sha256:<hex>` form.
    pub sha256: String,
    /// Where the artifact was downloaded from.
    pub source: String,
    pub staged_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct StagingArea {
    dir: PathBuf,
}

impl StagingArea {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
        }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn pending_record_path(&self) -> PathBuf {
        self.dir.join(PENDING_UPDATE_FILE)
    }

    /// Path for an artifact of the given update. Only the final path segment of
    /// `file_name` is used.
    #[must_use]
    pub fn artifact_path(&self, id: &str, version: &str, file_name: &str) -> PathBuf {
        let file_name = Path::new(file_name)
            .file_name()
            .map_or_else(|| format!("{id}-{version}"), |name| name.to_string_lossy().into_owned());
        self.dir.join(format!("{}-{}", sanitize(id), sanitize(version))).join(file_name)
    }

    /// Write the pending update record, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the staging directory or record cannot be written.
    pub async fn write_pending(&self, pending: &PendingUpdate) -> Result<()> {
        fs::create_dir_all(&self.dir).await.with_context(|| {
            format!("Failed to create staging directory: {}", self.dir.display())
        })?;

        let path = self.pending_record_path();
        let content =
            serde_json::to_string_pretty(pending).context("Failed to serialize pending update")?;

        // Write then rename so a reader never sees a partial record
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, content)
            .await
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &path)
            .await
            .with_context(|| format!("Failed to move pending update record to {}", path.display()))?;

        debug!("Recorded pending update {} at {}", pending.version, path.display());
        Ok(())
    }

    /// Read the pending update record, if there is one.
    ///
    /// # Errors
    ///
    /// Returns an error if the record exists but cannot be read or parsed.
    pub async fn load_pending(&self) -> Result<Option<PendingUpdate>> {
        let path = self.pending_record_path();
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let pending = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(Some(pending))
    }

    /// Remove the pending update record. Returns whether one existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the record exists but cannot be removed.
    pub async fn clear_pending(&self) -> Result<bool> {
        let path = self.pending_record_path();
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path)
            .await
            .with_context(|| format!("Failed to remove {}", path.display()))?;
        Ok(true)
    }
}

fn sanitize(segment: &str) -> String {
    segment
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect()
}
