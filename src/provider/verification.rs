//! Checksum verification of downloaded artifacts.
//!
//! Checksums are written as `sha256:<hex>`. The prefix is optional in manifests
//! and comparison ignores case.

use std::path::Path;

use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::{debug, info};

use crate::core::UpdateError;

const SHA256_PREFIX: &str = "sha256:";

pub struct ChecksumVerifier;

impl ChecksumVerifier {
    /// SHA256 of `data` in `sha256:<hex>` form.
    #[must_use]
    pub fn sha256_of(data: &[u8]) -> String {
        let digest = Sha256::digest(data);
        format!("{SHA256_PREFIX}{}", hex::encode(digest))
    }

    /// SHA256 of a file in `sha256:<hex>` form.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub async fn compute_sha256(file_path: &Path) -> Result<String, UpdateError> {
        debug!("Computing SHA256 checksum for: {}", file_path.display());
        let contents = fs::read(file_path).await?;
        Ok(Self::sha256_of(&contents))
    }

    /// Normalize a checksum to lowercase `sha256:<hex>`.
    #[must_use]
    pub fn normalize(checksum: &str) -> String {
        let trimmed = checksum.trim().to_ascii_lowercase();
        if trimmed.starts_with(SHA256_PREFIX) {
            trimmed
        } else {
            format!("{SHA256_PREFIX}{trimmed}")
        }
    }

    /// Check a file against the expected checksum.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::ChecksumMismatch`] if the digests differ, or an IO
    /// error if the file cannot be read.
    pub async fn verify_checksum(file_path: &Path, expected: &str) -> Result<(), UpdateError> {
        info!("Verifying checksum for: {}", file_path.display());

        let actual = Self::compute_sha256(file_path).await?;
        let expected = Self::normalize(expected);

        if actual != expected {
            return Err(UpdateError::ChecksumMismatch {
                artifact: file_path.display().to_string(),
                expected,
                actual,
            });
        }

        debug!("Checksum verification successful");
        Ok(())
    }
}
