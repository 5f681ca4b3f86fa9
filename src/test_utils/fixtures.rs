//! On-disk update repositories for tests.

use std::path::Path;

use serde_json::json;
use tempfile::TempDir;
use url::Url;

use crate::provider::verification::ChecksumVerifier;
use crate::upgrade::{DESCRIPTION_PROPERTY, MINIMUM_RUNTIME_PROPERTY};

/// A manifest repository in a temporary directory.
///
/// Each [`add_update`](Self::add_update) writes the artifact next to the
/// manifest and rewrites `updates.json`.
pub struct ManifestRepoFixture {
    dir: TempDir,
    updates: Vec<serde_json::Value>,
}

impl ManifestRepoFixture {
    pub fn new() -> Self {
        let fixture = Self {
            dir: TempDir::new().expect("Failed to create temp dir"),
            updates: Vec::new(),
        };
        fixture.write_manifest();
        fixture
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Directory URI of the repository (`file:///.../`).
    pub fn uri(&self) -> String {
        Url::from_directory_path(self.dir.path()).expect("Temp dir is absolute").to_string()
    }

    /// Publish an update whose artifact holds `content`.
    pub fn add_update(
        &mut self,
        version: &str,
        description: Option<&str>,
        minimum_runtime: Option<&str>,
        content: &[u8],
    ) -> &mut Self {
        let checksum = ChecksumVerifier::sha256_of(content);
        self.publish(version, description, minimum_runtime, content, &checksum)
    }

    /// Publish an update whose declared checksum does not match its artifact.
    pub fn add_corrupt_update(&mut self, version: &str, content: &[u8]) -> &mut Self {
        let checksum = ChecksumVerifier::sha256_of(b"something else");
        self.publish(version, None, None, content, &checksum)
    }

    /// Replace the manifest with arbitrary text.
    pub fn write_raw_manifest(&self, content: &str) {
        std::fs::write(self.dir.path().join("updates.json"), content)
            .expect("Failed to write manifest");
    }

    fn publish(
        &mut self,
        version: &str,
        description: Option<&str>,
        minimum_runtime: Option<&str>,
        content: &[u8],
        checksum: &str,
    ) -> &mut Self {
        let artifact = format!("app-{version}.bin");
        std::fs::write(self.dir.path().join(&artifact), content).expect("Failed to write artifact");

        let mut properties = serde_json::Map::new();
        if let Some(description) = description {
            properties.insert(DESCRIPTION_PROPERTY.to_string(), json!(description));
        }
        if let Some(minimum_runtime) = minimum_runtime {
            properties.insert(MINIMUM_RUNTIME_PROPERTY.to_string(), json!(minimum_runtime));
        }

        self.updates.push(json!({
            "id": "app",
            "version": version,
            "properties": properties,
            "artifact": { "url": artifact, "sha256": checksum },
        }));
        self.write_manifest();
        self
    }

    fn write_manifest(&self) {
        let manifest = json!({ "updates": self.updates });
        self.write_raw_manifest(&manifest.to_string());
    }
}

impl Default for ManifestRepoFixture {
    fn default() -> Self {
        Self::new()
    }
}
