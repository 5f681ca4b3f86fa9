use anyhow::Result;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use url::Url;

use updraft::provider::ManifestInstaller;
use updraft::test_utils::ManifestRepoFixture;
use updraft::upgrade::{
    ApplyStatus, DESCRIPTION_PROPERTY, Installer, MINIMUM_RUNTIME_PROPERTY, ResolutionOutcome,
    Severity, StatusCode, UpdateResolver,
};

#[tokio::test]
async fn test_resolve_offers_newest_first() -> Result<()> {
    let mut repo = ManifestRepoFixture::new();
    repo.add_update("1.2.0", Some("Minor fixes"), None, b"v1.2")
        .add_update("2.0.0", Some("Big release"), Some("21.0"), b"v2")
        .add_update("0.9.0", None, None, b"old");
    let staging = TempDir::new()?;
    let installer = ManifestInstaller::new("1.0.0", staging.path());

    let report = installer.resolve(&Url::parse(&repo.uri())?, &CancellationToken::new()).await;

    assert_eq!(report.status.code, StatusCode::Resolved);
    let versions: Vec<_> = report.candidates.iter().filter_map(|c| c.version.as_deref()).collect();
    assert_eq!(versions, vec!["2.0.0", "1.2.0"]);
    assert_eq!(report.candidates[0].property(DESCRIPTION_PROPERTY), Some("Big release"));
    assert_eq!(report.candidates[0].property(MINIMUM_RUNTIME_PROPERTY), Some("21.0"));

    let operation = report.operation.expect("operation for the newest entry");
    assert_eq!(operation.entry.version.as_deref(), Some("2.0.0"));
    Ok(())
}

#[tokio::test]
async fn test_nothing_newer_than_installed() -> Result<()> {
    let mut repo = ManifestRepoFixture::new();
    repo.add_update("1.0.0", None, None, b"same").add_update("0.5", None, None, b"older");
    let staging = TempDir::new()?;
    let installer = ManifestInstaller::new("v1.0.0", staging.path());

    let report = installer.resolve(&Url::parse(&repo.uri())?, &CancellationToken::new()).await;

    assert_eq!(report.status.code, StatusCode::NothingToUpdate);
    assert!(report.candidates.is_empty());
    assert!(report.operation.is_none());
    Ok(())
}

#[tokio::test]
async fn test_resolver_maps_manifest_to_update_info() -> Result<()> {
    let mut repo = ManifestRepoFixture::new();
    repo.add_update("25.1", Some("Faster startup"), Some("17.0.9"), b"payload");
    let staging = TempDir::new()?;
    let installer = std::sync::Arc::new(ManifestInstaller::new("24.3", staging.path()));
    let resolver = UpdateResolver::new(installer);

    let resolution = resolver.resolve(&Url::parse(&repo.uri())?, &CancellationToken::new()).await;

    match resolution.outcome {
        ResolutionOutcome::UpdateFound(info) => {
            assert_eq!(info.version(), "25.1");
            assert_eq!(info.description(), Some("Faster startup"));
            assert_eq!(info.minimum_runtime_required(), Some("17.0.9"));
        }
        other => panic!("Expected UpdateFound, got {other:?}"),
    }
    assert!(resolution.operation.is_some());
    Ok(())
}

#[tokio::test]
async fn test_invalid_manifest_is_reported_as_error() -> Result<()> {
    let repo = ManifestRepoFixture::new();
    repo.write_raw_manifest("{ this is not json");
    let staging = TempDir::new()?;
    let installer = ManifestInstaller::new("1.0.0", staging.path());

    let report = installer.resolve(&Url::parse(&repo.uri())?, &CancellationToken::new()).await;

    assert_eq!(report.status.severity, Severity::Error);
    assert!(report.status.message.contains("updates.json"), "message: {}", report.status.message);
    Ok(())
}

#[tokio::test]
async fn test_missing_repository_is_reported_as_error() -> Result<()> {
    let repo = ManifestRepoFixture::new();
    let missing = repo.path().join("does-not-exist");
    let staging = TempDir::new()?;
    let installer = ManifestInstaller::new("1.0.0", staging.path());
    let uri = Url::from_directory_path(&missing).expect("absolute path");

    let report = installer.resolve(&uri, &CancellationToken::new()).await;

    assert_eq!(report.status.severity, Severity::Error);
    Ok(())
}

#[tokio::test]
async fn test_apply_stages_verified_artifact() -> Result<()> {
    let mut repo = ManifestRepoFixture::new();
    repo.add_update("2.0.0", None, None, b"new binary");
    let staging = TempDir::new()?;
    let installer = ManifestInstaller::new("1.0.0", staging.path());
    let cancel = CancellationToken::new();

    let report = installer.resolve(&Url::parse(&repo.uri())?, &cancel).await;
    let operation = report.operation.expect("operation");
    let status = installer.apply(&operation, &cancel).await;

    assert_eq!(status, ApplyStatus::Applied);
    let pending = installer.staging().load_pending().await?.expect("pending update recorded");
    assert_eq!(pending.id, "app");
    assert_eq!(pending.version, "2.0.0");
    assert!(pending.sha256.starts_with("sha256:"));
    assert_eq!(std::fs::read(&pending.artifact)?, b"new binary");
    assert!(pending.artifact.starts_with(staging.path()));
    Ok(())
}

#[tokio::test]
async fn test_apply_rejects_checksum_mismatch() -> Result<()> {
    let mut repo = ManifestRepoFixture::new();
    repo.add_corrupt_update("2.0.0", b"tampered");
    let staging = TempDir::new()?;
    let installer = ManifestInstaller::new("1.0.0", staging.path());
    let cancel = CancellationToken::new();

    let report = installer.resolve(&Url::parse(&repo.uri())?, &cancel).await;
    let status = installer.apply(&report.operation.expect("operation"), &cancel).await;

    match status {
        ApplyStatus::Failed(diagnostic) => {
            assert!(diagnostic.to_lowercase().contains("checksum"), "diagnostic: {diagnostic}");
        }
        other => panic!("Expected Failed, got {other:?}"),
    }
    assert!(installer.staging().load_pending().await?.is_none());

    // Nothing but the (empty) staging layout is left behind
    let leftovers: Vec<_> = walk_files(staging.path());
    assert!(leftovers.is_empty(), "unexpected files: {leftovers:?}");
    Ok(())
}

#[tokio::test]
async fn test_apply_after_cancel_is_cancelled() -> Result<()> {
    let mut repo = ManifestRepoFixture::new();
    repo.add_update("2.0.0", None, None, b"new binary");
    let staging = TempDir::new()?;
    let installer = ManifestInstaller::new("1.0.0", staging.path());
    let cancel = CancellationToken::new();

    let report = installer.resolve(&Url::parse(&repo.uri())?, &cancel).await;
    cancel.cancel();
    let status = installer.apply(&report.operation.expect("operation"), &cancel).await;

    assert_eq!(status, ApplyStatus::Cancelled);
    assert!(installer.staging().load_pending().await?.is_none());
    Ok(())
}

fn walk_files(dir: &std::path::Path) -> Vec<std::path::PathBuf> {
    let mut files = Vec::new();
    let Ok(entries) = std::fs::read_dir(dir) else {
        return files;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            files.extend(walk_files(&path));
        } else {
            files.push(path);
        }
    }
    files
}
