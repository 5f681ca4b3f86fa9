use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tempfile::TempDir;

use updraft::core::UpdateError;
use updraft::provider::ManifestInstaller;
use updraft::test_utils::{ManifestRepoFixture, MockConfirmation, MockLifecycle, init_test_logging};
use updraft::upgrade::{
    PromptHandler, RestartChoice, RunOutcome, UpdateOrchestrator, UpdatePrompt, VersionGate,
    foreground,
};

fn orchestrator(
    repo: &ManifestRepoFixture,
    staging: &TempDir,
    confirmation: Arc<MockConfirmation>,
    lifecycle: Arc<MockLifecycle>,
) -> UpdateOrchestrator<ManifestInstaller> {
    UpdateOrchestrator::new(
        Arc::new(ManifestInstaller::new("24.3", staging.path())),
        confirmation,
        lifecycle,
        VersionGate::new("17.0.2"),
        repo.uri(),
    )
}

#[tokio::test]
async fn test_full_run_stages_update_and_defers_restart() -> Result<()> {
    init_test_logging(None);
    let mut repo = ManifestRepoFixture::new();
    repo.add_update("25.1", Some("Faster startup"), None, b"release 25.1");
    let staging = TempDir::new()?;
    let confirmation = Arc::new(MockConfirmation::accepting(RestartChoice::Later));
    let lifecycle = Arc::new(MockLifecycle::new(true));
    let orchestrator = orchestrator(&repo, &staging, confirmation.clone(), lifecycle.clone());

    let outcome = orchestrator.run_update_check(true).await?;

    assert_eq!(
        outcome,
        RunOutcome::RestartDeferred {
            version: "25.1".to_string()
        }
    );
    let prompts = confirmation.update_prompts();
    assert_eq!(prompts.len(), 1);
    assert_eq!(prompts[0].description.as_deref(), Some("Faster startup"));
    assert!(!prompts[0].runtime_gate_triggered);
    assert_eq!(lifecycle.restart_calls(), 0);

    let pending = ManifestInstaller::new("24.3", staging.path()).staging().load_pending().await?;
    assert_eq!(pending.map(|p| p.version), Some("25.1".to_string()));
    Ok(())
}

#[tokio::test]
async fn test_runtime_gate_from_manifest_property() -> Result<()> {
    let mut repo = ManifestRepoFixture::new();
    repo.add_update("25.1", None, Some("21.0"), b"needs newer runtime");
    let staging = TempDir::new()?;
    let confirmation = Arc::new(MockConfirmation::declining());
    let orchestrator =
        orchestrator(&repo, &staging, confirmation.clone(), Arc::new(MockLifecycle::new(true)));

    let outcome = orchestrator.run_update_check(false).await?;

    assert_eq!(
        outcome,
        RunOutcome::Declined {
            version: "25.1".to_string()
        }
    );
    assert!(confirmation.update_prompts()[0].runtime_gate_triggered);
    Ok(())
}

#[tokio::test]
async fn test_up_to_date_repository() -> Result<()> {
    let mut repo = ManifestRepoFixture::new();
    repo.add_update("24.3", None, None, b"current");
    let staging = TempDir::new()?;
    let confirmation = Arc::new(MockConfirmation::declining());
    let orchestrator =
        orchestrator(&repo, &staging, confirmation.clone(), Arc::new(MockLifecycle::new(true)));

    assert_eq!(orchestrator.run_update_check(false).await?, RunOutcome::UpToDate);
    assert_eq!(confirmation.notice_count(), 1);
    assert_eq!(confirmation.dialog_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_corrupt_artifact_fails_install() -> Result<()> {
    let mut repo = ManifestRepoFixture::new();
    repo.add_corrupt_update("25.1", b"tampered");
    let staging = TempDir::new()?;
    let confirmation = Arc::new(MockConfirmation::accepting(RestartChoice::Now));
    let lifecycle = Arc::new(MockLifecycle::new(true));
    let orchestrator = orchestrator(&repo, &staging, confirmation.clone(), lifecycle.clone());

    let err = orchestrator.run_update_check(false).await.unwrap_err();

    assert!(matches!(err, UpdateError::InstallFailed { .. }), "got {err:?}");
    assert_eq!(confirmation.restart_prompt_count(), 0);
    assert_eq!(lifecycle.save_calls(), 0);
    Ok(())
}

#[tokio::test]
async fn test_broken_manifest_fails_resolution() -> Result<()> {
    let repo = ManifestRepoFixture::new();
    repo.write_raw_manifest("<html>502 Bad Gateway</html>");
    let staging = TempDir::new()?;
    let confirmation = Arc::new(MockConfirmation::declining());
    let orchestrator =
        orchestrator(&repo, &staging, confirmation.clone(), Arc::new(MockLifecycle::new(true)));

    let err = orchestrator.run_update_check(true).await.unwrap_err();

    assert!(matches!(err, UpdateError::ResolutionFailed { .. }), "got {err:?}");
    assert_eq!(confirmation.dialog_count(), 0);
    assert_eq!(confirmation.notice_count(), 0);
    Ok(())
}

/// Answers prompts from the foreground side of the handoff channel.
#[derive(Default)]
struct ScriptedForeground {
    accept: bool,
    restart: Option<RestartChoice>,
    prompts: Vec<UpdatePrompt>,
    restart_prompts: usize,
    notices: usize,
}

#[async_trait]
impl PromptHandler for ScriptedForeground {
    async fn confirm_update(&mut self, prompt: &UpdatePrompt) -> bool {
        self.prompts.push(prompt.clone());
        self.accept
    }

    async fn confirm_restart(&mut self) -> RestartChoice {
        self.restart_prompts += 1;
        self.restart.unwrap_or(RestartChoice::Later)
    }

    async fn notify_no_update_available(&mut self) {
        self.notices += 1;
    }
}

#[tokio::test]
async fn test_background_run_hands_prompts_to_foreground() -> Result<()> {
    let mut repo = ManifestRepoFixture::new();
    repo.add_update("25.1", Some("notes"), None, b"release");
    let staging = TempDir::new()?;
    let lifecycle = Arc::new(MockLifecycle::new(true));
    let (confirmation, mut foreground) = foreground::channel();

    let orchestrator = Arc::new(UpdateOrchestrator::new(
        Arc::new(ManifestInstaller::new("24.3", staging.path())),
        Arc::new(confirmation),
        lifecycle.clone(),
        VersionGate::new("17.0"),
        repo.uri(),
    ));

    let mut handler = ScriptedForeground {
        accept: true,
        restart: Some(RestartChoice::Now),
        ..Default::default()
    };
    let task = orchestrator.spawn(false)?;
    let outcome = foreground.run_until(&mut handler, task.join()).await?;

    assert_eq!(
        outcome,
        RunOutcome::Restarted {
            version: "25.1".to_string()
        }
    );
    assert_eq!(handler.prompts.len(), 1);
    assert_eq!(handler.restart_prompts, 1);
    assert_eq!(handler.notices, 0);
    assert_eq!(lifecycle.save_calls(), 1);
    assert_eq!(lifecycle.restart_calls(), 1);
    Ok(())
}

#[tokio::test]
async fn test_foreground_receives_up_to_date_notice() -> Result<()> {
    let repo = ManifestRepoFixture::new();
    let staging = TempDir::new()?;
    let (confirmation, mut foreground) = foreground::channel();
    let orchestrator = Arc::new(UpdateOrchestrator::new(
        Arc::new(ManifestInstaller::new("24.3", staging.path())),
        Arc::new(confirmation),
        Arc::new(MockLifecycle::new(true)),
        VersionGate::new("17.0"),
        repo.uri(),
    ));

    let mut handler = ScriptedForeground::default();
    let task = orchestrator.spawn(false)?;
    let outcome = foreground.run_until(&mut handler, task.join()).await?;

    assert_eq!(outcome, RunOutcome::UpToDate);
    assert_eq!(handler.notices, 1);
    assert!(handler.prompts.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_dropped_foreground_declines() -> Result<()> {
    let mut repo = ManifestRepoFixture::new();
    repo.add_update("25.1", None, None, b"release");
    let staging = TempDir::new()?;
    let (confirmation, foreground) = foreground::channel();
    drop(foreground);

    let orchestrator = UpdateOrchestrator::new(
        Arc::new(ManifestInstaller::new("24.3", staging.path())),
        Arc::new(confirmation),
        Arc::new(MockLifecycle::new(true)),
        VersionGate::new("17.0"),
        repo.uri(),
    );

    let outcome = orchestrator.run_update_check(false).await?;
    assert_eq!(
        outcome,
        RunOutcome::Declined {
            version: "25.1".to_string()
        }
    );
    Ok(())
}
