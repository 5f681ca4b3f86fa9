//! The update run state machine.
//!
//! An [`UpdateOrchestrator`] drives one update run through its phases:
//!
//! ```text
//! Idle → Checking ─┬─ NoUpdateAvailable / Cancelled / Failed ──────────────→ Idle
//!                  └─ UpdateFound → AwaitingConfirmation ─┬─ declined ──────→ Idle
//!                                                         └─ accepted → Applying
//! Applying ─┬─ cancelled / failed ──────────────────────────────────────────→ Idle
//!           └─ applied → AwaitingRestart ─┬─ later ─────────────────────────→ Idle
//!                                         └─ now → Restarting ──────────────→ Idle
//! ```
//!
//! The resolution context returned by the installer lives in a run-local
//! [`UpdateRun`] and is dropped when the run returns to `Idle`. Only one run may
//! be active per orchestrator; a second request fails with
//! [`UpdateError::RunInProgress`] and leaves the first run untouched.
//!
//! Cancellation is reported as [`RunOutcome::Cancelled`], never as an error.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};
use url::Url;
use uuid::Uuid;

use crate::core::UpdateError;
use crate::upgrade::collaborators::{ApplyStatus, Confirmation, Installer, ProcessLifecycle};
use crate::upgrade::model::{
    OrchestratorState, ResolutionOutcome, RestartChoice, RunOutcome, UpdatePrompt, UpdateProgress,
};
use crate::upgrade::resolver::{UpdateResolver, parse_repository_uri};
use crate::upgrade::version_gate::VersionGate;

/// Coordinates check, confirmation, installation and restart.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use updraft::host::CommandLifecycle;
/// use updraft::provider::ManifestInstaller;
/// use updraft::upgrade::{UpdateOrchestrator, VersionGate, foreground};
///
/// # async fn example() -> anyhow::Result<()> {
/// let installer = Arc::new(ManifestInstaller::new("1.0.0", std::env::temp_dir()));
/// let (confirmation, _foreground) = foreground::channel();
/// let orchestrator = UpdateOrchestrator::new(
///     installer,
///     Arc::new(confirmation),
///     Arc::new(CommandLifecycle::default()),
///     VersionGate::new("17.0"),
///     "https://example.com/updates/",
/// );
///
/// let outcome = orchestrator.run_update_check(true).await?;
/// println!("{outcome:?}");
/// # Ok(())
/// # }
/// ```
pub struct UpdateOrchestrator<I: Installer> {
    resolver: UpdateResolver<I>,
    installer: Arc<I>,
    confirmation: Arc<dyn Confirmation>,
    lifecycle: Arc<dyn ProcessLifecycle>,
    gate: VersionGate,
    repository: String,
    progress: Option<mpsc::UnboundedSender<UpdateProgress>>,
    active: Arc<AtomicBool>,
}

impl<I: Installer> UpdateOrchestrator<I> {
    /// Create an orchestrator for the given repository URI.
    ///
    /// The URI is validated at the start of every run, not here.
    pub fn new(
        installer: Arc<I>,
        confirmation: Arc<dyn Confirmation>,
        lifecycle: Arc<dyn ProcessLifecycle>,
        gate: VersionGate,
        repository: impl Into<String>,
    ) -> Self {
        Self {
            resolver: UpdateResolver::new(Arc::clone(&installer)),
            installer,
            confirmation,
            lifecycle,
            gate,
            repository: repository.into(),
            progress: None,
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Publish an [`UpdateProgress`] event on every state transition.
    #[must_use]
    pub fn with_progress(mut self, sender: mpsc::UnboundedSender<UpdateProgress>) -> Self {
        self.progress = Some(sender);
        self
    }

    /// Whether a run is currently in flight.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Run one update check to completion on the current task.
    ///
    /// With `silent_if_no_update` set, an up-to-date result produces no notice.
    ///
    /// # Errors
    ///
    /// - [`UpdateError::RunInProgress`] if another run is active
    /// - [`UpdateError::InvalidRepositoryUri`] if the repository URI is malformed
    /// - [`UpdateError::ResolutionFailed`] if the repository could not be resolved
    /// - [`UpdateError::InstallFailed`] if the accepted update could not be installed
    pub async fn run_update_check(&self, silent_if_no_update: bool) -> Result<RunOutcome, UpdateError> {
        self.run_update_check_with_cancel(silent_if_no_update, &CancellationToken::new()).await
    }

    /// Like [`run_update_check`](Self::run_update_check), observing `cancel`
    /// throughout the run.
    ///
    /// # Errors
    ///
    /// See [`run_update_check`](Self::run_update_check).
    pub async fn run_update_check_with_cancel(
        &self,
        silent_if_no_update: bool,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome, UpdateError> {
        let guard = RunGuard::acquire(&self.active)?;
        self.execute(silent_if_no_update, cancel, guard).await
    }

    /// Start a run on a background task.
    ///
    /// The single-run check happens before the task is spawned, so a rejected
    /// request never starts a task.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::RunInProgress`] if another run is active.
    pub fn spawn(self: &Arc<Self>, silent_if_no_update: bool) -> Result<UpdateTask, UpdateError>
    where
        I: 'static,
        I::Operation: 'static,
    {
        let guard = RunGuard::acquire(&self.active)?;
        let cancel = CancellationToken::new();
        let orchestrator = Arc::clone(self);
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            orchestrator.execute(silent_if_no_update, &token, guard).await
        });

        Ok(UpdateTask {
            cancel,
            handle,
        })
    }

    async fn execute(
        &self,
        silent: bool,
        cancel: &CancellationToken,
        guard: RunGuard,
    ) -> Result<RunOutcome, UpdateError> {
        let run_id = Uuid::new_v4();
        let span = info_span!("update_run", %run_id, silent);

        async move {
            let repository = match parse_repository_uri(&self.repository) {
                Ok(url) => url,
                Err(e) => {
                    error!("Update check aborted: {e}");
                    return Err(e);
                }
            };

            let mut run = UpdateRun {
                id: run_id,
                silent,
                repository,
                cancel,
                operation: None,
                state: OrchestratorState::Idle,
            };

            let result = self.drive(&mut run).await;

            run.operation = None;
            self.enter(&mut run, OrchestratorState::Idle);
            drop(guard);

            match &result {
                Ok(outcome) => info!("Update run finished: {outcome:?}"),
                Err(e) => warn!("Update run failed: {e}"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn drive(&self, run: &mut UpdateRun<'_, I::Operation>) -> Result<RunOutcome, UpdateError> {
        // Checking
        self.enter(run, OrchestratorState::Checking);
        let resolution = self.resolver.resolve(&run.repository, run.cancel).await;
        run.operation = resolution.operation;

        let info = match resolution.outcome {
            ResolutionOutcome::NoUpdateAvailable => {
                info!("No update available");
                if !run.silent {
                    self.confirmation.notify_no_update_available();
                }
                return Ok(RunOutcome::UpToDate);
            }
            ResolutionOutcome::Cancelled => {
                debug!("Update check cancelled");
                return Ok(RunOutcome::Cancelled);
            }
            ResolutionOutcome::Failed(diagnostic) => {
                return Err(UpdateError::ResolutionFailed {
                    diagnostic,
                });
            }
            ResolutionOutcome::UpdateFound(info) => info,
        };
        info!("Update {} is available", info.version());

        // AwaitingConfirmation
        self.enter(run, OrchestratorState::AwaitingConfirmation);
        let prompt = UpdatePrompt {
            version: info.version().to_string(),
            description: info.description().map(str::to_string),
            runtime_gate_triggered: self.gate.requires_newer_runtime(info.minimum_runtime_required()),
        };

        let accepted = tokio::select! {
            biased;
            () = run.cancel.cancelled() => return Ok(RunOutcome::Cancelled),
            accepted = self.confirmation.confirm_update(&prompt) => accepted,
        };
        if !accepted {
            info!("Update {} declined", prompt.version);
            return Ok(RunOutcome::Declined {
                version: prompt.version,
            });
        }

        // Applying
        self.enter(run, OrchestratorState::Applying);
        if run.operation.is_none() {
            debug!("No resolution context retained, resolving again before apply");
            let resolution = self.resolver.resolve(&run.repository, run.cancel).await;
            match resolution.outcome {
                ResolutionOutcome::UpdateFound(offered) if offered.version() == prompt.version => {
                    run.operation = resolution.operation;
                }
                ResolutionOutcome::UpdateFound(offered) => {
                    warn!(
                        "Offered update changed from {} to {} before install",
                        prompt.version,
                        offered.version()
                    );
                    return Err(UpdateError::InstallFailed {
                        diagnostic: format!(
                            "the repository now offers {} instead of the confirmed update {}",
                            offered.version(),
                            prompt.version
                        ),
                    });
                }
                ResolutionOutcome::NoUpdateAvailable => return Ok(RunOutcome::UpToDate),
                ResolutionOutcome::Cancelled => return Ok(RunOutcome::Cancelled),
                ResolutionOutcome::Failed(diagnostic) => {
                    return Err(UpdateError::ResolutionFailed {
                        diagnostic,
                    });
                }
            }
        }

        let Some(operation) = run.operation.as_ref() else {
            return Err(UpdateError::InstallFailed {
                diagnostic: "the installer returned no resolution context to apply".to_string(),
            });
        };

        match self.installer.apply(operation, run.cancel).await {
            ApplyStatus::Applied => info!("Update {} installed", prompt.version),
            ApplyStatus::Cancelled => {
                debug!("Installation cancelled");
                return Ok(RunOutcome::Cancelled);
            }
            ApplyStatus::Failed(diagnostic) => {
                return Err(UpdateError::InstallFailed {
                    diagnostic,
                });
            }
        }
        run.operation = None;

        // AwaitingRestart
        self.enter(run, OrchestratorState::AwaitingRestart);
        let choice = tokio::select! {
            biased;
            () = run.cancel.cancelled() => RestartChoice::Later,
            choice = self.confirmation.confirm_restart() => choice,
        };
        if choice == RestartChoice::Later {
            info!("Restart deferred, update takes effect on next start");
            return Ok(RunOutcome::RestartDeferred {
                version: prompt.version,
            });
        }

        // Restarting
        self.enter(run, OrchestratorState::Restarting);
        if !self.lifecycle.save_all_unsaved_state().await {
            warn!("Saving unsaved state failed, restart withheld");
            return Ok(RunOutcome::RestartWithheld {
                version: prompt.version,
            });
        }

        self.lifecycle.restart_process().await;
        Ok(RunOutcome::Restarted {
            version: prompt.version,
        })
    }

    fn enter(&self, run: &mut UpdateRun<'_, I::Operation>, state: OrchestratorState) {
        if run.state == state {
            return;
        }
        debug!("Update run {}: {} -> {}", run.id, run.state, state);
        run.state = state;

        if let Some(progress) = &self.progress {
            // A closed receiver only means nobody is watching
            let _ = progress.send(UpdateProgress {
                run_id: run.id,
                state,
            });
        }
    }
}

/// State owned by exactly one run.
struct UpdateRun<'a, O> {
    id: Uuid,
    silent: bool,
    repository: Url,
    cancel: &'a CancellationToken,
    /// Resolution context kept between Checking and Applying.
    operation: Option<O>,
    state: OrchestratorState,
}

/// Marks a run as active for as long as it is held.
struct RunGuard {
    active: Arc<AtomicBool>,
}

impl RunGuard {
    fn acquire(active: &Arc<AtomicBool>) -> Result<Self, UpdateError> {
        active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| UpdateError::RunInProgress)?;
        Ok(Self {
            active: Arc::clone(active),
        })
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.active.store(false, Ordering::Release);
    }
}

/// Handle to a run started with [`UpdateOrchestrator::spawn`].
#[derive(Debug)]
pub struct UpdateTask {
    cancel: CancellationToken,
    handle: JoinHandle<Result<RunOutcome, UpdateError>>,
}

impl UpdateTask {
    /// Request cancellation of the run. The run ends with [`RunOutcome::Cancelled`]
    /// unless the update was already installed.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the run to finish.
    ///
    /// # Errors
    ///
    /// Returns the run's error, or [`UpdateError::Other`] if the task panicked.
    pub async fn join(self) -> Result<RunOutcome, UpdateError> {
        self.handle.await.map_err(|e| UpdateError::Other {
            message: format!("Update task failed: {e}"),
        })?
    }
}
