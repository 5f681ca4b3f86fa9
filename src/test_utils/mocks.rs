//! Scripted collaborators with call recording.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::upgrade::{
    ApplyStatus, Candidate, Confirmation, Installer, ProcessLifecycle, ProvisioningStatus,
    ResolveReport, RestartChoice, UpdatePrompt,
};

/// Installer returning a scripted report on every resolve.
///
/// The operation is the id of the first candidate.
pub struct ScriptedInstaller {
    status: ProvisioningStatus,
    candidates: Vec<Candidate>,
    later_candidates: Option<Vec<Candidate>>,
    missing_operations: usize,
    apply_status: ApplyStatus,
    resolve_gate: Option<Arc<Notify>>,
    resolve_calls: AtomicUsize,
    applied: Mutex<Vec<String>>,
    repositories: Mutex<Vec<Url>>,
}

impl ScriptedInstaller {
    pub fn new(status: ProvisioningStatus, candidates: Vec<Candidate>) -> Self {
        Self {
            status,
            candidates,
            later_candidates: None,
            missing_operations: 0,
            apply_status: ApplyStatus::Applied,
            resolve_gate: None,
            resolve_calls: AtomicUsize::new(0),
            applied: Mutex::new(Vec::new()),
            repositories: Mutex::new(Vec::new()),
        }
    }

    pub fn nothing_to_update() -> Self {
        Self::new(ProvisioningStatus::nothing_to_update(), Vec::new())
    }

    pub fn cancelled() -> Self {
        Self::new(ProvisioningStatus::cancelled(), Vec::new())
    }

    pub fn failing(message: &str) -> Self {
        Self::new(ProvisioningStatus::error(message), Vec::new())
    }

    pub fn offering(candidates: Vec<Candidate>) -> Self {
        Self::new(ProvisioningStatus::resolved(), candidates)
    }

    #[must_use]
    pub fn with_apply(mut self, status: ApplyStatus) -> Self {
        self.apply_status = status;
        self
    }

    /// Report candidates but never a resolution context.
    #[must_use]
    pub fn without_operation(mut self) -> Self {
        self.missing_operations = usize::MAX;
        self
    }

    /// Omit the resolution context from the first resolve only.
    #[must_use]
    pub fn without_operation_on_first_resolve(mut self) -> Self {
        self.missing_operations = 1;
        self
    }

    /// Offer `candidates` from the second resolve on.
    #[must_use]
    pub fn then_offering(mut self, candidates: Vec<Candidate>) -> Self {
        self.later_candidates = Some(candidates);
        self
    }

    /// Block every resolve until `gate` is notified or the run is cancelled.
    #[must_use]
    pub fn with_resolve_gate(mut self, gate: Arc<Notify>) -> Self {
        self.resolve_gate = Some(gate);
        self
    }

    pub fn resolve_calls(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst)
    }

    pub fn apply_calls(&self) -> usize {
        self.applied.lock().unwrap().len()
    }

    /// Operations passed to apply, in call order.
    pub fn applied_operations(&self) -> Vec<String> {
        self.applied.lock().unwrap().clone()
    }

    pub fn resolved_repositories(&self) -> Vec<Url> {
        self.repositories.lock().unwrap().clone()
    }
}

#[async_trait]
impl Installer for ScriptedInstaller {
    type Operation = String;

    async fn resolve(&self, repository: &Url, cancel: &CancellationToken) -> ResolveReport<String> {
        let call = self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        self.repositories.lock().unwrap().push(repository.clone());

        if let Some(gate) = &self.resolve_gate {
            tokio::select! {
                () = gate.notified() => {}
                () = cancel.cancelled() => {
                    return ResolveReport::empty(ProvisioningStatus::cancelled());
                }
            }
        }

        let candidates = match &self.later_candidates {
            Some(later) if call > 0 => later,
            _ => &self.candidates,
        };
        let operation = if call < self.missing_operations {
            None
        } else {
            candidates.first().map(|c| c.id.clone())
        };
        ResolveReport {
            status: self.status.clone(),
            candidates: candidates.clone(),
            operation,
        }
    }

    async fn apply(&self, operation: &String, _cancel: &CancellationToken) -> ApplyStatus {
        self.applied.lock().unwrap().push(operation.clone());
        self.apply_status.clone()
    }
}

/// Confirmation surface with fixed answers.
pub struct MockConfirmation {
    accept_update: bool,
    restart: RestartChoice,
    update_prompts: Mutex<Vec<UpdatePrompt>>,
    restart_prompts: AtomicUsize,
    notices: AtomicUsize,
}

impl MockConfirmation {
    pub fn new(accept_update: bool, restart: RestartChoice) -> Self {
        Self {
            accept_update,
            restart,
            update_prompts: Mutex::new(Vec::new()),
            restart_prompts: AtomicUsize::new(0),
            notices: AtomicUsize::new(0),
        }
    }

    pub fn accepting(restart: RestartChoice) -> Self {
        Self::new(true, restart)
    }

    pub fn declining() -> Self {
        Self::new(false, RestartChoice::Later)
    }

    pub fn update_prompts(&self) -> Vec<UpdatePrompt> {
        self.update_prompts.lock().unwrap().clone()
    }

    pub fn restart_prompt_count(&self) -> usize {
        self.restart_prompts.load(Ordering::SeqCst)
    }

    pub fn notice_count(&self) -> usize {
        self.notices.load(Ordering::SeqCst)
    }

    /// Confirmation and restart prompts shown so far.
    pub fn dialog_count(&self) -> usize {
        self.update_prompts.lock().unwrap().len() + self.restart_prompt_count()
    }
}

#[async_trait]
impl Confirmation for MockConfirmation {
    async fn confirm_update(&self, prompt: &UpdatePrompt) -> bool {
        self.update_prompts.lock().unwrap().push(prompt.clone());
        self.accept_update
    }

    async fn confirm_restart(&self) -> RestartChoice {
        self.restart_prompts.fetch_add(1, Ordering::SeqCst);
        self.restart
    }

    fn notify_no_update_available(&self) {
        self.notices.fetch_add(1, Ordering::SeqCst);
    }
}

/// Process lifecycle with a fixed save result.
pub struct MockLifecycle {
    save_result: bool,
    save_calls: AtomicUsize,
    restart_calls: AtomicUsize,
}

impl MockLifecycle {
    pub fn new(save_result: bool) -> Self {
        Self {
            save_result,
            save_calls: AtomicUsize::new(0),
            restart_calls: AtomicUsize::new(0),
        }
    }

    pub fn save_calls(&self) -> usize {
        self.save_calls.load(Ordering::SeqCst)
    }

    pub fn restart_calls(&self) -> usize {
        self.restart_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProcessLifecycle for MockLifecycle {
    async fn save_all_unsaved_state(&self) -> bool {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        self.save_result
    }

    async fn restart_process(&self) {
        self.restart_calls.fetch_add(1, Ordering::SeqCst);
    }
}
