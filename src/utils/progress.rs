//! Terminal progress indication for update runs.
//!
//! Wraps an [`indicatif`] spinner that follows the [`UpdateProgress`] events of
//! a run. Progress is hidden when the `UPDRAFT_NO_PROGRESS` environment variable
//! is set or when the caller disables it (`--no-progress`).

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::upgrade::{OrchestratorState, UpdateProgress};

/// Environment variable that disables progress output.
pub const NO_PROGRESS_ENV: &str = "UPDRAFT_NO_PROGRESS";

fn is_progress_disabled() -> bool {
    std::env::var_os(NO_PROGRESS_ENV).is_some()
}

/// Spinner shown while a run is in flight.
#[derive(Clone)]
pub struct Spinner {
    inner: ProgressBar,
}

impl Spinner {
    /// Create a spinner. It is hidden if `enabled` is false or progress is
    /// disabled through the environment.
    pub fn new(enabled: bool) -> Self {
        let inner = if enabled && !is_progress_disabled() {
            let bar = ProgressBar::new_spinner();
            bar.set_style(spinner_style());
            bar.enable_steady_tick(Duration::from_millis(100));
            bar
        } else {
            ProgressBar::hidden()
        };
        Self {
            inner,
        }
    }

    /// A spinner that never draws.
    pub fn hidden() -> Self {
        Self {
            inner: ProgressBar::hidden(),
        }
    }

    pub fn is_hidden(&self) -> bool {
        self.inner.is_hidden()
    }

    pub fn set_message(&self, msg: impl Into<String>) {
        self.inner.set_message(msg.into());
    }

    /// Hide the spinner while `f` writes to the terminal.
    pub fn suspend<F: FnOnce() -> R, R>(&self, f: F) -> R {
        self.inner.suspend(f)
    }

    pub fn finish_and_clear(&self) {
        self.inner.finish_and_clear();
    }

    /// Follow progress events until the sender side is dropped.
    pub fn follow(&self, mut events: mpsc::UnboundedReceiver<UpdateProgress>) -> JoinHandle<()> {
        let spinner = self.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                if let Some(message) = state_message(event.state) {
                    spinner.set_message(message);
                }
            }
            spinner.finish_and_clear();
        })
    }
}

/// Spinner text for a run state. `None` keeps the current text; prompts
/// suspend the spinner themselves.
#[must_use]
pub const fn state_message(state: OrchestratorState) -> Option<&'static str> {
    match state {
        OrchestratorState::Checking => Some("Checking for updates..."),
        OrchestratorState::Applying => Some("Installing update..."),
        OrchestratorState::Restarting => Some("Saving state and restarting..."),
        OrchestratorState::Idle
        | OrchestratorState::AwaitingConfirmation
        | OrchestratorState::AwaitingRestart => None,
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
}
