//! Capability interfaces the orchestrator depends on.
//!
//! The orchestrator never talks to a package engine, a user interface or the
//! process supervisor directly. It consumes three collaborators:
//!
//! - [`Installer`] - resolves a repository into candidate updates and applies one
//! - [`Confirmation`] - asks the user to accept an update and to restart
//! - [`ProcessLifecycle`] - saves unsaved state and restarts the application
//!
//! Implementations live in [`crate::provider`] (a manifest repository installer),
//! [`crate::host`] (command hooks) and [`crate::upgrade::foreground`] (prompt
//! handoff to the interactive surface).

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::upgrade::model::{RestartChoice, UpdatePrompt};

/// Candidate property holding the release notes.
pub const DESCRIPTION_PROPERTY: &str = "latest.changes.description";

/// Candidate property holding the minimum runtime version.
pub const MINIMUM_RUNTIME_PROPERTY: &str = "latest.changes.minimumRuntimeRequired";

/// Severity attached to a provisioning status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Ok,
    Info,
    Warning,
    Error,
    Cancel,
}

/// Status code attached to a provisioning status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// Resolution produced candidate updates.
    Resolved,
    /// Everything installed is already current.
    NothingToUpdate,
    /// Provider-specific code the orchestrator does not know.
    Unrecognized(i32),
}

/// Raw status reported by an [`Installer`] for a resolve call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningStatus {
    pub severity: Severity,
    pub code: StatusCode,
    pub message: String,
}

impl ProvisioningStatus {
    /// Resolution succeeded and produced candidates.
    pub fn resolved() -> Self {
        Self {
            severity: Severity::Ok,
            code: StatusCode::Resolved,
            message: String::new(),
        }
    }

    /// Nothing to update.
    pub fn nothing_to_update() -> Self {
        Self {
            severity: Severity::Info,
            code: StatusCode::NothingToUpdate,
            message: "No updates found".to_string(),
        }
    }

    /// Resolution was cancelled.
    pub fn cancelled() -> Self {
        Self {
            severity: Severity::Cancel,
            code: StatusCode::Resolved,
            message: "Operation cancelled".to_string(),
        }
    }

    /// Resolution failed with the given diagnostic.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code: StatusCode::Resolved,
            message: message.into(),
        }
    }
}

/// One installable update as described by the repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Repository identifier of the update unit.
    pub id: String,
    /// Version of the replacement, when published.
    #[serde(default)]
    pub version: Option<String>,
    /// Provider-defined properties.
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl Candidate {
    pub fn new(id: impl Into<String>, version: Option<&str>) -> Self {
        Self {
            id: id.into(),
            version: version.map(str::to_string),
            properties: BTreeMap::new(),
        }
    }

    /// Builder-style helper to attach a property.
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Look up a property by key.
    #[must_use]
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}

/// Everything an [`Installer`] learned from one resolve call.
///
/// `operation` is the installer's own resolution context. It is handed back to
/// [`Installer::apply`] unchanged and should be present whenever `candidates`
/// is non-empty.
#[derive(Debug)]
pub struct ResolveReport<O> {
    pub status: ProvisioningStatus,
    /// Candidates in the provider's preferred order (newest first).
    pub candidates: Vec<Candidate>,
    pub operation: Option<O>,
}

impl<O> ResolveReport<O> {
    /// A report with no candidates and no operation.
    pub fn empty(status: ProvisioningStatus) -> Self {
        Self {
            status,
            candidates: Vec::new(),
            operation: None,
        }
    }
}

/// Result of [`Installer::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyStatus {
    Applied,
    Cancelled,
    Failed(String),
}

/// Provisioning engine able to resolve and install updates.
#[async_trait]
pub trait Installer: Send + Sync {
    /// Resolution context kept between resolve and apply.
    type Operation: Send + Sync;

    /// Look up available updates in `repository`.
    async fn resolve(
        &self,
        repository: &Url,
        cancel: &CancellationToken,
    ) -> ResolveReport<Self::Operation>;

    /// Install the update selected during resolution.
    async fn apply(&self, operation: &Self::Operation, cancel: &CancellationToken) -> ApplyStatus;
}

/// Presentation layer prompts.
///
/// Implementations run (or forward to) the interactive surface. Each call
/// completes only once the user answered.
#[async_trait]
pub trait Confirmation: Send + Sync {
    /// Ask whether to install the update. `true` means accepted.
    async fn confirm_update(&self, prompt: &UpdatePrompt) -> bool;

    /// Ask whether to restart now or later.
    async fn confirm_restart(&self) -> RestartChoice;

    /// Tell the user that no update is available. Does not wait for the user.
    fn notify_no_update_available(&self);
}

/// Process lifecycle primitives of the host application.
#[async_trait]
pub trait ProcessLifecycle: Send + Sync {
    /// Save all unsaved state. `true` means it is safe to restart.
    async fn save_all_unsaved_state(&self) -> bool;

    /// Restart the application process.
    async fn restart_process(&self);
}
