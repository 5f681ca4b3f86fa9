//! Values produced and consumed by an update run.

use std::fmt;

use uuid::Uuid;

/// Label used when the repository offers an update without a version string.
pub const UNKNOWN_VERSION: &str = "unknown version";

/// Metadata of the update offered to the user.
///
/// Built once by the resolver from the first candidate and never modified
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVersionInfo {
    version: String,
    description: Option<String>,
    minimum_runtime_required: Option<String>,
}

impl NewVersionInfo {
    /// Create the metadata for a candidate update.
    ///
    /// An empty or missing `version` is replaced by [`UNKNOWN_VERSION`].
    pub fn new(
        version: Option<String>,
        description: Option<String>,
        minimum_runtime_required: Option<String>,
    ) -> Self {
        let version = version
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| UNKNOWN_VERSION.to_string());

        Self {
            version,
            description,
            minimum_runtime_required,
        }
    }

    /// Human-readable version of the update. Never empty.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Release notes, if the repository published any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Release notes, rendering an absent description as empty text.
    #[must_use]
    pub fn description_or_empty(&self) -> &str {
        self.description.as_deref().unwrap_or_default()
    }

    /// Minimum runtime version the update needs, if any.
    #[must_use]
    pub fn minimum_runtime_required(&self) -> Option<&str> {
        self.minimum_runtime_required.as_deref()
    }
}

/// Result of one resolution attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionOutcome {
    /// The application is up to date.
    NoUpdateAvailable,
    /// The check was cancelled by the user or the system.
    Cancelled,
    /// The check failed; carries the installer's diagnostic.
    Failed(String),
    /// An update can be installed.
    UpdateFound(NewVersionInfo),
}

/// Phase of an update run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrchestratorState {
    /// No run in progress, or the run has concluded.
    Idle,
    /// Resolving the repository.
    Checking,
    /// Waiting for the user to accept or decline the update.
    AwaitingConfirmation,
    /// Installing the accepted update.
    Applying,
    /// Waiting for the user to choose between restarting now or later.
    AwaitingRestart,
    /// Saving state and restarting the application.
    Restarting,
}

impl fmt::Display for OrchestratorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Checking => "checking",
            Self::AwaitingConfirmation => "awaiting-confirmation",
            Self::Applying => "applying",
            Self::AwaitingRestart => "awaiting-restart",
            Self::Restarting => "restarting",
        };
        f.write_str(name)
    }
}

/// Answer to the restart prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartChoice {
    /// Save state and restart immediately.
    Now,
    /// Keep running; the update takes effect on the next start.
    Later,
}

/// Data shown by the update confirmation prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatePrompt {
    /// Version of the offered update.
    pub version: String,
    /// Release notes.
    pub description: Option<String>,
    /// Whether the update needs a newer runtime than the current one.
    pub runtime_gate_triggered: bool,
}

/// How an update run ended when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// No update was available.
    UpToDate,
    /// The check or the installation was cancelled.
    Cancelled,
    /// The user declined the offered update.
    Declined {
        /// Declined version
        version: String,
    },
    /// The update was installed and the user chose to restart later.
    RestartDeferred {
        /// Installed version
        version: String,
    },
    /// The update was installed but saving state failed, so no restart happened.
    RestartWithheld {
        /// Installed version
        version: String,
    },
    /// The update was installed and a restart was requested.
    Restarted {
        /// Installed version
        version: String,
    },
}

impl RunOutcome {
    /// Whether an update was installed during the run.
    #[must_use]
    pub const fn update_applied(&self) -> bool {
        matches!(
            self,
            Self::RestartDeferred { .. } | Self::RestartWithheld { .. } | Self::Restarted { .. }
        )
    }
}

/// Progress event published on every state transition of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateProgress {
    /// Identifier of the run that emitted the event.
    pub run_id: Uuid,
    /// State the run just entered.
    pub state: OrchestratorState,
}
