//! Self-update orchestration.
//!
//! # Architecture Overview
//!
//! - **[`VersionGate`]**: decides whether an update needs a newer runtime
//! - **[`UpdateResolver`]**: turns an installer's resolve status into a
//!   [`ResolutionOutcome`]
//! - **[`UpdateOrchestrator`]**: the run state machine (check, confirm, apply,
//!   restart)
//!
//! The orchestrator depends on three capabilities defined in [`collaborators`]:
//! an [`Installer`], a [`Confirmation`] surface and the host's
//! [`ProcessLifecycle`]. [`foreground`] connects a background run to a prompt
//! handler running on the interactive context.
//!
//! ## Update Run Flow
//!
//! ```text
//! 1. Checking
//!    ├── Validate the repository URI (configuration error, no dialog)
//!    ├── Resolve the repository through the installer
//!    └── Up to date → optional notice │ cancelled → done │ failed → error
//!
//! 2. AwaitingConfirmation
//!    └── Prompt with version, description and the runtime gate flag
//!
//! 3. Applying
//!    └── Apply the resolution context kept from step 1
//!
//! 4. AwaitingRestart
//!    └── Restart now or later
//!
//! 5. Restarting
//!    └── Save unsaved state; restart only if saving succeeded
//! ```
//!
//! # Concurrency
//!
//! One run per orchestrator. Runs execute on a background task
//! ([`UpdateOrchestrator::spawn`]) and suspend at each prompt until the
//! foreground answers. A [`CancellationToken`](tokio_util::sync::CancellationToken)
//! is threaded through the whole run.

pub mod collaborators;
pub mod config;
pub mod foreground;
pub mod model;
pub mod orchestrator;
pub mod resolver;
pub mod version_gate;


pub use collaborators::{
    ApplyStatus, Candidate, Confirmation, DESCRIPTION_PROPERTY, Installer, MINIMUM_RUNTIME_PROPERTY,
    ProcessLifecycle, ProvisioningStatus, ResolveReport, Severity, StatusCode,
};
pub use config::UpdateConfig;
pub use foreground::{Foreground, ForegroundConfirmation, PromptHandler, PromptRequest};
pub use model::{
    NewVersionInfo, OrchestratorState, ResolutionOutcome, RestartChoice, RunOutcome,
    UNKNOWN_VERSION, UpdatePrompt, UpdateProgress,
};
pub use orchestrator::{UpdateOrchestrator, UpdateTask};
pub use resolver::{Resolution, UpdateResolver, parse_repository_uri};
pub use version_gate::{RuntimeVersion, VersionGate, requires_newer_runtime};
