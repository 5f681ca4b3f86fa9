//! updraft: self-update orchestration for desktop applications.
//!
//! The crate checks an update repository for a newer release, gates it on the
//! runtime version, asks the user to confirm, installs it and coordinates the
//! restart.
//!
//! # Modules
//!
//! - [`upgrade`] - the update run state machine and its collaborator interfaces
//! - [`provider`] - a manifest-based [`Installer`](upgrade::Installer)
//! - [`host`] - shell-command lifecycle hooks and terminal prompts
//! - [`config`] - the user-wide configuration file
//! - [`cli`] - the `updraft` command line
//! - [`core`] - errors and user-facing error reporting

pub mod cli;
pub mod config;
pub mod core;
pub mod host;
pub mod provider;
pub mod upgrade;
pub mod utils;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
