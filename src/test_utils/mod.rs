//! Test utilities shared by unit and integration tests.
//!
//! - [`mocks`]: scripted [`Installer`](crate::upgrade::Installer),
//!   [`Confirmation`](crate::upgrade::Confirmation) and
//!   [`ProcessLifecycle`](crate::upgrade::ProcessLifecycle) implementations that
//!   record their calls
//! - [`fixtures`]: manifest repositories on disk for the bundled provider
//!
//! Available to integration tests through the `test-utils` feature.

pub mod fixtures;
pub mod mocks;

pub use fixtures::ManifestRepoFixture;
pub use mocks::{MockConfirmation, MockLifecycle, ScriptedInstaller};

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

static INIT_LOGGING: Once = Once::new();

/// Initialize tracing for tests once per process.
///
/// Uses `level` when given, otherwise `RUST_LOG`; with neither, logging stays off.
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}
