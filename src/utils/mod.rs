//! Helpers shared by the CLI commands and host hooks.

pub mod platform;
pub mod progress;

pub use progress::Spinner;
