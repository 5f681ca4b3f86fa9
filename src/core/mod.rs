//! Core types shared across updraft.
//!
//! ## Error Management
//!
//! - [`UpdateError`] enumerates the failure modes of update runs, configuration
//!   and the bundled provider
//! - [`ErrorContext`] wraps an error with a suggestion and details for CLI users
//! - [`user_friendly_error`] turns any [`anyhow::Error`] into an [`ErrorContext`]
//!
//! Cancellation, a declined update and a withheld restart are not errors. They
//! are reported as [`RunOutcome`](crate::upgrade::RunOutcome) values.

pub mod error;

pub use error::{ErrorContext, UpdateError, user_friendly_error};
