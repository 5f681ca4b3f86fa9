//! Integration test suite for updraft
//!
//! End-to-end tests against on-disk update repositories (`file://` URIs), so
//! they need no network access.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **cli**: the `updraft` binary with scripted stdin
//! - **manifest_installer**: resolve and apply against manifest repositories
//! - **orchestrator**: full update runs with the bundled installer

mod cli;
mod manifest_installer;
mod orchestrator;
