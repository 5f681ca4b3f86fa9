//! Bundled update provider.
//!
//! [`ManifestInstaller`] implements the [`Installer`](crate::upgrade::Installer)
//! capability on top of a JSON manifest served from a local directory or an
//! HTTP(S) server. See [`manifest`] for the document format and [`staging`] for
//! how applied updates are recorded.

pub mod comparison;
pub mod installer;
pub mod manifest;
pub mod staging;
pub mod verification;

pub use installer::{ManifestInstaller, ManifestOperation};
pub use manifest::{Artifact, Fetcher, Manifest, ManifestEntry};
pub use staging::{PendingUpdate, StagingArea};
