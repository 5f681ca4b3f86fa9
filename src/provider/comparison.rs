//! Lenient release version parsing for manifest entries.
//!
//! Release versions in update manifests are often shorter than full semantic
//! versions. Before handing them to [`semver`] the common prefixes `v`,
//! `version-` and `release-` are stripped and missing minor/patch components are
//! padded with zeros:
//!
//! - `25.1` → `25.1.0`
//! - `v3` → `3.0.0`
//! - `release-2.0-beta.1` → `2.0.0-beta.1`

use semver::Version;

/// Parse a release version leniently.
///
/// # Errors
///
/// Returns the [`semver::Error`] for input that is not a version even after
/// normalization.
pub fn parse_release_version(version: &str) -> Result<Version, semver::Error> {
    let trimmed = version.trim();
    let clean = if let Some(stripped) = trimmed.strip_prefix("version-") {
        stripped
    } else if let Some(stripped) = trimmed.strip_prefix("release-") {
        stripped
    } else if let Some(stripped) = trimmed.strip_prefix('v') {
        stripped
    } else {
        trimmed
    };

    let split = clean.find(['-', '+']).unwrap_or(clean.len());
    let (core, suffix) = clean.split_at(split);
    let padding = match core.matches('.').count() {
        0 => ".0.0",
        1 => ".0",
        _ => "",
    };

    Version::parse(&format!("{core}{padding}{suffix}"))
}
