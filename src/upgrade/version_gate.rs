//! Runtime version gating.
//!
//! An update may declare the minimum runtime it needs (for example a newer
//! platform runtime than the one the application currently runs on). The gate
//! compares that requirement with the current runtime so the confirmation prompt
//! can warn the user before they install something that will not start.
//!
//! # Comparison Semantics
//!
//! Only the text before the **second** `.` is significant, and it is compared as
//! a decimal number:
//!
//! | Input      | Parsed value |
//! |------------|--------------|
//! | `"17.0.2"` | `17.0`       |
//! | `"17.0.9"` | `17.0`       |
//! | `"21.1"`   | `21.1`       |
//! | `"21"`     | `21.0`       |
//!
//! Patch-level differences therefore never trigger the gate. Because the
//! significant part is read as a decimal, `"17.10"` compares *below* `"17.9"`
//! (17.1 < 17.9). Both behaviors are deliberate policy and must be confirmed with
//! the release owners before they are changed.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use tracing::{debug, warn};

use crate::core::UpdateError;

/// A runtime version reduced to its significant `major.minor` decimal value.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct RuntimeVersion(f64);

impl RuntimeVersion {
    /// Parse a runtime version string.
    ///
    /// Surrounding whitespace is ignored. The significant prefix (everything
    /// before the second `.`, or the whole string when there is none) must be
    /// one or more digits optionally followed by `.` and more digits.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::RuntimeVersionParse`] when the significant prefix is
    /// empty or not a plain decimal number.
    pub fn parse(version: &str) -> Result<Self, UpdateError> {
        let prefix = significant_prefix(version);

        let (integral, fractional) = match prefix.split_once('.') {
            Some((integral, fractional)) => (integral, fractional),
            None => (prefix, ""),
        };

        let is_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
        if integral.is_empty() || !is_digits(integral) || !is_digits(fractional) {
            return Err(UpdateError::RuntimeVersionParse {
                version: version.to_string(),
            });
        }

        prefix.parse::<f64>().map(Self).map_err(|_| UpdateError::RuntimeVersionParse {
            version: version.to_string(),
        })
    }

    /// The decimal value used for comparison.
    #[must_use]
    pub const fn value(self) -> f64 {
        self.0
    }
}

impl FromStr for RuntimeVersion {
    type Err = UpdateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for RuntimeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

/// Return the part of `version` that takes part in comparisons.
///
/// This is the trimmed input up to, but not including, its second `.`.
#[must_use]
pub fn significant_prefix(version: &str) -> &str {
    let trimmed = version.trim();
    let mut dots = 0;
    for (idx, ch) in trimmed.char_indices() {
        if ch == '.' {
            dots += 1;
            if dots == 2 {
                return &trimmed[..idx];
            }
        }
    }
    trimmed
}

/// Compare two runtime versions by their significant value.
///
/// # Errors
///
/// Returns an error if either version cannot be parsed.
pub fn compare(a: &str, b: &str) -> Result<Ordering, UpdateError> {
    let a = RuntimeVersion::parse(a)?;
    let b = RuntimeVersion::parse(b)?;
    // Parsed values are finite, so partial_cmp always succeeds
    Ok(a.partial_cmp(&b).unwrap_or(Ordering::Equal))
}

/// Strict form of [`requires_newer_runtime`]: parse failures are returned.
///
/// # Errors
///
/// Returns [`UpdateError::RuntimeVersionParse`] for an unparsable current or
/// required version.
pub fn try_requires_newer_runtime(current: &str, required: Option<&str>) -> Result<bool, UpdateError> {
    let Some(required) = required else {
        return Ok(false);
    };

    let current = RuntimeVersion::parse(current)?;
    let required = RuntimeVersion::parse(required)?;
    Ok(required > current)
}

/// Whether an update requiring `required` needs a newer runtime than `current`.
///
/// Returns `false` when no requirement is declared. Unparsable versions are
/// logged and treated as "gate not triggered" so malformed metadata never blocks
/// an update.
#[must_use]
pub fn requires_newer_runtime(current: &str, required: Option<&str>) -> bool {
    match try_requires_newer_runtime(current, required) {
        Ok(triggered) => triggered,
        Err(e) => {
            warn!("Ignoring runtime requirement: {e} (current runtime {current})");
            false
        }
    }
}

/// Runtime gate bound to the runtime the application is currently running on.
#[derive(Debug, Clone)]
pub struct VersionGate {
    current_runtime: String,
}

impl VersionGate {
    /// Create a gate for the given current runtime version.
    pub fn new(current_runtime: impl Into<String>) -> Self {
        Self {
            current_runtime: current_runtime.into(),
        }
    }

    /// The runtime version this gate compares against.
    #[must_use]
    pub fn current_runtime(&self) -> &str {
        &self.current_runtime
    }

    /// See [`requires_newer_runtime`].
    #[must_use]
    pub fn requires_newer_runtime(&self, required: Option<&str>) -> bool {
        let triggered = requires_newer_runtime(&self.current_runtime, required);
        debug!(
            "Runtime gate: current={} required={:?} triggered={}",
            self.current_runtime, required, triggered
        );
        triggered
    }
}
