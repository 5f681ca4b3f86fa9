//! Error handling for updraft
//!
//! This module provides the error types and user-friendly error reporting used by
//! the update orchestrator and its bundled collaborators. The error system follows
//! two principles:
//! 1. **Strongly-typed errors** so callers can match on the failure that occurred
//! 2. **User-friendly messages** with actionable suggestions for CLI users
//!
//! # Architecture
//!
//! - [`UpdateError`] - Enumerated error types for every failure an update run can surface
//! - [`ErrorContext`] - Wrapper that adds user-friendly details and suggestions
//!
//! # What Is Not An Error
//!
//! Cancellation (of the check or of the apply step), a declined confirmation and a
//! withheld restart after a failed save are *outcomes* of a run, reported through
//! [`RunOutcome`](crate::upgrade::RunOutcome). Only configuration, resolution and
//! installation failures travel through [`UpdateError`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use updraft::core::{UpdateError, user_friendly_error};
//!
//! let error = UpdateError::ResolutionFailed {
//!     diagnostic: "connection refused".to_string(),
//! };
//! let context = user_friendly_error(anyhow::Error::from(error));
//! context.display();
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for update runs.
///
/// # Error Categories
///
/// ## Configuration
/// - [`Configuration`] - Invalid or unreadable configuration
/// - [`InvalidRepositoryUri`] - The update site is not a valid URI
///
/// ## Update Run
/// - [`ResolutionFailed`] - The repository could not be resolved
/// - [`InstallFailed`] - Applying the resolved update failed
/// - [`RunInProgress`] - Another run is already active on this orchestrator
/// - [`ForegroundUnavailable`] - The interactive surface went away mid-run
///
/// ## Repository Provider
/// - [`ManifestParse`] - The repository manifest is malformed
/// - [`ChecksumMismatch`] - A downloaded artifact failed verification
/// - [`NetworkError`] - Transport failure while talking to the repository
///
/// [`Configuration`]: UpdateError::Configuration
/// [`InvalidRepositoryUri`]: UpdateError::InvalidRepositoryUri
/// [`ResolutionFailed`]: UpdateError::ResolutionFailed
/// [`InstallFailed`]: UpdateError::InstallFailed
/// [`RunInProgress`]: UpdateError::RunInProgress
/// [`ForegroundUnavailable`]: UpdateError::ForegroundUnavailable
/// [`ManifestParse`]: UpdateError::ManifestParse
/// [`ChecksumMismatch`]: UpdateError::ChecksumMismatch
/// [`NetworkError`]: UpdateError::NetworkError
#[derive(Error, Debug)]
pub enum UpdateError {
    /// Configuration error
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error
        message: String,
    },

    /// The configured update site is not a valid URI.
    ///
    /// Raised before any network activity takes place.
    #[error("Invalid update site URI '{uri}': {reason}")]
    InvalidRepositoryUri {
        /// The rejected URI text
        uri: String,
        /// Parser diagnostic
        reason: String,
    },

    /// Resolving the update repository failed
    ///
    /// Covers network failures, malformed repositories and incompatible metadata as
    /// reported by the installer collaborator.
    #[error("Checking for updates failed: {diagnostic}")]
    ResolutionFailed {
        /// Diagnostic text reported by the installer
        diagnostic: String,
    },

    /// Applying the update failed. The update is not considered installed.
    #[error("Installing the update failed: {diagnostic}")]
    InstallFailed {
        /// Diagnostic text reported by the installer
        diagnostic: String,
    },

    /// An update run is already in flight
    #[error("An update check is already running")]
    RunInProgress,

    /// A runtime version string could not be interpreted
    #[error("Invalid runtime version '{version}'")]
    RuntimeVersionParse {
        /// The rejected version string
        version: String,
    },

    /// The foreground prompt handler is no longer listening
    #[error("The interactive prompt handler is not available")]
    ForegroundUnavailable,

    /// The repository manifest could not be parsed
    #[error("Invalid update manifest at {location}: {reason}")]
    ManifestParse {
        /// Where the manifest was read from
        location: String,
        /// Parser diagnostic
        reason: String,
    },

    /// Downloaded artifact does not match its published checksum
    #[error("Checksum mismatch for '{artifact}': expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Artifact file name
        artifact: String,
        /// Checksum published in the manifest
        expected: String,
        /// Checksum computed locally
        actual: String,
    },

    /// Network error
    #[error("Network error: {operation}")]
    NetworkError {
        /// The operation that failed
        operation: String,
        /// Transport diagnostic
        reason: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerError(#[from] toml::ser::Error),

    /// Anything else
    #[error("{message}")]
    Other {
        /// Error message
        message: String,
    },
}

impl Clone for UpdateError {
    fn clone(&self) -> Self {
        match self {
            Self::Configuration {
                message,
            } => Self::Configuration {
                message: message.clone(),
            },
            Self::InvalidRepositoryUri {
                uri,
                reason,
            } => Self::InvalidRepositoryUri {
                uri: uri.clone(),
                reason: reason.clone(),
            },
            Self::ResolutionFailed {
                diagnostic,
            } => Self::ResolutionFailed {
                diagnostic: diagnostic.clone(),
            },
            Self::InstallFailed {
                diagnostic,
            } => Self::InstallFailed {
                diagnostic: diagnostic.clone(),
            },
            Self::RunInProgress => Self::RunInProgress,
            Self::RuntimeVersionParse {
                version,
            } => Self::RuntimeVersionParse {
                version: version.clone(),
            },
            Self::ForegroundUnavailable => Self::ForegroundUnavailable,
            Self::ManifestParse {
                location,
                reason,
            } => Self::ManifestParse {
                location: location.clone(),
                reason: reason.clone(),
            },
            Self::ChecksumMismatch {
                artifact,
                expected,
                actual,
            } => Self::ChecksumMismatch {
                artifact: artifact.clone(),
                expected: expected.clone(),
                actual: actual.clone(),
            },
            Self::NetworkError {
                operation,
                reason,
            } => Self::NetworkError {
                operation: operation.clone(),
                reason: reason.clone(),
            },
            // io::Error and the toml errors are not Clone; keep their message
            Self::IoError(e) => Self::Other {
                message: format!("IO error: {e}"),
            },
            Self::TomlError(e) => Self::Other {
                message: format!("TOML parsing error: {e}"),
            },
            Self::TomlSerError(e) => Self::Other {
                message: format!("TOML serialization error: {e}"),
            },
            Self::Other {
                message,
            } => Self::Other {
                message: message.clone(),
            },
        }
    }
}

/// Error context wrapper with a user-facing suggestion and details.
///
/// When displayed, errors show:
/// 1. **Error**: The main error message in red
/// 2. **Details**: Additional context in yellow (optional)
/// 3. **Suggestion**: Actionable steps in green (optional)
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: UpdateError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no suggestion or details.
    #[must_use]
    pub const fn new(error: UpdateError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Display the error context to stderr with terminal colors
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error to a user-friendly [`ErrorContext`] with actionable suggestions
///
/// Recognizes [`UpdateError`] anywhere in the error chain, [`std::io::Error`] and
/// [`toml::de::Error`]; everything else is reported with its full cause chain.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    for cause in error.chain() {
        if let Some(update_error) = cause.downcast_ref::<UpdateError>() {
            return create_error_context(update_error.clone());
        }
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => {
                return ErrorContext::new(UpdateError::Other {
                    message: format!("Permission denied: {io_error}"),
                })
                .with_suggestion("Check ownership of the updraft configuration and staging directories")
                .with_details("updraft needs write access to its configuration file and staging directory");
            }
            std::io::ErrorKind::NotFound => {
                return ErrorContext::new(UpdateError::Other {
                    message: format!("File not found: {io_error}"),
                })
                .with_suggestion("Check that the file or directory exists and the path is correct");
            }
            _ => {}
        }
    }

    if let Some(toml_error) = error.downcast_ref::<toml::de::Error>() {
        return create_error_context(UpdateError::Configuration {
            message: toml_error.to_string(),
        });
    }

    let mut message = error.to_string();
    let chain: Vec<String> =
        error.chain().skip(1).map(std::string::ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(UpdateError::Other {
        message,
    })
}

/// Map each [`UpdateError`] variant to an [`ErrorContext`] with tailored suggestions.
fn create_error_context(error: UpdateError) -> ErrorContext {
    let (suggestion, details): (Option<String>, Option<String>) = match &error {
        UpdateError::Configuration { .. } => (
            Some("Inspect the configuration with 'updraft config show' and fix the reported value".to_string()),
            Some("The configuration lives in ~/.updraft/config.toml unless --config or UPDRAFT_CONFIG_PATH points elsewhere".to_string()),
        ),
        UpdateError::InvalidRepositoryUri { .. } => (
            Some("Set a valid update site, e.g. 'updraft config set update.update_site https://example.com/updates/'".to_string()),
            Some("The update site must be an absolute file://, http:// or https:// URI".to_string()),
        ),
        UpdateError::ResolutionFailed { diagnostic } => {
            let suggestion = if diagnostic.to_lowercase().contains("manifest") {
                "The update site answered but its manifest is not usable. Contact the publisher of the update site"
            } else {
                "Check your internet connection and that the update site is reachable, then run 'updraft check' again"
            };
            (
                Some(suggestion.to_string()),
                Some("No changes were made to the installed application".to_string()),
            )
        }
        UpdateError::InstallFailed { .. } => (
            Some("Run 'updraft check' again. If the problem persists, download the release manually".to_string()),
            Some("The update was not applied and no restart is pending".to_string()),
        ),
        UpdateError::RunInProgress => {
            (Some("Wait for the running update check to finish".to_string()), None)
        }
        UpdateError::RuntimeVersionParse { version } => (
            Some(format!("Use a dotted numeric runtime version such as '17.0' instead of '{version}'")),
            None,
        ),
        UpdateError::ForegroundUnavailable => {
            (None, Some("The prompt handler stopped before the update run finished".to_string()))
        }
        UpdateError::ManifestParse { location, .. } => (
            Some(format!("Verify that {location} is a valid update manifest")),
            Some("Update manifests are JSON documents with a top-level \"updates\" array".to_string()),
        ),
        UpdateError::ChecksumMismatch { .. } => (
            Some("Retry the update. A repeated mismatch means the published artifact is corrupt".to_string()),
            Some("The downloaded artifact was discarded".to_string()),
        ),
        UpdateError::NetworkError { reason, .. } => (
            Some("Check your internet connection and proxy settings".to_string()),
            Some(reason.clone()),
        ),
        _ => (None, None),
    };

    ErrorContext {
        error,
        suggestion,
        details,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = UpdateError::ResolutionFailed {
            diagnostic: "connection refused".to_string(),
        };
        assert_eq!(error.to_string(), "Checking for updates failed: connection refused");

        let error = UpdateError::InvalidRepositoryUri {
            uri: "not a uri".to_string(),
            reason: "relative URL without a base".to_string(),
        };
        assert!(error.to_string().contains("not a uri"));
    }

    #[test]
    fn test_error_context_display() {
        let ctx = ErrorContext::new(UpdateError::RunInProgress)
            .with_suggestion("wait")
            .with_details("busy");
        let display = format!("{ctx}");
        assert!(display.contains("already running"));
        assert!(display.contains("Details: busy"));
        assert!(display.contains("Suggestion: wait"));
    }

    #[test]
    fn test_user_friendly_error_update_error() {
        let error = anyhow::Error::from(UpdateError::InstallFailed {
            diagnostic: "disk full".to_string(),
        });
        let ctx = user_friendly_error(error);
        assert!(matches!(ctx.error, UpdateError::InstallFailed { .. }));
        assert!(ctx.suggestion.is_some());
        assert!(ctx.details.unwrap().contains("not applied"));
    }

    #[test]
    fn test_user_friendly_error_finds_error_in_chain() {
        let error = anyhow::Error::from(UpdateError::Configuration {
            message: "bad value".to_string(),
        })
        .context("Failed to load configuration");
        let ctx = user_friendly_error(error);
        assert!(matches!(ctx.error, UpdateError::Configuration { .. }));
    }

    #[test]
    fn test_user_friendly_error_generic_chain() {
        let error = anyhow::anyhow!("root cause").context("outer");
        let ctx = user_friendly_error(error);
        match ctx.error {
            UpdateError::Other {
                message,
            } => {
                assert!(message.contains("outer"));
                assert!(message.contains("Caused by"));
                assert!(message.contains("root cause"));
            }
            _ => panic!("Expected Other error"),
        }
    }

    #[test]
    fn test_resolution_failed_manifest_suggestion() {
        let ctx = create_error_context(UpdateError::ResolutionFailed {
            diagnostic: "Invalid update manifest at file:///tmp".to_string(),
        });
        assert!(ctx.suggestion.unwrap().contains("manifest"));
    }

    #[test]
    fn test_clone_io_error_keeps_message() {
        let error = UpdateError::from(std::io::Error::other("boom"));
        match error.clone() {
            UpdateError::Other {
                message,
            } => assert!(message.contains("boom")),
            _ => panic!("Expected Other error"),
        }
    }

    #[test]
    fn test_from_toml_error() {
        let result: Result<toml::Value, _> = toml::from_str("invalid = toml {");
        if let Err(e) = result {
            assert!(matches!(UpdateError::from(e), UpdateError::TomlError(_)));
        }
    }

    #[test]
    fn test_from_toml_ser_error() {
        // A bare integer is not a TOML document
        if let Err(e) = toml::to_string(&42_u32) {
            let error = UpdateError::from(e);
            assert!(matches!(error, UpdateError::TomlSerError(_)));
            assert!(error.to_string().starts_with("TOML serialization error"));
        }
    }
}
