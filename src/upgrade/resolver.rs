//! Interpretation of installer resolve results.
//!
//! [`UpdateResolver`] calls [`Installer::resolve`] and turns the raw
//! [`ResolveReport`] (status severity, status code, candidate list) into a
//! [`ResolutionOutcome`]. The mapping fails closed: any status it does not
//! recognize becomes [`ResolutionOutcome::Failed`].
//!
//! | Status                               | Outcome                        |
//! |--------------------------------------|--------------------------------|
//! | code `NothingToUpdate`               | `NoUpdateAvailable`            |
//! | severity `Cancel`                    | `Cancelled`                    |
//! | severity `Error`                     | `Failed(message)`              |
//! | code `Unrecognized`                  | `Failed(generic diagnostic)`   |
//! | resolved, candidates non-empty       | `UpdateFound(first)`           |
//! | resolved, no candidates              | `UpdateFound(unknown version)` |

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use crate::core::UpdateError;
use crate::upgrade::collaborators::{
    Candidate, DESCRIPTION_PROPERTY, Installer, MINIMUM_RUNTIME_PROPERTY, ResolveReport, Severity,
    StatusCode,
};
use crate::upgrade::model::{NewVersionInfo, ResolutionOutcome};

/// Outcome of a resolve call together with the installer's resolution context.
///
/// `operation` is only kept for [`ResolutionOutcome::UpdateFound`].
#[derive(Debug)]
pub struct Resolution<O> {
    pub outcome: ResolutionOutcome,
    pub operation: Option<O>,
}

/// Resolves a repository through an [`Installer`].
pub struct UpdateResolver<I> {
    installer: Arc<I>,
}

impl<I> Clone for UpdateResolver<I> {
    fn clone(&self) -> Self {
        Self {
            installer: Arc::clone(&self.installer),
        }
    }
}

impl<I: Installer> UpdateResolver<I> {
    pub fn new(installer: Arc<I>) -> Self {
        Self {
            installer,
        }
    }

    /// Resolve `repository` and interpret the installer's answer.
    ///
    /// Every call goes back to the repository; nothing is cached between calls.
    pub async fn resolve(
        &self,
        repository: &Url,
        cancel: &CancellationToken,
    ) -> Resolution<I::Operation> {
        debug!("Resolving updates from {}", repository);

        if cancel.is_cancelled() {
            return Resolution {
                outcome: ResolutionOutcome::Cancelled,
                operation: None,
            };
        }

        let report = self.installer.resolve(repository, cancel).await;
        interpret(report)
    }
}

/// Map a raw [`ResolveReport`] to a [`Resolution`].
///
/// Pure: the same report always yields the same outcome.
pub fn interpret<O>(report: ResolveReport<O>) -> Resolution<O> {
    let ResolveReport {
        status,
        candidates,
        operation,
    } = report;

    let failed = |diagnostic: String| Resolution {
        outcome: ResolutionOutcome::Failed(diagnostic),
        operation: None,
    };

    if status.code == StatusCode::NothingToUpdate {
        return Resolution {
            outcome: ResolutionOutcome::NoUpdateAvailable,
            operation: None,
        };
    }

    match status.severity {
        Severity::Cancel => {
            return Resolution {
                outcome: ResolutionOutcome::Cancelled,
                operation: None,
            };
        }
        Severity::Error => {
            let diagnostic = if status.message.trim().is_empty() {
                "The update repository reported an unspecified error".to_string()
            } else {
                status.message
            };
            return failed(diagnostic);
        }
        Severity::Warning => warn!("Update resolution reported a warning: {}", status.message),
        Severity::Ok | Severity::Info => {}
    }

    if let StatusCode::Unrecognized(code) = status.code {
        return failed(format!("Unrecognized resolution status {code}: {}", status.message));
    }

    // An installer may resolve an operation without describing it
    let info = candidates
        .into_iter()
        .next()
        .map_or_else(|| NewVersionInfo::new(None, None, None), |candidate| version_info(&candidate));
    Resolution {
        outcome: ResolutionOutcome::UpdateFound(info),
        operation,
    }
}

/// Extract the prompt metadata from a candidate. Missing properties are normal.
fn version_info(candidate: &Candidate) -> NewVersionInfo {
    NewVersionInfo::new(
        candidate.version.clone(),
        candidate.property(DESCRIPTION_PROPERTY).map(str::to_string),
        candidate.property(MINIMUM_RUNTIME_PROPERTY).map(str::to_string),
    )
}

/// Validate the configured update site.
///
/// # Errors
///
/// Returns [`UpdateError::InvalidRepositoryUri`] for empty or unparsable input.
pub fn parse_repository_uri(text: &str) -> Result<Url, UpdateError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(UpdateError::InvalidRepositoryUri {
            uri: text.to_string(),
            reason: "no update site configured".to_string(),
        });
    }

    Url::parse(trimmed).map_err(|e| UpdateError::InvalidRepositoryUri {
        uri: text.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upgrade::collaborators::ProvisioningStatus;
    use crate::upgrade::model::UNKNOWN_VERSION;

    fn report(status: ProvisioningStatus, candidates: Vec<Candidate>) -> ResolveReport<u32> {
        let operation = (!candidates.is_empty()).then_some(7);
        ResolveReport {
            status,
            candidates,
            operation,
        }
    }

    #[test]
    fn test_nothing_to_update() {
        let resolution = interpret(report(ProvisioningStatus::nothing_to_update(), vec![]));
        assert_eq!(resolution.outcome, ResolutionOutcome::NoUpdateAvailable);
        assert!(resolution.operation.is_none());
    }

    #[test]
    fn test_cancelled() {
        let resolution = interpret(report(ProvisioningStatus::cancelled(), vec![]));
        assert_eq!(resolution.outcome, ResolutionOutcome::Cancelled);
    }

    #[test]
    fn test_error_carries_diagnostic() {
        let resolution = interpret(report(ProvisioningStatus::error("connection refused"), vec![]));
        assert_eq!(resolution.outcome, ResolutionOutcome::Failed("connection refused".to_string()));
    }

    #[test]
    fn test_error_without_message() {
        let resolution = interpret(report(ProvisioningStatus::error(""), vec![]));
        match resolution.outcome {
            ResolutionOutcome::Failed(diagnostic) => assert!(diagnostic.contains("unspecified")),
            other => panic!("Expected Failed, got {other:?}"),
        }
    }

    #[test]
    fn test_unrecognized_status_fails_closed() {
        let status = ProvisioningStatus {
            severity: Severity::Ok,
            code: StatusCode::Unrecognized(10_000),
            message: "odd".to_string(),
        };
        let resolution = interpret(report(status, vec![Candidate::new("app", Some("2.0"))]));
        match resolution.outcome {
            ResolutionOutcome::Failed(diagnostic) => assert!(diagnostic.contains("10000")),
            other => panic!("Expected Failed, got {other:?}"),
        }
        assert!(resolution.operation.is_none());
    }

    #[test]
    fn test_resolved_without_candidates_offers_unknown_version() {
        let resolution = interpret(ResolveReport {
            status: ProvisioningStatus::resolved(),
            candidates: vec![],
            operation: Some(1_u32),
        });
        match resolution.outcome {
            ResolutionOutcome::UpdateFound(info) => {
                assert_eq!(info.version(), UNKNOWN_VERSION);
                assert_eq!(info.description(), None);
                assert_eq!(info.minimum_runtime_required(), None);
            }
            other => panic!("Expected UpdateFound, got {other:?}"),
        }
        assert_eq!(resolution.operation, Some(1));
    }

    #[test]
    fn test_first_candidate_wins() {
        let candidates = vec![
            Candidate::new("app", Some("3.0"))
                .with_property(DESCRIPTION_PROPERTY, "newest")
                .with_property(MINIMUM_RUNTIME_PROPERTY, "21.0"),
            Candidate::new("app", Some("4.0")),
        ];
        let resolution = interpret(report(ProvisioningStatus::resolved(), candidates));

        match resolution.outcome {
            ResolutionOutcome::UpdateFound(info) => {
                assert_eq!(info.version(), "3.0");
                assert_eq!(info.description(), Some("newest"));
                assert_eq!(info.minimum_runtime_required(), Some("21.0"));
            }
            other => panic!("Expected UpdateFound, got {other:?}"),
        }
        assert_eq!(resolution.operation, Some(7));
    }

    #[test]
    fn test_missing_version_uses_placeholder() {
        let resolution =
            interpret(report(ProvisioningStatus::resolved(), vec![Candidate::new("app", None)]));
        match resolution.outcome {
            ResolutionOutcome::UpdateFound(info) => {
                assert_eq!(info.version(), UNKNOWN_VERSION);
                assert_eq!(info.description(), None);
            }
            other => panic!("Expected UpdateFound, got {other:?}"),
        }
    }

    #[test]
    fn test_warning_still_offers_update() {
        let status = ProvisioningStatus {
            severity: Severity::Warning,
            code: StatusCode::Resolved,
            message: "mirror slow".to_string(),
        };
        let resolution = interpret(report(status, vec![Candidate::new("app", Some("2.0"))]));
        assert!(matches!(resolution.outcome, ResolutionOutcome::UpdateFound(_)));
    }

    #[test]
    fn test_interpret_is_deterministic() {
        let make = || {
            report(
                ProvisioningStatus::resolved(),
                vec![Candidate::new("app", Some("25.1")).with_property(DESCRIPTION_PROPERTY, "x")],
            )
        };
        let first = interpret(make());
        let second = interpret(make());
        assert_eq!(first.outcome, second.outcome);
        assert_eq!(first.operation, second.operation);
    }

    #[test]
    fn test_parse_repository_uri() {
        assert!(parse_repository_uri("https://example.com/updates/").is_ok());
        assert!(parse_repository_uri("file:///tmp/site").is_ok());
        assert!(matches!(
            parse_repository_uri(""),
            Err(UpdateError::InvalidRepositoryUri { .. })
        ));
        assert!(matches!(
            parse_repository_uri("not a uri"),
            Err(UpdateError::InvalidRepositoryUri { .. })
        ));
    }
}
