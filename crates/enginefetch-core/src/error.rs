//! # Design
//!
//! - Separate per-candidate failures (recoverable, the chain advances) from fatal ones.
//! - Keep error messages constant; context lives in fields for logs and tests.
//! - Preserve IO sources for distribution failures.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Reasons a single candidate could not produce an artifact pair.
///
/// Every variant is recoverable: the acquirer logs it and moves on to the next candidate.
#[derive(Debug, Error)]
pub enum CandidateError {
    /// The git reference could not be turned into a hash and branch.
    #[error("reference could not be resolved")]
    RefResolutionFailed {
        /// Reference that failed to resolve.
        reference: String,
        /// Diagnostic captured from the lookup.
        reason: String,
    },
    /// The store refused the request; the build has most likely not finished yet.
    #[error("artifact not built yet")]
    NotYetBuilt {
        /// URL that returned 403.
        url: String,
    },
    /// The request never produced an HTTP status.
    #[error("artifact store unreachable")]
    Unreachable {
        /// URL that could not be fetched.
        url: String,
        /// Transport error message.
        message: String,
    },
    /// The store answered with a status other than 200 or 403.
    #[error("artifact store returned an unexpected status")]
    OtherHttpError {
        /// URL that was requested.
        url: String,
        /// Status code returned by the store.
        status: u16,
    },
}

impl CandidateError {
    /// Machine-readable classification used in structured logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::RefResolutionFailed { .. } => "ref_resolution_failed",
            Self::NotYetBuilt { .. } => "not_yet_built",
            Self::Unreachable { .. } => "unreachable",
            Self::OtherHttpError { .. } => "other_http_error",
        }
    }
}

/// Fatal acquisition outcomes surfaced to the caller.
#[derive(Debug, Error)]
pub enum AcquisitionFailure {
    /// The local build output has a script but neither payload variant.
    #[error("local build is missing its payload")]
    MalformedLocalBuild {
        /// Build output directory that was probed.
        dir: PathBuf,
    },
    /// Every candidate failed and no cached pair was available.
    #[error("no candidate produced an artifact")]
    ChainExhausted {
        /// Number of candidates that were attempted.
        attempts: usize,
    },
    /// Placing or verifying files in the destinations failed.
    #[error("failed to distribute artifacts")]
    Distribution {
        /// Operation that failed (`copy`, `write`, `remove`, `read`, `verify`).
        operation: &'static str,
        /// Path involved in the failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
}

impl AcquisitionFailure {
    pub(crate) fn distribution(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: io::Error,
    ) -> Self {
        Self::Distribution {
            operation,
            path: path.into(),
            source,
        }
    }
}

/// Errors raised while validating acquisition settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Field contained an invalid value.
    #[error("invalid acquisition setting")]
    InvalidField {
        /// Field that failed validation.
        field: &'static str,
        /// Static reason for the failure.
        reason: &'static str,
        /// Offending value when available.
        value: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::error::Error as _;

    #[test]
    fn candidate_error_kinds_are_distinct() {
        let errors = [
            CandidateError::RefResolutionFailed {
                reference: "HEAD~3".to_string(),
                reason: "shallow clone".to_string(),
            },
            CandidateError::NotYetBuilt {
                url: "u".to_string(),
            },
            CandidateError::Unreachable {
                url: "u".to_string(),
                message: "dns".to_string(),
            },
            CandidateError::OtherHttpError {
                url: "u".to_string(),
                status: 500,
            },
        ];
        let kinds: BTreeSet<_> = errors.iter().map(CandidateError::kind).collect();
        assert_eq!(kinds.len(), 4);
    }

    #[test]
    fn distribution_preserves_source() {
        let err = AcquisitionFailure::distribution(
            "copy",
            "public/libGD.js",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.to_string(), "failed to distribute artifacts");
        assert!(err.source().is_some());
    }
}
