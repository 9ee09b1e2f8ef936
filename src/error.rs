//! Error types for the gorc reconciliation engine.
//!
//! This module provides the error hierarchy for every stage of a run:
//! loading the desired-state document, validating it, talking to the
//! GitHub API and reconciling individual entity kinds.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for gorc.
#[derive(Debug, Error)]
pub enum GorcError {
    /// Desired-state document errors.
    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    /// The desired-state document failed schema validation.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// GitHub API errors.
    #[error("GitHub API error: {0}")]
    GitHub(#[from] GitHubError),

    /// Reconciliation errors.
    #[error("Reconciliation error: {0}")]
    Reconcile(#[from] ReconcileError),

    /// The requested operation is not one of `init`, `validate`, `dry-run`, `apply`.
    #[error("Unknown operation: {name}")]
    UnknownOperation {
        /// The operation name that was requested.
        name: String,
    },

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Desired-state document errors.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// The document file was not found.
    #[error("Document not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The document could not be parsed.
    #[error("Failed to parse document: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// The document could not be serialized.
    #[error("Failed to serialize document: {message}")]
    SerializationError {
        /// Description of the serialization error.
        message: String,
    },

    /// A required environment variable is missing.
    #[error("Missing environment variable: {name}")]
    MissingEnvVar {
        /// Name of the missing variable.
        name: String,
    },
}

/// A single schema violation in the desired-state document.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Violation {
    /// Path of the offending value, e.g. `teams[2].privacy`.
    pub path: String,
    /// Description of the violation.
    pub message: String,
}

/// The desired-state document failed validation.
///
/// Carries every violated path, not only the first one.
#[derive(Debug, Clone, Error)]
pub struct ValidationError {
    /// All violations found in the document.
    pub violations: Vec<Violation>,
}

/// GitHub API errors.
#[derive(Debug, Error)]
pub enum GitHubError {
    /// Authentication or authorization failed.
    #[error("GitHub authentication failed: {message}")]
    AuthenticationFailed {
        /// Description of the auth failure.
        message: String,
    },

    /// The requested resource does not exist.
    #[error("GitHub resource not found: {resource}")]
    NotFound {
        /// The resource path that was requested.
        resource: String,
    },

    /// API request failed.
    #[error("GitHub API request failed: {status} - {message}")]
    ApiRequestFailed {
        /// HTTP status code.
        status: u16,
        /// Error message from API.
        message: String,
    },

    /// Rate limited.
    #[error("GitHub API rate limited, retry after {retry_after_secs} seconds")]
    RateLimited {
        /// Seconds to wait before retrying.
        retry_after_secs: u64,
    },

    /// Network error.
    #[error("Network error communicating with GitHub: {message}")]
    NetworkError {
        /// Description of the network error.
        message: String,
    },

    /// Invalid response from API.
    #[error("Invalid response from GitHub API: {message}")]
    InvalidResponse {
        /// Description of the response issue.
        message: String,
    },
}

/// Reconciliation errors.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Reconciliation failed for a whole entity kind.
    #[error("Failed to reconcile {kind}: {reason}")]
    KindFailed {
        /// Entity kind that failed.
        kind: String,
        /// Reason for failure.
        reason: String,
    },
}

/// Result type alias for gorc operations.
pub type Result<T> = std::result::Result<T, GorcError>;

impl GorcError {
    /// Returns true if this error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::GitHub(GitHubError::RateLimited { .. } | GitHubError::NetworkError { .. }) => true,
            Self::GitHub(GitHubError::ApiRequestFailed { status, .. }) => *status >= 500,
            _ => false,
        }
    }

    /// Returns the delay GitHub asked for before retrying, in seconds.
    #[must_use]
    pub const fn retry_delay_secs(&self) -> Option<u64> {
        match self {
            Self::GitHub(GitHubError::RateLimited { retry_after_secs }) => Some(*retry_after_secs),
            _ => None,
        }
    }

    /// Returns true if this error means the remote entity does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::GitHub(GitHubError::NotFound { .. }))
    }
}

impl ValidationError {
    /// Creates a validation error from a list of violations.
    #[must_use]
    pub const fn new(violations: Vec<Violation>) -> Self {
        Self { violations }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Document validation failed with {} violation(s)",
            self.violations.len()
        )?;
        for violation in &self.violations {
            write!(f, "\n  - {violation}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

impl DocumentError {
    /// Creates a parse error for a given source location.
    #[must_use]
    pub fn parse(message: impl Into<String>, location: Option<String>) -> Self {
        Self::ParseError {
            message: message.into(),
            location,
        }
    }

    /// Creates a serialization error with the given message.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::SerializationError {
            message: message.into(),
        }
    }
}

impl GitHubError {
    /// Creates an API request error.
    #[must_use]
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiRequestFailed {
            status,
            message: message.into(),
        }
    }

    /// Creates a network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::NetworkError {
            message: message.into(),
        }
    }

    /// Creates an invalid response error.
    #[must_use]
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_lists_every_path() {
        let err = ValidationError::new(vec![
            Violation {
                path: String::from("org"),
                message: String::from("is required"),
            },
            Violation {
                path: String::from("members[1].role"),
                message: String::from("must be one of: admin, member"),
            },
        ]);

        let rendered = err.to_string();
        assert!(rendered.contains("2 violation(s)"));
        assert!(rendered.contains("org: is required"));
        assert!(rendered.contains("members[1].role"));
    }

    #[test]
    fn test_retryable_errors() {
        assert!(GorcError::from(GitHubError::RateLimited { retry_after_secs: 3 }).is_retryable());
        assert!(GorcError::from(GitHubError::network("reset")).is_retryable());
        assert!(GorcError::from(GitHubError::api_error(502, "bad gateway")).is_retryable());
        assert!(!GorcError::from(GitHubError::api_error(422, "invalid")).is_retryable());
        assert!(
            !GorcError::from(GitHubError::AuthenticationFailed {
                message: String::from("bad token"),
            })
            .is_retryable()
        );
    }

    #[test]
    fn test_retry_delay_follows_rate_limit() {
        let err = GorcError::from(GitHubError::RateLimited { retry_after_secs: 42 });
        assert_eq!(err.retry_delay_secs(), Some(42));
        let failed = GorcError::from(GitHubError::api_error(502, "bad gateway"));
        assert_eq!(failed.retry_delay_secs(), None);
    }
}
