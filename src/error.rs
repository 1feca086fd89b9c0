//! Error types for broker operations.

use thiserror::Error;

/// Result type alias using [`BrokerError`].
pub type Result<T> = std::result::Result<T, BrokerError>;

/// Errors that can occur while brokering credentials.
///
/// All errors implement `std::error::Error` and can be chained with `source()`.
///
/// Only [`BrokerError::AuthorizationPending`] is ever retried (it drives the
/// device-grant poll loop and is never shown to the user). Everything else
/// propagates to the top level and terminates the process.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// The user has not finished the browser login yet.
    ///
    /// Expected and transient: the poll loop sleeps and retries on it.
    #[error("authorization pending")]
    AuthorizationPending,

    /// The identity provider rejected an operation.
    ///
    /// Covers denied logins, expired device codes, bad client registrations
    /// and the like. Fatal to the current invocation.
    #[error("{operation}: {message}")]
    Remote {
        /// Remote operation name (register-client, create-token, etc.)
        operation: &'static str,
        /// Provider-supplied failure message
        message: String,
    },

    /// A cached access token was rejected with an unauthorized status.
    ///
    /// Distinct from [`BrokerError::Remote`] so callers can discard the
    /// cached session and retry the whole login once.
    #[error("access token no longer authorized: {0}")]
    Unauthorized(String),

    /// Another process is already running a device-authorization flow.
    #[error("another authorization flow is already running - wait up to a minute or retry with --force")]
    FlowInProgress,

    /// Profile name cannot be used as a credentials-file section.
    #[error("invalid profile name: {0}")]
    InvalidProfileName(String),

    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other error (catch-all).
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BrokerError {
    /// Creates a fatal remote-rejection error for the given operation.
    pub fn remote(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Remote {
            operation,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_remote_error_display() {
        let err = BrokerError::remote("create-token", "AccessDeniedException");
        assert_eq!(err.to_string(), "create-token: AccessDeniedException");
    }

    #[test]
    fn test_flow_in_progress_mentions_force() {
        let err = BrokerError::FlowInProgress;
        assert!(err.to_string().contains("--force"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: BrokerError = io.into();
        assert!(matches!(err, BrokerError::Io(_)));
    }

    #[test]
    fn test_error_source_chain() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: BrokerError = io.into();
        assert!(err.source().is_some());
    }
}
