//! Error types for LoopShare core operations.
//!
//! The top-level [`Error`] wraps one typed error per collaborator
//! (persistence, billing) plus a few ambient variants. Invalid user input
//! (blank names, unparseable video URLs) is never an error: those mutations
//! are silent no-ops.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by a [`PlaylistRepository`](crate::repository::PlaylistRepository).
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The HTTP request could not be sent or completed.
    #[error("Request to {url} failed: {reason}")]
    Request {
        /// Requested URL.
        url: String,
        /// Underlying failure.
        reason: String,
    },

    /// The backend answered with a non-success status.
    #[error("Backend returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, as returned.
        body: String,
    },

    /// The backend response could not be decoded.
    #[error("Failed to decode backend response: {0}")]
    Decode(String),

    /// A row the operation depends on does not exist in the store.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of row ("playlist", "video").
        entity: &'static str,
        /// Identifier that was looked up.
        id: String,
    },

    /// Reading or writing the offline data file failed.
    #[error("Data file error at {path}: {reason}")]
    DataFile {
        /// Path of the data file.
        path: PathBuf,
        /// Error message.
        reason: String,
    },
}

/// Errors raised by a [`BillingClient`](crate::billing::BillingClient).
#[derive(Debug, Error)]
pub enum BillingError {
    /// The HTTP request could not be sent or completed.
    #[error("Billing request to {function} failed: {reason}")]
    Request {
        /// Hosted function name.
        function: String,
        /// Underlying failure.
        reason: String,
    },

    /// The hosted function reported an error.
    #[error("Billing function {function} failed: {message}")]
    Remote {
        /// Hosted function name.
        function: String,
        /// Error message reported by the function.
        message: String,
    },

    /// The function response could not be decoded.
    #[error("Failed to decode billing response: {0}")]
    Decode(String),

    /// No signed-in user, so there is no token to authorize the call.
    #[error("Billing requires a signed-in user")]
    NotAuthenticated,
}

/// Errors that can occur in LoopShare core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Persistence collaborator failure.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// Billing collaborator failure.
    #[error(transparent)]
    Billing(#[from] BillingError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Coarse error category for front-end handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum ErrorKind {
    /// Network-level failure talking to a collaborator.
    Network,
    /// Collaborator rejected the request.
    Remote,
    /// A referenced row is missing.
    NotFound,
    /// Local configuration problem.
    Configuration,
    /// Local file or decoding problem.
    Storage,
    /// Caller is not signed in.
    Authentication,
}

impl Error {
    /// Category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Repository(RepositoryError::Request { .. })
            | Self::Billing(BillingError::Request { .. }) => ErrorKind::Network,
            Self::Repository(RepositoryError::Status { .. })
            | Self::Billing(BillingError::Remote { .. }) => ErrorKind::Remote,
            Self::Repository(RepositoryError::NotFound { .. }) => ErrorKind::NotFound,
            Self::Billing(BillingError::NotAuthenticated) => ErrorKind::Authentication,
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::Repository(RepositoryError::Decode(_) | RepositoryError::DataFile { .. })
            | Self::Billing(BillingError::Decode(_))
            | Self::Io(_)
            | Self::Serialization(_) => ErrorKind::Storage,
        }
    }

    /// Whether retrying the same call later could succeed.
    ///
    /// The store never retries on its own; this only informs the caller.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Repository(RepositoryError::Status { status, .. }) => *status >= 500,
            _ => matches!(self.kind(), ErrorKind::Network),
        }
    }

    /// Build a request failure for the persistence backend.
    pub fn request_failed(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::Repository(RepositoryError::Request {
            url: url.into(),
            reason: reason.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = Error::Repository(RepositoryError::NotFound {
            entity: "playlist",
            id: "playlist-1".to_string(),
        });
        assert_eq!(err.to_string(), "playlist not found: playlist-1");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_status_retryable_only_for_server_errors() {
        let server = Error::Repository(RepositoryError::Status {
            status: 503,
            body: "unavailable".to_string(),
        });
        let client = Error::Repository(RepositoryError::Status {
            status: 403,
            body: "denied".to_string(),
        });
        assert!(server.is_retryable());
        assert!(!client.is_retryable());
    }

    #[test]
    fn test_request_failed_is_network() {
        let err = Error::request_failed("http://localhost/rest/v1/playlists", "timed out");
        assert_eq!(err.kind(), ErrorKind::Network);
        assert!(err.is_retryable());
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn test_billing_remote_display() {
        let err = Error::Billing(BillingError::Remote {
            function: "pause-subscription".to_string(),
            message: "No active subscription found for this user".to_string(),
        });
        assert!(err.to_string().contains("pause-subscription"));
        assert_eq!(err.kind(), ErrorKind::Remote);
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(err.kind(), ErrorKind::Storage);
    }
}
