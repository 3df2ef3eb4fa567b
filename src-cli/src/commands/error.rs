//! Error handling utilities for commands.

use loopshare_core::{Error, ErrorKind};
use tracing::debug;

/// Structured error report, printed as JSON with `--json`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub message: String,
    /// Error category for programmatic handling.
    pub kind: ErrorKind,
    /// Whether running the command again could succeed.
    pub retryable: bool,
}

impl From<&Error> for ErrorResponse {
    fn from(e: &Error) -> Self {
        Self {
            message: e.to_string(),
            kind: e.kind(),
            retryable: e.is_retryable(),
        }
    }
}

impl ErrorResponse {
    /// Message with a retry hint when one applies.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.retryable {
            format!("{} (try again later)", self.message)
        } else {
            self.message.clone()
        }
    }
}

/// Record a core error in the log file and turn it into the message shown
/// to the user.
pub fn map_err(e: Error) -> CommandError {
    let kind = e.kind();
    let is_retryable = e.is_retryable();

    debug!(
        "Command error [kind={:?}, retryable={}]: {}",
        kind, is_retryable, e
    );

    CommandError::Core(ErrorResponse::from(&e))
}

/// Why a command did not complete.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CommandError {
    /// A core operation failed.
    #[error("{}", .0.summary())]
    Core(ErrorResponse),

    /// The command was understood but had nothing to act on.
    #[error("{0}")]
    Rejected(String),
}

impl CommandError {
    /// Build a rejection with `message`.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected(message.into())
    }

    /// JSON rendering for scripts.
    #[must_use]
    pub fn to_json(&self) -> String {
        let value = match self {
            Self::Core(response) => serde_json::to_value(response),
            Self::Rejected(message) => Ok(serde_json::json!({
                "message": message,
                "kind": "Rejected",
                "retryable": false,
            })),
        };
        value.map_or_else(|_| self.to_string(), |v| v.to_string())
    }
}

/// Result type for commands; the success value is the text to print.
pub type CommandResult = std::result::Result<String, CommandError>;
