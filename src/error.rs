//! Error types module.
//!
//! This module defines the error taxonomy used throughout dohspeed.
//! It uses `thiserror` for structured error handling and provides
//! a custom `Result` type alias for convenience.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A specialized `Result` type for dohspeed operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error enum for dohspeed.
///
/// Each variant represents a different category of failure. Probe-level
/// failures are folded into [`ErrorKind`] on the outcome record; only
/// `Cancelled` and `State` ever escape a test run.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error (reading or writing list files)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error (server or hostname list files, JSON output)
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client construction error
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Bad hostname or server configuration; never reaches the network
    #[error("Validation error: {0}")]
    Validation(String),

    /// User-initiated abort
    #[error("Test was cancelled")]
    Cancelled,

    /// A test run was requested while another one is active
    #[error("State error: {0}")]
    State(String),

    /// Unexpected failure while testing a single server
    #[error("DNS test failed for {server}: {message}")]
    Server {
        /// Name of the server being tested
        server: String,
        /// What went wrong
        message: String,
    },

    /// Configuration error (missing list files, bad settings)
    #[error("Config error: {0}")]
    Config(String),

    /// Parse error (invalid command-line input)
    #[error("Parse error: {0}")]
    Parse(String),
}

impl Error {
    /// Create a new validation error with a message.
    #[must_use]
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a new configuration error with a message.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new parse error with a message.
    #[must_use]
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create a new single-flight violation error.
    #[must_use]
    pub fn state(msg: impl Into<String>) -> Self {
        Self::State(msg.into())
    }

    /// Wrap a failure as a server-level error.
    #[must_use]
    pub fn server(server: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Server {
            server: server.into(),
            message: message.into(),
        }
    }

    /// Check whether this error is a user-initiated cancellation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<color_eyre::Report> for Error {
    fn from(e: color_eyre::Report) -> Self {
        Self::Config(e.to_string())
    }
}

/// Failure classification attached to probe outcomes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad hostname or configuration
    Validation,
    /// Deadline exceeded; retryable
    Timeout,
    /// Transport or HTTP failure; not retried
    NetworkError,
    /// User-initiated abort
    Cancelled,
    /// Concurrent run attempted
    StateError,
    /// Server has no usable endpoint URL
    Unavailable,
}

impl ErrorKind {
    /// Short label used in tables and logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Timeout => "timeout",
            Self::NetworkError => "network_error",
            Self::Cancelled => "cancelled",
            Self::StateError => "state_error",
            Self::Unavailable => "unavailable",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure value of a single probe.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {detail}")]
pub struct ProbeError {
    /// Classification used by the retry policy
    pub kind: ErrorKind,
    /// Human-readable detail
    pub detail: String,
}

impl ProbeError {
    /// Create a probe error of the given kind.
    pub fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    /// Probe deadline expired.
    #[must_use]
    pub fn timeout(after: std::time::Duration) -> Self {
        Self::new(
            ErrorKind::Timeout,
            format!("no response within {} ms", after.as_millis()),
        )
    }

    /// Transport or HTTP failure.
    pub fn network(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::NetworkError, detail)
    }

    /// Run-level cancellation observed mid-probe.
    #[must_use]
    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled, "probe aborted by cancellation")
    }
}
