//! Error types for upstream calls.

use serde_json::Value;
use thiserror::Error;

/// Failure of a single upstream request.
///
/// Only [`UpstreamError::Status`] carries an HTTP status; everything else
/// happened before a response was read.
#[derive(Clone, Debug, Error)]
pub enum UpstreamError {
    /// The upstream answered with a non-success status.
    #[error("upstream returned {status}: {message}")]
    Status {
        status: u16,
        message: String,
        /// Response body, parsed as JSON when possible, otherwise as a string.
        body: Option<Value>,
    },

    /// Connection, TLS, or timeout failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// A success response whose body was not valid JSON.
    #[error("could not decode upstream response: {0}")]
    Decode(String),

    /// The request URL could not be built.
    #[error("invalid upstream URL: {0}")]
    InvalidUrl(String),
}

impl UpstreamError {
    /// A 404 shaped like GitHub's own.
    pub fn not_found(path: impl std::fmt::Display) -> Self {
        Self::Status {
            status: 404,
            message: "Not Found".into(),
            body: Some(serde_json::json!({ "message": "Not Found", "path": path.to_string() })),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn body(&self) -> Option<&Value> {
        match self {
            Self::Status { body, .. } => body.as_ref(),
            _ => None,
        }
    }
}

/// Convenience type alias for upstream calls.
pub type UpstreamResult<T> = Result<T, UpstreamError>;
