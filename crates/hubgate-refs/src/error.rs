//! Error types for reference resolution.

use hubgate_upstream::UpstreamError;
use thiserror::Error;

/// Errors that can occur while resolving a reference.
#[derive(Debug, Error)]
pub enum RefError {
    /// No candidate lookup resolved the reference.
    #[error("reference not found: {reference}")]
    NotFound { reference: String },

    /// The reference points at something other than a commit or an
    /// annotated tag of a commit.
    #[error("unsupported reference kind '{kind}' for {reference}")]
    UnsupportedReferenceKind { reference: String, kind: String },

    /// An upstream payload lacked a field the resolver relies on.
    #[error("malformed upstream object {object} for {reference}: {detail}")]
    MalformedUpstreamObject {
        reference: String,
        object: String,
        detail: String,
    },

    /// The branch name is not acceptable as a git ref component.
    #[error("invalid branch name: {name}: {reason}")]
    InvalidBranchName { name: String, reason: String },

    /// Authentication, rate limit, network or server failure. Never retried.
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

/// Convenience type alias for ref operations.
pub type Result<T> = std::result::Result<T, RefError>;
