use thiserror::Error;

/// Errors produced by type operations.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid object hash: {0}")]
    InvalidHash(String),

    #[error("repository {field} must not be empty")]
    EmptyCoordinate { field: &'static str },

    #[error("base URL cannot carry a path: {0}")]
    InvalidBaseUrl(String),
}
