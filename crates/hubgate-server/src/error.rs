use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use hubgate_refs::RefError;
use hubgate_upstream::UpstreamError;
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Invalid signature")]
    InvalidSignature,

    #[error(transparent)]
    Ref(#[from] RefError),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServerResult<T> = Result<T, ServerError>;

impl ServerError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// The upstream failure behind this error, if any.
    pub fn upstream(&self) -> Option<&UpstreamError> {
        match self {
            Self::Upstream(e) | Self::Ref(RefError::Upstream(e)) => Some(e),
            _ => None,
        }
    }

    pub fn status(&self) -> StatusCode {
        if let Some(e) = self.upstream() {
            return e
                .status()
                .and_then(|s| StatusCode::from_u16(s).ok())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        }
        match self {
            Self::BadRequest(_) | Self::Ref(RefError::InvalidBranchName { .. }) => {
                StatusCode::BAD_REQUEST
            }
            Self::InvalidSignature => StatusCode::UNAUTHORIZED,
            Self::Ref(RefError::NotFound { .. }) => StatusCode::NOT_FOUND,
            Self::Ref(RefError::UnsupportedReferenceKind { .. }) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Ref(RefError::MalformedUpstreamObject { .. }) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        // Upstream failures are reported by the handler with its endpoint name.
        if status.is_server_error() && self.upstream().is_none() {
            tracing::warn!(%status, error = %self, "request failed");
        } else {
            tracing::debug!(%status, error = %self, "request rejected");
        }

        let body = match &self {
            Self::Ref(_) | Self::Upstream(_) => json!({
                "error": self.to_string(),
                "githubResponse": self.upstream().and_then(|e| e.body().cloned()).unwrap_or(Value::Null),
            }),
            _ => json!({ "error": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}
