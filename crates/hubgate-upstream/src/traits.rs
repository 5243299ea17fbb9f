use async_trait::async_trait;
use hubgate_types::ApiPath;
use serde_json::Value;

use crate::error::UpstreamResult;

/// Request capability against the upstream hosting API.
///
/// Implementations attach credentials and own timeout policy. A 404 must
/// surface as [`UpstreamError::Status`](crate::UpstreamError::Status) with
/// status 404 so callers can tell "not found" apart from other failures.
/// Empty success bodies decode to [`Value::Null`].
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    async fn get(&self, path: &ApiPath, query: &[(&str, &str)]) -> UpstreamResult<Value>;
    async fn post(&self, path: &ApiPath, body: &Value) -> UpstreamResult<Value>;
    async fn put(&self, path: &ApiPath, body: &Value) -> UpstreamResult<Value>;
    async fn delete(&self, path: &ApiPath) -> UpstreamResult<Value>;
}
