//! In-memory upstream for tests and offline use.
//!
//! [`ScriptedUpstream`] answers from a table of canned replies keyed by
//! method and unencoded path, and records every call it receives so tests
//! can assert on the exact sequence of upstream lookups. Unscripted paths
//! answer 404.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use hubgate_types::ApiPath;
use serde_json::Value;

use crate::error::{UpstreamError, UpstreamResult};
use crate::traits::UpstreamClient;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

/// One request as seen by [`ScriptedUpstream`].
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedCall {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

type ReplyQueue = VecDeque<UpstreamResult<Value>>;

#[derive(Debug, Default)]
pub struct ScriptedUpstream {
    replies: Mutex<HashMap<(Method, String), ReplyQueue>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedUpstream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the reply for `method` on `path` (e.g. `/repos/o/r/branches`).
    pub fn on(&self, method: Method, path: &str, reply: UpstreamResult<Value>) -> &Self {
        self.sequence(method, path, vec![reply])
    }

    /// Script successive replies for the same request. Each call consumes
    /// one; the last one then repeats.
    pub fn sequence(&self, method: Method, path: &str, replies: Vec<UpstreamResult<Value>>) -> &Self {
        if let Ok(mut table) = self.replies.lock() {
            table.insert((method, path.to_string()), replies.into());
        }
        self
    }

    pub fn on_get(&self, path: &str, body: Value) -> &Self {
        self.on(Method::Get, path, Ok(body))
    }

    pub fn fail_get(&self, path: &str, error: UpstreamError) -> &Self {
        self.on(Method::Get, path, Err(error))
    }

    /// Every call received so far, oldest first.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Paths of the calls received so far, oldest first.
    pub fn call_paths(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.path).collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }

    fn reply(
        &self,
        method: Method,
        path: &ApiPath,
        query: &[(&str, &str)],
        body: Option<&Value>,
    ) -> UpstreamResult<Value> {
        let path = path.to_string();
        self.calls
            .lock()
            .map_err(|e| UpstreamError::Transport(format!("lock poisoned: {e}")))?
            .push(RecordedCall {
                method,
                path: path.clone(),
                query: query
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                body: body.cloned(),
            });

        let mut table = self
            .replies
            .lock()
            .map_err(|e| UpstreamError::Transport(format!("lock poisoned: {e}")))?;
        let Some(queue) = table.get_mut(&(method, path.clone())) else {
            return Err(UpstreamError::not_found(path));
        };
        if queue.len() > 1 {
            if let Some(reply) = queue.pop_front() {
                return reply;
            }
        }
        queue
            .front()
            .cloned()
            .unwrap_or_else(|| Err(UpstreamError::not_found(path)))
    }
}

#[async_trait]
impl UpstreamClient for ScriptedUpstream {
    async fn get(&self, path: &ApiPath, query: &[(&str, &str)]) -> UpstreamResult<Value> {
        self.reply(Method::Get, path, query, None)
    }

    async fn post(&self, path: &ApiPath, body: &Value) -> UpstreamResult<Value> {
        self.reply(Method::Post, path, &[], Some(body))
    }

    async fn put(&self, path: &ApiPath, body: &Value) -> UpstreamResult<Value> {
        self.reply(Method::Put, path, &[], Some(body))
    }

    async fn delete(&self, path: &ApiPath) -> UpstreamResult<Value> {
        self.reply(Method::Delete, path, &[], None)
    }
}
