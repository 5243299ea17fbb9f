//! GitHub REST API client.

use std::time::Duration;

use async_trait::async_trait;
use hubgate_types::ApiPath;
use reqwest::header::ACCEPT;
use reqwest::{Client as HttpClient, Method, Response};
use serde_json::Value;
use url::Url;

use crate::error::{UpstreamError, UpstreamResult};
use crate::traits::UpstreamClient;

/// Public GitHub API root.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

const USER_AGENT: &str = concat!("hubgate/", env!("CARGO_PKG_VERSION"));
const API_VERSION: &str = "2022-11-28";

/// Connection settings for [`GithubClient`].
#[derive(Clone, Debug)]
pub struct GithubClientConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub timeout: Duration,
}

impl Default for GithubClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.into(),
            token: None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// [`UpstreamClient`] speaking to GitHub (or GitHub Enterprise) over HTTPS.
#[derive(Debug, Clone)]
pub struct GithubClient {
    http_client: HttpClient,
    base_url: Url,
    token: Option<String>,
}

impl GithubClient {
    pub fn new(config: GithubClientConfig) -> UpstreamResult<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| UpstreamError::InvalidUrl(format!("{}: {e}", config.base_url)))?;
        let http_client = HttpClient::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .build()
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url,
            token: config.token.filter(|t| !t.is_empty()),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    async fn request(
        &self,
        method: Method,
        path: &ApiPath,
        query: &[(&str, &str)],
        body: Option<&Value>,
    ) -> UpstreamResult<Value> {
        let url = path
            .to_url(&self.base_url)
            .map_err(|e| UpstreamError::InvalidUrl(e.to_string()))?;
        tracing::trace!(%method, %url, "upstream request");

        let mut request = self
            .http_client
            .request(method, url)
            .header(ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION);

        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;
        Self::handle_response(response).await
    }

    async fn handle_response(response: Response) -> UpstreamResult<Value> {
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        if status.is_success() {
            if text.trim().is_empty() {
                return Ok(Value::Null);
            }
            return serde_json::from_str(&text).map_err(|e| UpstreamError::Decode(e.to_string()));
        }

        let body = match serde_json::from_str::<Value>(&text) {
            Ok(value) => Some(value),
            Err(_) if text.is_empty() => None,
            Err(_) => Some(Value::String(text)),
        };
        let message = body
            .as_ref()
            .and_then(|b| b.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());

        Err(UpstreamError::Status {
            status: status.as_u16(),
            message,
            body,
        })
    }
}

#[async_trait]
impl UpstreamClient for GithubClient {
    async fn get(&self, path: &ApiPath, query: &[(&str, &str)]) -> UpstreamResult<Value> {
        self.request(Method::GET, path, query, None).await
    }

    async fn post(&self, path: &ApiPath, body: &Value) -> UpstreamResult<Value> {
        self.request(Method::POST, path, &[], Some(body)).await
    }

    async fn put(&self, path: &ApiPath, body: &Value) -> UpstreamResult<Value> {
        self.request(Method::PUT, path, &[], Some(body)).await
    }

    async fn delete(&self, path: &ApiPath) -> UpstreamResult<Value> {
        self.request(Method::DELETE, path, &[], None).await
    }
}
