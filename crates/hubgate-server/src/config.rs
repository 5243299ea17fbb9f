use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::path::Path;
use std::time::Duration;

use hubgate_refs::TreeCache;
use hubgate_types::RepositoryCoordinate;
use hubgate_upstream::{GithubClientConfig, DEFAULT_API_URL};
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to listen on.
    pub bind_addr: SocketAddr,
    /// Root of the upstream REST API (GitHub or GitHub Enterprise).
    pub github_api_url: String,
    /// Bearer token sent with every upstream request. Required to serve.
    pub github_token: Option<String>,
    /// Shared secret for `X-Hub-Signature-256`. When unset, webhook
    /// deliveries are accepted unsigned.
    pub webhook_secret: Option<String>,
    /// Owner used when a request names none.
    pub default_owner: String,
    /// Repository used when a request names none.
    pub default_repo: String,
    /// Branch used for empty refs and as the base of new branches.
    pub default_branch: String,
    /// Per-request upstream timeout, in seconds.
    pub request_timeout_secs: u64,
    /// Lifetime of a cached ref-to-tree entry, in seconds. `0` disables the
    /// tree cache.
    pub tree_cache_ttl_secs: u64,
    /// Maximum number of cached trees. `0` disables the tree cache.
    pub tree_cache_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            github_api_url: DEFAULT_API_URL.into(),
            github_token: None,
            webhook_secret: None,
            default_owner: "Cognify-source".into(),
            default_repo: "Koppsnipern".into(),
            default_branch: "main".into(),
            request_timeout_secs: 30,
            tree_cache_ttl_secs: 60,
            tree_cache_capacity: 256,
        }
    }
}

impl ServerConfig {
    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> ServerResult<Self> {
        toml::from_str(text).map_err(|e| ServerError::Config(e.to_string()))
    }

    pub fn from_toml_file(path: &Path) -> ServerResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Checks required before serving traffic.
    pub fn validate(&self) -> ServerResult<()> {
        if !self.token_configured() {
            return Err(ServerError::Config("GITHUB_TOKEN is not set".into()));
        }
        if self.default_branch.is_empty() {
            return Err(ServerError::Config("default branch must not be empty".into()));
        }
        self.default_coordinate()?;
        Ok(())
    }

    pub fn token_configured(&self) -> bool {
        self.github_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    pub fn default_coordinate(&self) -> ServerResult<RepositoryCoordinate> {
        RepositoryCoordinate::new(&self.default_owner, &self.default_repo)
            .map_err(|e| ServerError::Config(e.to_string()))
    }

    pub fn client_config(&self) -> GithubClientConfig {
        GithubClientConfig {
            base_url: self.github_api_url.clone(),
            token: self.github_token.clone(),
            timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }

    pub fn tree_cache(&self) -> Option<TreeCache> {
        if self.tree_cache_ttl_secs == 0 {
            return None;
        }
        let capacity = NonZeroUsize::new(self.tree_cache_capacity)?;
        Some(TreeCache::new(capacity, Duration::from_secs(self.tree_cache_ttl_secs)))
    }
}
