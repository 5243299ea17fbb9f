use std::sync::Arc;

use axum::routing::{delete, get, post, put};
use axum::Router;
use hubgate_refs::{RefResolver, TreeCache};
use hubgate_types::{RepositoryCoordinate, TreeHash};
use hubgate_upstream::UpstreamClient;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::error::ServerResult;
use crate::handler;
use crate::hooks::WebhookVerifier;

/// Route paths served by the façade.
pub mod endpoints {
    pub const PING: &str = "/ping";
    pub const TREE: &str = "/tree";
    pub const FILE: &str = "/file";
    pub const FILE_LINE_COUNT: &str = "/file-linecount";
    pub const BRANCH: &str = "/branch";
    pub const BRANCH_HEAD: &str = "/branch-head";
    pub const COMMIT: &str = "/commit";
    pub const PULL: &str = "/pull";
    pub const MERGE: &str = "/merge";
    pub const DELETE_BRANCH: &str = "/delete-branch";
    pub const BRANCHES: &str = "/branches";
    pub const WEBHOOK: &str = "/webhook/github";
}

/// Shared handler state. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub upstream: Arc<dyn UpstreamClient>,
    pub resolver: RefResolver,
    pub tree_cache: Option<Arc<TreeCache>>,
    pub verifier: WebhookVerifier,
    pub defaults: RepositoryCoordinate,
    pub token_configured: bool,
}

impl AppState {
    pub fn new(config: &ServerConfig, upstream: Arc<dyn UpstreamClient>) -> ServerResult<Self> {
        Ok(Self {
            resolver: RefResolver::new(upstream.clone(), config.default_branch.clone()),
            upstream,
            tree_cache: config.tree_cache().map(Arc::new),
            verifier: WebhookVerifier::new(config.webhook_secret.as_deref()),
            defaults: config.default_coordinate()?,
            token_configured: config.token_configured(),
        })
    }

    pub fn default_branch(&self) -> &str {
        self.resolver.default_branch()
    }

    pub fn coordinate(&self, owner: Option<&str>, repo: Option<&str>) -> RepositoryCoordinate {
        RepositoryCoordinate::or_defaults(owner, repo, &self.defaults)
    }

    /// Root tree for `reference`, served from the tree cache when possible.
    /// Hash references skip the cache since they resolve without I/O.
    pub async fn tree_hash(
        &self,
        reference: &str,
        coordinate: &RepositoryCoordinate,
    ) -> ServerResult<TreeHash> {
        let cache = self
            .tree_cache
            .as_deref()
            .filter(|_| !hubgate_types::is_object_hash(reference));

        if let Some(tree) = cache.and_then(|c| c.get(coordinate, reference)) {
            tracing::trace!(%coordinate, reference, "tree cache hit");
            return Ok(tree);
        }
        let tree = self.resolver.resolve_tree(reference, coordinate).await?;
        if let Some(cache) = cache {
            cache.insert(coordinate, reference, tree.clone());
        }
        Ok(tree)
    }

    /// Forget every cached tree of `coordinate`. Called after any write
    /// that can move a ref, whether it came through this server or a push.
    pub fn invalidate_trees(&self, coordinate: &RepositoryCoordinate) {
        if let Some(cache) = &self.tree_cache {
            let dropped = cache.invalidate_repository(coordinate);
            tracing::debug!(%coordinate, dropped, "tree cache invalidated");
        }
    }
}

/// Build the axum router with all hubgate endpoints.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(endpoints::PING, get(handler::ping))
        .route(endpoints::TREE, get(handler::tree))
        .route(endpoints::FILE, get(handler::file))
        .route(endpoints::FILE_LINE_COUNT, get(handler::file_line_count))
        .route(endpoints::BRANCH, post(handler::create_branch))
        .route(endpoints::BRANCH_HEAD, get(handler::branch_head))
        .route(endpoints::COMMIT, put(handler::commit))
        .route(endpoints::PULL, post(handler::create_pull))
        .route(endpoints::MERGE, put(handler::merge))
        .route(endpoints::DELETE_BRANCH, delete(handler::delete_branch))
        .route(endpoints::BRANCHES, get(handler::branches))
        .route(endpoints::WEBHOOK, post(handler::github_webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
