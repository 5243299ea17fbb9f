use std::sync::Arc;

use hubgate_upstream::{GithubClient, UpstreamClient};
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::{build_router, AppState};

/// hubgate HTTP server.
pub struct HubgateServer {
    config: ServerConfig,
}

impl HubgateServer {
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Build the router against the configured upstream API.
    pub fn router(&self) -> ServerResult<axum::Router> {
        let client = GithubClient::new(self.config.client_config())?;
        self.router_with(Arc::new(client))
    }

    /// Build the router against any upstream (useful for testing).
    pub fn router_with(&self, upstream: Arc<dyn UpstreamClient>) -> ServerResult<axum::Router> {
        Ok(build_router(AppState::new(&self.config, upstream)?))
    }

    /// Start serving requests until Ctrl-C.
    pub async fn serve(self) -> ServerResult<()> {
        self.config.validate()?;
        let app = self.router()?;
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        tracing::info!(
            addr = %self.config.bind_addr,
            upstream = %self.config.github_api_url,
            defaults = %self.config.default_coordinate()?,
            "hubgate listening"
        );
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
