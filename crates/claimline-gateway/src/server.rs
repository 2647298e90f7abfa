// SPDX-FileCopyrightText: 2026 Claimline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use claimline_core::ClaimlineError;
use claimline_queue::{QueueEngine, QueueQueries};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;

use crate::handlers;

/// State for the health and metrics endpoints.
#[derive(Clone)]
pub struct HealthState {
    /// Process start time for uptime calculation.
    pub start_time: std::time::Instant,
    /// Optional Prometheus metrics render function.
    pub prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>>,
}

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub engine: Arc<QueueEngine>,
    pub queries: Arc<QueueQueries>,
    pub health: HealthState,
}

/// Gateway server configuration (mirrors `GatewayConfig` from claimline-config).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Build the application router.
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/health", get(handlers::get_health))
        .route("/metrics", get(handlers::get_metrics))
        .route(
            "/v1/items/{item_id}/claims",
            post(handlers::submit_claim).get(handlers::get_queue_for_item),
        )
        .route("/v1/items/{item_id}/queue-info", get(handlers::get_queue_info))
        .route("/v1/items/{item_id}/stats", get(handlers::get_queue_statistics))
        .route("/v1/claims/{claim_id}/status", post(handlers::advance_status))
        .route("/v1/claims/{claim_id}/position", post(handlers::move_to_position))
        .route("/v1/users/{user_id}/claims", get(handlers::get_user_claims))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind `host:port` and serve until `shutdown` fires.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    shutdown: CancellationToken,
) -> Result<(), ClaimlineError> {
    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ClaimlineError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| ClaimlineError::Internal(format!("gateway server error: {e}")))?;

    tracing::info!("gateway stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_config_debug() {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3180,
        };
        let debug = format!("{config:?}");
        assert!(debug.contains("127.0.0.1"));
    }
}
