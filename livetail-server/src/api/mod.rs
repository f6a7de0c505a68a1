//! API Module
//!
//! HTTP API layer for the live-log server.
//! Each submodule handles endpoints for a specific concern.

pub mod error;
pub mod health;
pub mod logs;

use axum::{Router, routing::get};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::service::LiveLogService;
use crate::transport::SseBroker;

/// Shared state of all handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<LiveLogService>,
    pub broker: Arc<SseBroker>,
    /// Root token; cancelled on shutdown, parent of every request token
    pub shutdown: CancellationToken,
}

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Live log endpoints
        .route("/{owner}/{repo}/{branch}/{build}/logs/live", get(logs::live_logs))
        .route(
            "/teams/{namespace}/projects/{owner}/{repo}/{branch}/{build}/logs/live",
            get(logs::live_logs),
        )
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
