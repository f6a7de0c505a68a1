//! Health Check API Handler
//!
//! Liveness endpoint for monitoring.

use axum::{extract::State, http::StatusCode, response::IntoResponse};

use super::AppState;

/// GET /health
/// Reports OK until shutdown begins
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    if state.shutdown.is_cancelled() {
        return (StatusCode::SERVICE_UNAVAILABLE, "shutting down");
    }

    (StatusCode::OK, "OK")
}
