//! Live Log API Handlers
//!
//! Opens a Server-Sent Events stream of a build's console output.

use axum::{
    extract::{Path, State},
    response::sse::{KeepAlive, KeepAliveStream, Sse},
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use super::AppState;
use crate::api::error::ApiResult;
use crate::transport::ViewerStream;

/// Path parameters of both live-log routes
#[derive(Debug, Deserialize)]
pub struct LiveLogsPath {
    #[serde(default)]
    pub namespace: Option<String>,
    pub owner: String,
    pub repo: String,
    pub branch: String,
    pub build: String,
}

/// GET /{owner}/{repo}/{branch}/{build}/logs/live
/// GET /teams/{namespace}/projects/{owner}/{repo}/{branch}/{build}/logs/live
/// Stream live logs of one build
///
/// Lookups happen before the stream opens so a missing activity or an
/// unscheduled build is answered with a plain status code.
pub async fn live_logs(
    State(state): State<AppState>,
    Path(path): Path<LiveLogsPath>,
) -> ApiResult<Sse<KeepAliveStream<ViewerStream>>> {
    let coordinates = state.service.coordinates(
        &path.owner,
        &path.repo,
        &path.branch,
        &path.build,
        path.namespace.as_deref(),
    );

    tracing::info!("Live logs requested for {}", coordinates);

    let prepared = state.service.prepare(&coordinates).await?;

    let request = state.shutdown.child_token();
    let (connection, viewer) = state
        .broker
        .connect(Uuid::new_v4().to_string(), &request)?;

    let service = Arc::clone(&state.service);
    tokio::spawn(async move {
        service.stream(prepared, connection, request).await;
    });

    Ok(Sse::new(viewer).keep_alive(KeepAlive::default()))
}
