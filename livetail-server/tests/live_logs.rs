//! Router tests for the live-log endpoints, backed by in-memory stores

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use futures::StreamExt;
use livetail_core::domain::activity::ActivityRecord;
use livetail_core::domain::execution::ExecutionRecord;
use livetail_core::labels::{BRANCH_LABEL, BUILD_NUMBER_LABEL, ORG_LABEL, REPO_LABEL};
use livetail_server::api::{AppState, create_router};
use livetail_server::producer::{FeedScript, ScriptedLogProducer};
use livetail_server::repository::{MemoryActivityStore, MemoryExecutionLister};
use livetail_server::service::{CoordinateResolver, ExecutionLocator, LiveLogService};
use livetail_server::transport::SseBroker;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

struct TestApp {
    router: Router,
    broker: Arc<SseBroker>,
    shutdown: CancellationToken,
}

fn build_run(namespace: &str) -> ExecutionRecord {
    ExecutionRecord::new("acme-widgets-main-5-run", namespace)
        .with_label(ORG_LABEL, "acme")
        .with_label(REPO_LABEL, "widgets")
        .with_label(BRANCH_LABEL, "main")
        .with_label(BUILD_NUMBER_LABEL, "5")
}

fn test_app(store: MemoryActivityStore, lister: MemoryExecutionLister) -> TestApp {
    let producer = ScriptedLogProducer::new([FeedScript::lines(["cloning", "building"])]);
    let service = LiveLogService::new(
        CoordinateResolver::new(Arc::new(store), "jx"),
        ExecutionLocator::new(Arc::new(lister)),
        Arc::new(producer),
    );

    let shutdown = CancellationToken::new();
    let broker = Arc::new(SseBroker::new(shutdown.clone(), 16, 4));
    let router = create_router(AppState {
        service: Arc::new(service),
        broker: Arc::clone(&broker),
        shutdown: shutdown.clone(),
    });

    TestApp {
        router,
        broker,
        shutdown,
    }
}

fn populated_app() -> TestApp {
    test_app(
        MemoryActivityStore::new().with_record(ActivityRecord::new("acme-widgets-main-5", "jx")),
        MemoryExecutionLister::new().with_execution(build_run("jx")),
    )
}

async fn get(router: Router, uri: &str) -> axum::response::Response {
    router
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Read the event stream until the end-of-feed event arrives
async fn read_until_eof(response: axum::response::Response) -> String {
    let mut body = response.into_body().into_data_stream();
    let mut text = String::new();

    while !text.contains("event: EOF") {
        let chunk = body.next().await.unwrap().unwrap();
        text.push_str(&String::from_utf8_lossy(&chunk));
    }

    text
}

#[tokio::test]
async fn test_health() {
    let app = populated_app();

    let response = get(app.router, "/health").await;

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_activity_is_not_found() {
    let app = populated_app();

    let response = get(app.router, "/acme/widgets/main/6/logs/live").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert!(body["error"].as_str().unwrap().contains("acme-widgets-main-6"));
}

#[tokio::test]
async fn test_unscheduled_build_is_too_early() {
    let app = test_app(
        MemoryActivityStore::new().with_record(ActivityRecord::new("acme-widgets-main-5", "jx")),
        MemoryExecutionLister::new(),
    );

    let response = get(app.router, "/acme/widgets/main/5/logs/live").await;

    assert_eq!(response.status().as_u16(), 425);
    let body = json_body(response).await;
    assert_eq!(
        body["error"],
        "no PipelineRun found using labelSelector branch=main,build=5,owner=acme,repository=widgets"
    );
}

#[tokio::test]
async fn test_streams_logs_then_end_of_feed() {
    let app = populated_app();

    let response = get(app.router, "/acme/widgets/main/5/logs/live").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/event-stream"
    );

    let text = read_until_eof(response).await;
    let cloning = text.find("data: cloning").unwrap();
    let building = text.find("data: building").unwrap();
    let eof = text.find("data: End Of Feed").unwrap();
    assert!(cloning < building && building < eof);
    assert_eq!(text.matches("event: log").count(), 2);
    assert!(!text.contains("event: error"));
}

#[tokio::test]
async fn test_team_route_uses_namespace() {
    let app = test_app(
        MemoryActivityStore::new().with_record(ActivityRecord::new("acme-widgets-main-5", "ci")),
        MemoryExecutionLister::new().with_execution(build_run("ci")),
    );

    let default_ns = get(app.router.clone(), "/acme/widgets/main/5/logs/live").await;
    assert_eq!(default_ns.status(), StatusCode::NOT_FOUND);

    let response = get(
        app.router,
        "/teams/ci/projects/acme/widgets/main/5/logs/live",
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    read_until_eof(response).await;
}

#[tokio::test]
async fn test_disconnect_releases_connection() {
    let app = populated_app();

    let response = get(app.router, "/acme/widgets/main/5/logs/live").await;
    assert_eq!(app.broker.active_connections(), 1);

    read_until_eof(response).await;

    assert_eq!(app.broker.active_connections(), 0);
}

#[tokio::test]
async fn test_refuses_viewers_during_shutdown() {
    let app = populated_app();
    app.shutdown.cancel();

    let response = get(app.router.clone(), "/acme/widgets/main/5/logs/live").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let health = get(app.router, "/health").await;
    assert_eq!(health.status(), StatusCode::SERVICE_UNAVAILABLE);
}
