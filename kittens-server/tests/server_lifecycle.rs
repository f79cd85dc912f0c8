//! Tests for server startup, health and shutdown

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{create_test_server, rev};
use kittens_core::MockSource;
use kittens_server::{AppState, KittensServer, ServerConfig, ServerError};
use serde_json::Value;

#[tokio::test]
async fn health_reports_model_status() {
    let source = Arc::new(MockSource::with_revisions(vec![rev(3, "a@x.com", "fix")]));
    let server = create_test_server(source).await;

    let body: Value = reqwest::get(server.url("/api/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["status"], "ok");
    assert_eq!(body["model"]["phase"], "steady");
    assert_eq!(body["model"]["cursor"], 3);
    assert_eq!(body["model"]["cached_revisions"], 1);
    assert!(body["uptime_seconds"].as_i64().unwrap() >= 0);
}

#[tokio::test]
async fn log_endpoint_passes_through() {
    let source = Arc::new(MockSource::with_revisions(
        (1..=3).map(|id| rev(id, "b@y.com", "c")).collect(),
    ));
    let server = create_test_server(source).await;

    let body: Value = reqwest::get(server.url("/api/log?s=-1&e=0&l=2"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let ids: Vec<i64> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![3, 2]);
}

#[tokio::test]
async fn shutdown_stops_server() {
    let server = create_test_server(Arc::new(MockSource::new())).await;

    server.shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(5), server.server_task)
        .await
        .expect("server did not stop")
        .unwrap();
    tokio::time::timeout(Duration::from_secs(5), server.model_task)
        .await
        .expect("model did not stop")
        .unwrap();
}

#[tokio::test]
async fn bind_failure_is_reported() {
    let server = create_test_server(Arc::new(MockSource::new())).await;
    let state: Arc<AppState> = Arc::new(AppState::new(server.model.clone(), server.source.clone()));

    let taken = ServerConfig::new("127.0.0.1", server.addr.port());
    let result = KittensServer::new(taken, state)
        .run(tokio_util::sync::CancellationToken::new())
        .await;
    assert!(matches!(result, Err(ServerError::Bind { .. })));
}
