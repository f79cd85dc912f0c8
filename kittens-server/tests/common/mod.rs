//! Shared test utilities for kittens-server integration tests

pub mod client;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use kittens_core::{
    ContributorConfig, MockSource, ModelActor, ModelConfig, ModelHandle, Reconciler, Revision,
    SqliteKittenStore,
};
use kittens_server::{AppState, KittensServer, ServerConfig};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// A running server backed by a mock source and an in-memory store
#[allow(dead_code)]
pub struct TestServer {
    pub addr: SocketAddr,
    pub source: Arc<MockSource>,
    pub store: Arc<SqliteKittenStore>,
    pub model: ModelHandle,
    pub shutdown: CancellationToken,
    pub server_task: JoinHandle<()>,
    pub model_task: JoinHandle<()>,
}

#[allow(dead_code)]
impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

#[allow(dead_code)]
pub fn rev(id: i64, author: &str, comment: &str) -> Revision {
    Revision::new(id, author, comment, "2011-01-02T00:00:00.000000Z")
}

/// Creates a test server whose model tracks `a@x.com` and `jane@x.com`
///
/// Timed polls are effectively disabled; tests drive updates explicitly.
#[allow(dead_code)]
pub async fn create_test_server(source: Arc<MockSource>) -> TestServer {
    let store = Arc::new(SqliteKittenStore::open_in_memory().unwrap());
    let config = ModelConfig::default()
        .with_roster(vec![
            ContributorConfig::new("a@x.com", "Alice"),
            ContributorConfig::new("jane@x.com", "Jane Doe"),
        ])
        .with_earliest_revision(1)
        .with_poll_interval(Duration::from_secs(3600));
    let poll_interval = config.poll_interval;
    let reconciler = Reconciler::load(config, store.clone(), source.clone())
        .await
        .unwrap();

    let shutdown = CancellationToken::new();
    let (model, model_task) = ModelActor::spawn(reconciler, poll_interval, shutdown.clone());
    let state = Arc::new(AppState::new(model.clone(), source.clone()));
    let server = KittensServer::new(ServerConfig::default(), state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let token = shutdown.clone();
    let server_task = tokio::spawn(async move {
        let _ = server.run_with_listener(listener, token).await;
    });

    TestServer {
        addr,
        source,
        store,
        model,
        shutdown,
        server_task,
        model_task,
    }
}
