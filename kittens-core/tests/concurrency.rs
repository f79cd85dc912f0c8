//! Concurrency tests for the model actor
//!
//! These tests validate that subscribers joining at arbitrary points see a
//! consistent stream:
//! - every revision newer than the snapshot arrives exactly once, in order
//! - a restarted model resumes from the persisted cursor

use std::sync::Arc;
use std::time::Duration;

use kittens_core::{
    ContributorConfig, KittenStore, MockSource, ModelActor, ModelConfig, Reconciler, Revision,
    SqliteKittenStore,
};
use tokio_util::sync::CancellationToken;

fn rev(id: i64) -> Revision {
    let author = if id % 2 == 0 { "a@x.com" } else { "b@y.com" };
    Revision::new(id, author, "fix", "2011-01-02T00:00:00.000000Z")
}

fn config() -> ModelConfig {
    ModelConfig::default()
        .with_roster(vec![ContributorConfig::new("a@x.com", "Alice")])
        .with_earliest_revision(1)
}

#[tokio::test]
async fn subscribers_joining_mid_stream_see_each_revision_once() {
    let source = Arc::new(MockSource::with_revisions(vec![rev(1)]));
    let store = Arc::new(SqliteKittenStore::open_in_memory().unwrap());
    let reconciler = Reconciler::load(config(), store, source.clone())
        .await
        .unwrap();
    let (handle, _task) = ModelActor::spawn(
        reconciler,
        Duration::from_secs(3600),
        CancellationToken::new(),
    );

    let mut subscribers = Vec::new();
    for id in 2..=21 {
        source.push(rev(id));
        let updater = handle.clone();
        let update = tokio::spawn(async move { updater.request_update().await });
        subscribers.push(handle.subscribe().await.unwrap());
        update.await.unwrap().unwrap();
    }
    // Flush any cycle still pending for the last subscriber
    handle.request_update().await.unwrap();

    for mut subscription in subscribers {
        let newest_in_snapshot = subscription
            .snapshot
            .revisions
            .first()
            .map(|r| r.id)
            .unwrap();

        let mut seen = Vec::new();
        while let Ok(change) = subscription.changes.try_recv() {
            seen.push(change.revision.id);
        }

        let expected: Vec<i64> = ((newest_in_snapshot + 1)..=21).collect();
        assert_eq!(seen, expected, "snapshot ended at r{newest_in_snapshot}");
    }
}

#[tokio::test]
async fn restart_resumes_from_persisted_cursor() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kittens.sqlite");
    let source = Arc::new(MockSource::with_revisions((1..=5).map(rev).collect()));

    {
        let store = Arc::new(SqliteKittenStore::open(&path).unwrap());
        let reconciler = Reconciler::load(config(), store, source.clone())
            .await
            .unwrap();
        assert_eq!(reconciler.cursor().position(), 5);
    }

    source.push_all((6..=8).map(rev));
    let calls_before = source.log_calls();

    let store = Arc::new(SqliteKittenStore::open(&path).unwrap());
    let reconciler = Reconciler::load(config(), store.clone(), source.clone())
        .await
        .unwrap();

    assert_eq!(reconciler.cursor().position(), 8);
    assert_eq!(store.revision_count().unwrap(), 8);
    assert_eq!(source.log_calls(), calls_before + 1);

    let alice = &store.list_contributors_with_revisions().unwrap()[0];
    assert_eq!(alice.revisions, vec![2, 4, 6, 8]);
}
