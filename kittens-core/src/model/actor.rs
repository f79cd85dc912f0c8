//! Single-task driver for the reconciler
//!
//! The actor owns the [`Reconciler`] and the subscriber [`Registry`]. Polls run
//! the network fetch on a spawned task so commands keep being served while a
//! request is in flight; the fetched batch is applied back on the actor task.
//! At most one poll is in flight at a time and manual update requests made
//! during a poll wait for it instead of starting another.

use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::reconciler::{Reconciler, UpdateReport, fetch};
use super::registry::{Registry, SubscriberId};
use super::{Cursor, Phase};
use crate::error::{ModelError, SourceError, UpdateFailure};
use crate::types::{Change, Revision, Snapshot};

const COMMAND_CAPACITY: usize = 64;

/// A registered subscriber: the snapshot it starts from and every later change
#[derive(Debug)]
pub struct Subscription {
    pub id: SubscriberId,
    pub snapshot: Snapshot,
    pub changes: mpsc::UnboundedReceiver<Change>,
}

/// Outcome of an update cycle as reported to whoever asked for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateStatus {
    /// Ids of the revisions recorded by the cycle, ascending
    pub processed: Vec<i64>,
    pub skipped: usize,
    pub cursor: Cursor,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&UpdateReport> for UpdateStatus {
    fn from(report: &UpdateReport) -> Self {
        Self {
            processed: report.changes.iter().map(|c| c.revision.id).collect(),
            skipped: report.skipped,
            cursor: report.cursor,
            error: None,
        }
    }
}

impl From<&UpdateFailure> for UpdateStatus {
    fn from(failure: &UpdateFailure) -> Self {
        Self {
            processed: failure.committed.iter().map(|c| c.revision.id).collect(),
            skipped: 0,
            cursor: failure.cursor,
            error: Some(failure.error.to_string()),
        }
    }
}

/// Point-in-time view of the running model
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelStatus {
    pub phase: Phase,
    pub cursor: Cursor,
    pub subscribers: usize,
    pub cached_revisions: usize,
    pub contributors: usize,
    /// Whether a poll is currently in flight
    pub polling: bool,
}

enum Command {
    Subscribe {
        reply: oneshot::Sender<Subscription>,
    },
    Unsubscribe {
        id: SubscriberId,
    },
    Update {
        reply: oneshot::Sender<UpdateStatus>,
    },
    Status {
        reply: oneshot::Sender<ModelStatus>,
    },
}

/// Cloneable handle used to talk to a running [`ModelActor`]
#[derive(Debug, Clone)]
pub struct ModelHandle {
    commands: mpsc::Sender<Command>,
}

impl ModelHandle {
    /// Register a subscriber and receive the current snapshot
    pub async fn subscribe(&self) -> Result<Subscription, ModelError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Subscribe { reply }).await?;
        rx.await.map_err(|_| ModelError::Stopped)
    }

    pub async fn unsubscribe(&self, id: SubscriberId) -> Result<(), ModelError> {
        self.send(Command::Unsubscribe { id }).await
    }

    /// Run an update cycle now, or join the one in flight, and wait for it
    pub async fn request_update(&self) -> Result<UpdateStatus, ModelError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Update { reply }).await?;
        rx.await.map_err(|_| ModelError::Stopped)
    }

    pub async fn status(&self) -> Result<ModelStatus, ModelError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Status { reply }).await?;
        rx.await.map_err(|_| ModelError::Stopped)
    }

    async fn send(&self, command: Command) -> Result<(), ModelError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| ModelError::Stopped)
    }
}

struct InFlightPoll {
    cursor: Cursor,
    task: JoinHandle<Result<Vec<Revision>, SourceError>>,
}

type PollOutcome = (Cursor, Result<Result<Vec<Revision>, SourceError>, JoinError>);

/// Owns the reconciler and serializes every model mutation
pub struct ModelActor {
    reconciler: Reconciler,
    registry: Registry,
    commands: mpsc::Receiver<Command>,
    poll_interval: Duration,
    shutdown: CancellationToken,
    in_flight: Option<InFlightPoll>,
    waiters: Vec<oneshot::Sender<UpdateStatus>>,
}

impl ModelActor {
    /// Start the actor on a new task
    ///
    /// The first timed poll happens one `poll_interval` after spawning. The
    /// task ends when `shutdown` is cancelled or every handle is dropped.
    pub fn spawn(
        reconciler: Reconciler,
        poll_interval: Duration,
        shutdown: CancellationToken,
    ) -> (ModelHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(COMMAND_CAPACITY);
        let actor = Self {
            reconciler,
            registry: Registry::new(),
            commands: rx,
            poll_interval,
            shutdown,
            in_flight: None,
            waiters: Vec::new(),
        };
        let task = tokio::spawn(actor.run());
        (ModelHandle { commands: tx }, task)
    }

    async fn run(mut self) {
        let mut ticker = interval_at(Instant::now() + self.poll_interval, self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            interval_secs = self.poll_interval.as_secs(),
            cursor = %self.reconciler.cursor(),
            "Model actor started"
        );

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("Model actor shutting down");
                    break;
                }
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => {
                        debug!("All model handles dropped");
                        break;
                    }
                },
                _ = ticker.tick() => self.start_poll(None),
                outcome = poll_outcome(&mut self.in_flight) => self.finish_poll(outcome),
            }
        }

        if let Some(poll) = self.in_flight.take() {
            poll.task.abort();
        }
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Subscribe { reply } => {
                let (id, changes) = self.registry.register();
                let subscription = Subscription {
                    id,
                    snapshot: self.reconciler.snapshot(),
                    changes,
                };
                if reply.send(subscription).is_err() {
                    self.registry.unregister(id);
                } else {
                    debug!(%id, subscribers = self.registry.len(), "Subscriber added");
                }
            }
            Command::Unsubscribe { id } => {
                if self.registry.unregister(id) {
                    debug!(%id, subscribers = self.registry.len(), "Subscriber removed");
                }
            }
            Command::Update { reply } => self.start_poll(Some(reply)),
            Command::Status { reply } => {
                let _ = reply.send(self.status());
            }
        }
    }

    fn status(&self) -> ModelStatus {
        ModelStatus {
            phase: self.reconciler.phase(),
            cursor: self.reconciler.cursor(),
            subscribers: self.registry.len(),
            cached_revisions: self.reconciler.cached_revisions(),
            contributors: self.reconciler.contributor_count(),
            polling: self.in_flight.is_some(),
        }
    }

    fn start_poll(&mut self, waiter: Option<oneshot::Sender<UpdateStatus>>) {
        self.waiters.extend(waiter);
        if self.in_flight.is_some() {
            debug!("Poll already in flight");
            return;
        }

        match self.reconciler.begin_cycle() {
            Ok(cursor) => {
                debug!(%cursor, "Polling revision source");
                let source = self.reconciler.source();
                let task = tokio::spawn(async move { fetch(source.as_ref(), cursor).await });
                self.in_flight = Some(InFlightPoll { cursor, task });
            }
            Err(failure) => {
                warn!(error = %failure, "Could not start update");
                self.answer_waiters(UpdateStatus::from(&failure));
            }
        }
    }

    fn finish_poll(&mut self, (cursor, joined): PollOutcome) {
        self.in_flight = None;
        let outcome = match joined {
            Ok(Ok(batch)) => self.reconciler.apply(cursor, batch),
            Ok(Err(error)) => Err(UpdateFailure::before_commit(cursor, error)),
            Err(error) => Err(UpdateFailure::before_commit(
                cursor,
                ModelError::PollAborted(error.to_string()),
            )),
        };

        let status = match outcome {
            Ok(report) => {
                self.publish(&report.changes);
                if report.changes.is_empty() {
                    debug!(cursor = %report.cursor, "No new revisions");
                } else {
                    info!(
                        revisions = report.changes.len(),
                        cursor = %report.cursor,
                        "Recorded new revisions"
                    );
                }
                UpdateStatus::from(&report)
            }
            Err(failure) => {
                self.publish(&failure.committed);
                warn!(error = %failure, "Update failed, will retry on next trigger");
                UpdateStatus::from(&failure)
            }
        };
        self.answer_waiters(status);
    }

    fn publish(&mut self, changes: &[Change]) {
        for change in changes {
            self.registry.publish(change);
        }
    }

    fn answer_waiters(&mut self, status: UpdateStatus) {
        for waiter in self.waiters.drain(..) {
            let _ = waiter.send(status.clone());
        }
    }
}

/// Resolve when the in-flight poll finishes; pending forever when idle
async fn poll_outcome(in_flight: &mut Option<InFlightPoll>) -> PollOutcome {
    match in_flight {
        Some(poll) => {
            let joined = (&mut poll.task).await;
            (poll.cursor, joined)
        }
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::time::timeout;

    use super::*;
    use crate::config::{ContributorConfig, ModelConfig};
    use crate::source::MockSource;
    use crate::store::{KittenStore, SqliteKittenStore};

    const WAIT: Duration = Duration::from_secs(5);
    const NEVER: Duration = Duration::from_secs(3600);

    fn rev(id: i64, author: &str) -> Revision {
        Revision::new(id, author, "fix", "2011-01-02T00:00:00.000000Z")
    }

    async fn start(
        source: Arc<MockSource>,
        poll_interval: Duration,
    ) -> (ModelHandle, JoinHandle<()>, Arc<SqliteKittenStore>, CancellationToken) {
        let store = Arc::new(SqliteKittenStore::open_in_memory().unwrap());
        let config = ModelConfig::default()
            .with_roster(vec![ContributorConfig::new("a@x.com", "Alice")])
            .with_earliest_revision(1);
        let reconciler = Reconciler::load(config, store.clone(), source).await.unwrap();
        let shutdown = CancellationToken::new();
        let (handle, task) = ModelActor::spawn(reconciler, poll_interval, shutdown.clone());
        (handle, task, store, shutdown)
    }

    async fn wait_for_poll(handle: &ModelHandle) {
        timeout(WAIT, async {
            while !handle.status().await.unwrap().polling {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("poll never started");
    }

    #[tokio::test]
    async fn subscriber_gets_snapshot_then_one_change_per_revision() {
        let source = Arc::new(MockSource::with_revisions(vec![rev(1, "a@x.com")]));
        let (handle, _task, _store, _shutdown) = start(source.clone(), NEVER).await;

        let mut subscription = handle.subscribe().await.unwrap();
        assert_eq!(subscription.snapshot.revisions.len(), 1);
        assert_eq!(subscription.snapshot.contributors[0].revisions, vec![1]);

        source.push(rev(2, "a@x.com"));
        source.push(rev(3, "b@y.com"));
        let status = handle.request_update().await.unwrap();
        assert_eq!(status.processed, vec![2, 3]);
        assert_eq!(status.skipped, 1);
        assert!(status.error.is_none());

        let first = subscription.changes.recv().await.unwrap();
        assert_eq!(first.revision.id, 2);
        assert_eq!(first.attributed_contributors, vec!["a@x.com"]);
        let second = subscription.changes.recv().await.unwrap();
        assert_eq!(second.revision.id, 3);
        assert!(second.attributed_contributors.is_empty());
        assert!(subscription.changes.try_recv().is_err());
    }

    #[tokio::test]
    async fn failed_poll_publishes_nothing() {
        let source = Arc::new(MockSource::new());
        let (handle, _task, store, _shutdown) = start(source.clone(), NEVER).await;
        let mut subscription = handle.subscribe().await.unwrap();

        source.push(rev(5, "a@x.com"));
        source.fail_next(SourceError::Unavailable("connection reset".to_string()));
        let status = handle.request_update().await.unwrap();

        assert!(status.error.unwrap().contains("connection reset"));
        assert!(status.processed.is_empty());
        assert_eq!(status.cursor, Cursor::at(0));
        assert_eq!(store.revision_count().unwrap(), 0);
        assert!(subscription.changes.try_recv().is_err());

        // Still running, and the next cycle succeeds
        let status = handle.request_update().await.unwrap();
        assert_eq!(status.processed, vec![5]);
    }

    #[tokio::test]
    async fn subscribe_is_served_while_poll_in_flight() {
        let source = Arc::new(MockSource::with_revisions(vec![rev(1, "a@x.com")]));
        let (handle, _task, _store, _shutdown) = start(source.clone(), NEVER).await;

        source.push(rev(2, "a@x.com"));
        source.hold();
        let updater = handle.clone();
        let update = tokio::spawn(async move { updater.request_update().await });
        wait_for_poll(&handle).await;

        let mut subscription = timeout(WAIT, handle.subscribe()).await.unwrap().unwrap();
        let snapshot_ids: Vec<i64> = subscription.snapshot.revisions.iter().map(|r| r.id).collect();
        assert_eq!(snapshot_ids, vec![1]);

        source.release();
        let status = update.await.unwrap().unwrap();
        assert_eq!(status.processed, vec![2]);

        let change = subscription.changes.recv().await.unwrap();
        assert_eq!(change.revision.id, 2);
        assert!(subscription.changes.try_recv().is_err());
    }

    #[tokio::test]
    async fn concurrent_update_requests_share_one_poll() {
        let source = Arc::new(MockSource::new());
        let (handle, _task, _store, _shutdown) = start(source.clone(), NEVER).await;
        let calls_before = source.log_calls();

        source.push(rev(7, "a@x.com"));
        source.hold();
        let first = tokio::spawn({
            let handle = handle.clone();
            async move { handle.request_update().await }
        });
        wait_for_poll(&handle).await;
        let second = tokio::spawn({
            let handle = handle.clone();
            async move { handle.request_update().await }
        });
        // Make sure the second request is queued before releasing
        handle.status().await.unwrap();
        source.release();

        let first = first.await.unwrap().unwrap();
        let second = second.await.unwrap().unwrap();
        assert_eq!(first, second);
        assert_eq!(first.processed, vec![7]);
        assert_eq!(source.log_calls(), calls_before + 1);
    }

    #[tokio::test]
    async fn unsubscribe_removes_subscriber() {
        let (handle, _task, _store, _shutdown) = start(Arc::new(MockSource::new()), NEVER).await;

        let subscription = handle.subscribe().await.unwrap();
        assert_eq!(handle.status().await.unwrap().subscribers, 1);

        handle.unsubscribe(subscription.id).await.unwrap();
        assert_eq!(handle.status().await.unwrap().subscribers, 0);
    }

    #[tokio::test]
    async fn dropped_subscriber_is_pruned_on_publish() {
        let source = Arc::new(MockSource::new());
        let (handle, _task, _store, _shutdown) = start(source.clone(), NEVER).await;

        let subscription = handle.subscribe().await.unwrap();
        drop(subscription);
        source.push(rev(3, "a@x.com"));
        handle.request_update().await.unwrap();

        assert_eq!(handle.status().await.unwrap().subscribers, 0);
    }

    #[tokio::test]
    async fn large_batch_reaches_subscriber_that_has_not_read_yet() {
        let source = Arc::new(MockSource::new());
        let (handle, _task, _store, _shutdown) = start(source.clone(), NEVER).await;
        let mut subscription = handle.subscribe().await.unwrap();

        source.push_all((1..=300).map(|id| rev(id, "a@x.com")));
        let status = handle.request_update().await.unwrap();
        assert_eq!(status.processed.len(), 300);
        assert_eq!(handle.status().await.unwrap().subscribers, 1);

        let mut received = Vec::new();
        while let Ok(change) = subscription.changes.try_recv() {
            received.push(change.revision.id);
        }
        assert_eq!(received, (1..=300).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn timer_drives_polls() {
        let source = Arc::new(MockSource::new());
        let (handle, _task, _store, _shutdown) =
            start(source.clone(), Duration::from_millis(20)).await;
        let mut subscription = handle.subscribe().await.unwrap();

        source.push(rev(4, "a@x.com"));
        let change = timeout(WAIT, subscription.changes.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(change.revision.id, 4);
    }

    #[tokio::test]
    async fn status_reports_steady_phase() {
        let source = Arc::new(MockSource::with_revisions(vec![rev(1, "a@x.com")]));
        let (handle, _task, _store, _shutdown) = start(source, NEVER).await;

        let status = handle.status().await.unwrap();
        assert_eq!(status.phase, Phase::Steady);
        assert_eq!(status.cursor, Cursor::at(1));
        assert_eq!(status.cached_revisions, 1);
        assert_eq!(status.contributors, 1);
        assert!(!status.polling);
    }

    #[tokio::test]
    async fn shutdown_stops_actor() {
        let (handle, task, _store, shutdown) = start(Arc::new(MockSource::new()), NEVER).await;

        shutdown.cancel();
        timeout(WAIT, task).await.unwrap().unwrap();
        assert!(matches!(handle.status().await, Err(ModelError::Stopped)));
    }
}
