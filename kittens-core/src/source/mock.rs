//! Scriptable revision source for tests
//!
//! MockSource holds an in-memory repository and answers `log` requests the
//! way a Subversion server would, including the boundary revision. Failures
//! can be queued to exercise error paths.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Semaphore;

use super::{LogLimit, RevisionRef, RevisionSource};
use crate::error::SourceError;
use crate::types::Revision;

/// In-memory implementation of [`RevisionSource`]
#[derive(Default)]
pub struct MockSource {
    /// Repository contents, kept ascending by id
    revisions: Mutex<Vec<Revision>>,
    /// Errors returned by the next calls, one per call
    failures: Mutex<VecDeque<SourceError>>,
    /// When set, `log` waits for [`MockSource::release`] before answering
    gate: Mutex<Option<Arc<Semaphore>>>,
    log_calls: AtomicUsize,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a source already holding `revisions`
    pub fn with_revisions(revisions: Vec<Revision>) -> Self {
        let source = Self::new();
        source.push_all(revisions);
        source
    }

    /// Commit a revision to the mock repository
    pub fn push(&self, revision: Revision) {
        let mut revisions = lock(&self.revisions);
        revisions.retain(|r| r.id != revision.id);
        revisions.push(revision);
        revisions.sort_by_key(|r| r.id);
    }

    pub fn push_all(&self, revisions: impl IntoIterator<Item = Revision>) {
        for revision in revisions {
            self.push(revision);
        }
    }

    /// Make the next call fail with `error`
    pub fn fail_next(&self, error: SourceError) {
        lock(&self.failures).push_back(error);
    }

    /// Hold every `log` call until [`MockSource::release`] is called
    pub fn hold(&self) {
        *lock(&self.gate) = Some(Arc::new(Semaphore::new(0)));
    }

    /// Let held `log` calls complete
    pub fn release(&self) {
        if let Some(gate) = lock(&self.gate).take() {
            gate.close();
        }
    }

    /// Number of `log` calls answered or failed so far
    pub fn log_calls(&self) -> usize {
        self.log_calls.load(Ordering::SeqCst)
    }

    fn take_failure(&self) -> Option<SourceError> {
        lock(&self.failures).pop_front()
    }

    fn head_id(&self) -> Option<i64> {
        lock(&self.revisions).last().map(|r| r.id)
    }

    fn resolve(&self, reference: RevisionRef) -> i64 {
        match reference {
            RevisionRef::Head => self.head_id().unwrap_or(0),
            RevisionRef::First => 0,
            RevisionRef::Number(n) => n,
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl RevisionSource for MockSource {
    async fn head(&self) -> Result<Revision, SourceError> {
        if let Some(error) = self.take_failure() {
            return Err(error);
        }
        // An empty repository still has revision zero
        Ok(lock(&self.revisions)
            .last()
            .cloned()
            .unwrap_or_else(|| Revision::new(0, "", "", "")))
    }

    async fn log(
        &self,
        start: RevisionRef,
        end: RevisionRef,
        limit: LogLimit,
    ) -> Result<Vec<Revision>, SourceError> {
        let gate = lock(&self.gate).clone();
        if let Some(gate) = gate {
            // Closing the semaphore is the release signal
            let _ = gate.acquire().await;
        }

        self.log_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.take_failure() {
            return Err(error);
        }

        let (start, end) = (self.resolve(start), self.resolve(end));
        let (low, high) = (start.min(end), start.max(end));
        let mut selected: Vec<Revision> = lock(&self.revisions)
            .iter()
            .filter(|r| r.id >= low && r.id <= high)
            .cloned()
            .collect();
        if start > end {
            selected.reverse();
        }
        // A zero limit is no limit to a Subversion server
        if let LogLimit::Max(n @ 1..) = limit {
            selected.truncate(usize::try_from(n).unwrap_or(usize::MAX));
        }
        Ok(selected)
    }
}
