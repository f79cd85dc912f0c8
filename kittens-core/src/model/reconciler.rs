//! Loading and incremental reconciliation against the revision source

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::Cursor;
use crate::attribution::Attributor;
use crate::config::ModelConfig;
use crate::error::{KittensError, SourceError, UpdateFailure};
use crate::source::{LogLimit, RevisionRef, RevisionSource};
use crate::store::{KittenStore, StoreError};
use crate::types::{Change, Contributor, Revision, Snapshot};

/// Lifecycle phase of the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Seeding the roster and catching up to the head revision
    Loading,
    /// Polling for new revisions
    Steady,
}

/// Result of a successful update cycle
#[derive(Debug, Clone)]
pub struct UpdateReport {
    /// One change per newly persisted revision, ascending
    pub changes: Vec<Change>,
    /// Revisions at or below the cursor that were ignored
    pub skipped: usize,
    pub cursor: Cursor,
}

/// Request every revision after `cursor` up to the head
///
/// The returned batch includes the boundary revision; [`Reconciler::apply`]
/// skips it.
pub async fn fetch(source: &dyn RevisionSource, cursor: Cursor) -> Result<Vec<Revision>, SourceError> {
    source
        .log(cursor.poll_start(), RevisionRef::Head, LogLimit::Unbounded)
        .await
}

/// Single writer reconciling the store with the revision source
pub struct Reconciler {
    config: ModelConfig,
    store: Arc<dyn KittenStore>,
    source: Arc<dyn RevisionSource>,
    attributor: Attributor,
    contributors: Vec<Contributor>,
    /// Most recent revisions, id descending
    revisions: Vec<Revision>,
    cursor: Cursor,
    phase: Phase,
}

impl Reconciler {
    /// Seed the roster, optionally rebuild attributions, and catch up to head
    ///
    /// Any failure while loading is fatal.
    pub async fn load(
        config: ModelConfig,
        store: Arc<dyn KittenStore>,
        source: Arc<dyn RevisionSource>,
    ) -> Result<Self, KittensError> {
        config.validate()?;
        info!(contributors = config.roster.len(), "Loading model");

        for contributor in &config.roster {
            store.upsert_contributor(contributor.email.trim(), &contributor.name)?;
        }

        let attributor = Attributor::new()?;
        if config.rebuild_on_start {
            let report = store.rebuild_attributions(&attributor)?;
            info!(
                scanned = report.revisions_scanned,
                added = report.links_added,
                total = report.links_total,
                "Rebuilt attributions"
            );
        }

        let cursor = Cursor::from_latest(store.latest_revision_id()?, config.earliest_revision);
        let mut reconciler = Self {
            config,
            store,
            source,
            attributor,
            contributors: Vec::new(),
            revisions: Vec::new(),
            cursor,
            phase: Phase::Loading,
        };
        reconciler.refresh_caches()?;

        let report = reconciler
            .catch_up()
            .await
            .map_err(|failure| KittensError::Model(failure.error))?;
        info!(
            ingested = report.changes.len(),
            cursor = %report.cursor,
            "Model loaded"
        );

        reconciler.phase = Phase::Steady;
        Ok(reconciler)
    }

    /// Bring the store up to the head revision in one bounded request
    async fn catch_up(&mut self) -> Result<UpdateReport, UpdateFailure> {
        let cursor = self.begin_cycle()?;
        let head = self
            .source
            .head()
            .await
            .map_err(|e| UpdateFailure::before_commit(cursor, e))?;

        if !cursor.is_behind(head.id) {
            debug!(head = head.id, %cursor, "Store already at head");
            return Ok(UpdateReport {
                changes: Vec::new(),
                skipped: 0,
                cursor,
            });
        }

        info!(from = %cursor, to = head.id, "Catching up with revision source");
        let batch = self
            .source
            .log(
                cursor.poll_start(),
                RevisionRef::Number(head.id),
                LogLimit::Unbounded,
            )
            .await
            .map_err(|e| UpdateFailure::before_commit(cursor, e))?;
        self.apply(cursor, batch)
    }

    /// Re-derive the cursor from the store at the start of a cycle
    pub fn begin_cycle(&self) -> Result<Cursor, UpdateFailure> {
        self.store
            .latest_revision_id()
            .map(|latest| Cursor::from_latest(latest, self.config.earliest_revision))
            .map_err(|e| UpdateFailure::before_commit(self.cursor, e))
    }

    /// Run one full update cycle: fetch then apply
    pub async fn update(&mut self) -> Result<UpdateReport, UpdateFailure> {
        let cursor = self.begin_cycle()?;
        let batch = fetch(self.source.as_ref(), cursor)
            .await
            .map_err(|e| UpdateFailure::before_commit(cursor, e))?;
        self.apply(cursor, batch)
    }

    /// Persist and attribute a fetched batch, ascending by id
    ///
    /// Revisions at or below `cursor` are skipped. On a store failure the
    /// revisions committed so far are returned in the failure and the cursor
    /// stays at the last of them.
    pub fn apply(&mut self, cursor: Cursor, mut batch: Vec<Revision>) -> Result<UpdateReport, UpdateFailure> {
        batch.sort_by_key(|r| r.id);
        batch.dedup_by_key(|r| r.id);

        let roster: Vec<String> = self.contributors.iter().map(|c| c.email.clone()).collect();
        let mut cursor = cursor;
        let mut changes = Vec::new();
        let mut skipped = 0;

        for revision in batch {
            if !cursor.is_behind(revision.id) {
                debug!(revision = revision.id, %cursor, "Skipping revision at or below cursor");
                skipped += 1;
                continue;
            }

            let attributed = self
                .attributor
                .attribute(&revision, roster.iter().map(String::as_str));
            if let Err(error) = self.store.record_revision(&revision, &attributed) {
                self.cursor = cursor;
                self.refresh_after_batch();
                return Err(UpdateFailure {
                    committed: changes,
                    cursor,
                    error: error.into(),
                });
            }

            debug!(revision = revision.id, attributed = attributed.len(), "Recorded revision");
            cursor.advance(revision.id);
            let change = Change {
                revision,
                attributed_contributors: attributed,
            };
            self.fold_into_caches(&change);
            changes.push(change);
        }

        self.cursor = cursor;
        self.refresh_after_batch();
        Ok(UpdateReport {
            changes,
            skipped,
            cursor,
        })
    }

    /// Current contributors and the most recent revisions
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            revisions: self.revisions.clone(),
            contributors: self.contributors.clone(),
            version: self.config.version.clone(),
        }
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn source(&self) -> Arc<dyn RevisionSource> {
        Arc::clone(&self.source)
    }

    pub fn cached_revisions(&self) -> usize {
        self.revisions.len()
    }

    pub fn contributor_count(&self) -> usize {
        self.contributors.len()
    }

    fn refresh_caches(&mut self) -> Result<(), StoreError> {
        self.contributors = self.store.list_contributors_with_revisions()?;
        self.revisions = self.store.list_revisions(Some(self.config.snapshot_window))?;
        Ok(())
    }

    /// Account for a committed change without reading the store back
    ///
    /// Snapshots must include every change already published, even when the
    /// store re-read after the batch fails.
    fn fold_into_caches(&mut self, change: &Change) {
        let id = change.revision.id;
        if self.revisions.first().is_none_or(|newest| newest.id < id) {
            self.revisions.insert(0, change.revision.clone());
            self.revisions.truncate(self.config.snapshot_window);
        }
        for contributor in &mut self.contributors {
            let credited = change
                .attributed_contributors
                .iter()
                .any(|email| *email == contributor.email);
            if credited && contributor.revisions.last().is_none_or(|last| *last < id) {
                contributor.revisions.push(id);
            }
        }
    }

    fn refresh_after_batch(&mut self) {
        if let Err(error) = self.refresh_caches() {
            warn!(%error, "Failed to refresh model caches");
        }
    }
}
