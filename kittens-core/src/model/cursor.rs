//! The reconciliation cursor

use std::fmt;

use serde::Serialize;

use crate::source::RevisionRef;

/// Highest revision known to be persisted
///
/// For an empty store the cursor sits just below the earliest revision that
/// should be ingested. It never moves backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Cursor(i64);

impl Cursor {
    pub fn at(revision: i64) -> Self {
        Self(revision)
    }

    /// Derive the cursor from the newest stored revision
    pub fn from_latest(latest: Option<i64>, earliest_revision: i64) -> Self {
        match latest {
            Some(id) => Self(id),
            None => Self(earliest_revision.saturating_sub(1)),
        }
    }

    pub fn position(&self) -> i64 {
        self.0
    }

    /// Whether `revision` has not been reached yet
    pub fn is_behind(&self, revision: i64) -> bool {
        revision > self.0
    }

    /// Move forward to `revision`; returns false and stays put otherwise
    pub fn advance(&mut self, revision: i64) -> bool {
        if self.is_behind(revision) {
            self.0 = revision;
            true
        } else {
            false
        }
    }

    /// Lower bound of the next log request
    ///
    /// The boundary revision is requested again and skipped by the caller.
    pub fn poll_start(&self) -> RevisionRef {
        RevisionRef::Number(self.0.max(0))
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
