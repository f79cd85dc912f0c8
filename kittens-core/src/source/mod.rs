//! Revision sources the model polls for new revisions

mod mock;
mod svn;

use std::fmt;

use async_trait::async_trait;

use crate::error::SourceError;
use crate::types::Revision;

pub use mock::MockSource;
pub use svn::{SvnClient, parse_log_report};

/// Revision number sent to the source for `HEAD`
pub const REV_HEAD: i64 = -1;
/// Revision number sent to the source for the first revision
pub const REV_FIRST: i64 = 0;

/// One end of a log range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevisionRef {
    Head,
    First,
    Number(i64),
}

impl RevisionRef {
    /// Interpret a raw number, mapping the sentinel values
    pub fn from_raw(value: i64) -> Self {
        match value {
            REV_HEAD => RevisionRef::Head,
            REV_FIRST => RevisionRef::First,
            n => RevisionRef::Number(n),
        }
    }

    pub fn as_raw(&self) -> i64 {
        match self {
            RevisionRef::Head => REV_HEAD,
            RevisionRef::First => REV_FIRST,
            RevisionRef::Number(n) => *n,
        }
    }
}

impl fmt::Display for RevisionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RevisionRef::Head => write!(f, "HEAD"),
            RevisionRef::First => write!(f, "FIRST"),
            RevisionRef::Number(n) => write!(f, "r{n}"),
        }
    }
}

/// Maximum number of entries a log request returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLimit {
    Unbounded,
    Max(u64),
}

impl LogLimit {
    /// Zero and negative values mean no limit, as they do for Subversion
    pub fn from_raw(value: i64) -> Self {
        match u64::try_from(value) {
            Ok(n) if n > 0 => LogLimit::Max(n),
            _ => LogLimit::Unbounded,
        }
    }
}

/// The contract the model needs from a remote revision log
///
/// `log` returns revisions in the source's natural order for the range, which
/// is descending when `start` is newer than `end`.
#[async_trait]
pub trait RevisionSource: Send + Sync {
    /// The newest revision in the repository
    async fn head(&self) -> Result<Revision, SourceError>;

    /// Revisions between `start` and `end`, both inclusive
    async fn log(
        &self,
        start: RevisionRef,
        end: RevisionRef,
        limit: LogLimit,
    ) -> Result<Vec<Revision>, SourceError>;
}
