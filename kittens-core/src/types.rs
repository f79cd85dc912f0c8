//! Domain types shared by the model, the store and the wire protocol

use serde::{Deserialize, Serialize};

/// A single revision as reported by the revision source
///
/// Revisions are immutable once persisted; identity is [`Revision::id`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    pub id: i64,
    pub comment: String,
    pub date: String,
    pub author: String,
    #[serde(default)]
    pub paths: Vec<String>,
}

impl Revision {
    pub fn new(
        id: i64,
        author: impl Into<String>,
        comment: impl Into<String>,
        date: impl Into<String>,
    ) -> Self {
        Self {
            id,
            comment: comment.into(),
            date: date.into(),
            author: author.into(),
            paths: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_paths(mut self, paths: Vec<String>) -> Self {
        self.paths = paths;
        self
    }
}

/// A tracked contributor and the revisions credited to them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contributor {
    pub email: String,
    pub name: String,
    /// Attributed revision ids, ascending
    #[serde(default)]
    pub revisions: Vec<i64>,
}

impl Contributor {
    pub fn new(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
            revisions: Vec::new(),
        }
    }
}

/// Delta published once per newly persisted revision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    pub revision: Revision,
    #[serde(rename = "attributedContributors")]
    pub attributed_contributors: Vec<String>,
}

/// Full model state handed to a subscriber when it joins
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Most recent revisions, id descending
    pub revisions: Vec<Revision>,
    pub contributors: Vec<Contributor>,
    pub version: String,
}
