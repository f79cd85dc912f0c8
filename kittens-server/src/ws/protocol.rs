//! Frames sent to `/atl/str` subscribers

use kittens_core::{Change, Contributor, Revision, Snapshot};
use serde::{Deserialize, Serialize};

/// Messages sent from server to subscriber
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// First frame on every connection: the current model snapshot
    Connect {
        revisions: Vec<Revision>,
        contributors: Vec<Contributor>,
        version: String,
    },

    /// One newly recorded revision
    Change {
        revision: Revision,
        #[serde(rename = "attributedContributors")]
        attributed_contributors: Vec<String>,
    },
}

impl From<Snapshot> for ServerMessage {
    fn from(snapshot: Snapshot) -> Self {
        ServerMessage::Connect {
            revisions: snapshot.revisions,
            contributors: snapshot.contributors,
            version: snapshot.version,
        }
    }
}

impl From<Change> for ServerMessage {
    fn from(change: Change) -> Self {
        ServerMessage::Change {
            revision: change.revision,
            attributed_contributors: change.attributed_contributors,
        }
    }
}
