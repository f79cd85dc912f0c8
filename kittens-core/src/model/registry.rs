//! Live subscriber registry
//!
//! The registry is owned by the model actor, so registration and delivery are
//! never interleaved. Each subscriber gets its own queue, drained by its
//! connection task at whatever pace the client reads. A subscriber whose
//! receiver is gone is dropped on the next publish without affecting the
//! others.

use std::collections::HashMap;
use std::fmt;

use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use crate::types::Change;

/// Opaque handle for a registered subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Subscribers currently receiving changes
pub struct Registry {
    subscribers: HashMap<SubscriberId, mpsc::UnboundedSender<Change>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            subscribers: HashMap::new(),
        }
    }

    /// Add a subscriber, returning its id and the receiving end of its channel
    pub fn register(&mut self) -> (SubscriberId, mpsc::UnboundedReceiver<Change>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = SubscriberId::new();
        self.subscribers.insert(id, tx);
        debug!(subscriber = %id, total = self.subscribers.len(), "Subscriber registered");
        (id, rx)
    }

    /// Remove a subscriber; returns false if it was already gone
    pub fn unregister(&mut self, id: SubscriberId) -> bool {
        let removed = self.subscribers.remove(&id).is_some();
        if removed {
            debug!(subscriber = %id, total = self.subscribers.len(), "Subscriber removed");
        }
        removed
    }

    /// Deliver `change` to every live subscriber, returning how many accepted it
    pub fn publish(&mut self, change: &Change) -> usize {
        self.subscribers.retain(|id, tx| {
            let open = tx.send(change.clone()).is_ok();
            if !open {
                debug!(subscriber = %id, "Subscriber channel closed");
            }
            open
        });
        self.subscribers.len()
    }

    pub fn contains(&self, id: SubscriberId) -> bool {
        self.subscribers.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
