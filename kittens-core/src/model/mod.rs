//! The reconciliation model
//!
//! [`Reconciler`] owns the cursor, the cached roster and recent revisions, and
//! is the only writer to the store. [`ModelActor`] drives it from a single
//! task: periodic polls, manual update requests and subscriber management all
//! arrive as commands, so subscribers always see a snapshot followed by every
//! later delta exactly once.

mod actor;
mod cursor;
mod reconciler;
mod registry;

pub use actor::{ModelActor, ModelHandle, ModelStatus, Subscription, UpdateStatus};
pub use cursor::Cursor;
pub use reconciler::{Phase, Reconciler, UpdateReport, fetch};
pub use registry::{Registry, SubscriberId};
