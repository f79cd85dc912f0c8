//! kittens-core: Core library for the kittens commit tracker
//!
//! This crate provides the reconciliation engine that follows a Subversion
//! repository and credits each new revision to a fixed roster of contributors:
//!
//! - **Revision sources** - [`RevisionSource`] trait with the [`SvnClient`] DAV client
//!   and a scriptable [`MockSource`]
//! - **Attribution** - [`Attributor`] matches revisions to contributors
//! - **Storage** - [`KittenStore`] trait and [`SqliteKittenStore`]
//! - **Model** - [`Reconciler`] for a single poll cycle and [`ModelActor`] which
//!   owns the subscriber [`Registry`] and drives updates on a timer
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use kittens_core::{ModelActor, ModelConfig, Reconciler, SqliteKittenStore, SvnClient};
//! use tokio_util::sync::CancellationToken;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(SqliteKittenStore::open("kittens.sqlite")?);
//!     let source = Arc::new(SvnClient::new("http://svn.webkit.org/repository/webkit/trunk")?);
//!
//!     let config = ModelConfig::default();
//!     let poll_interval = config.poll_interval;
//!     let reconciler = Reconciler::load(config, store, source).await?;
//!     let (handle, _task) = ModelActor::spawn(reconciler, poll_interval, CancellationToken::new());
//!
//!     let subscription = handle.subscribe().await?;
//!     println!("{} revisions cached", subscription.snapshot.revisions.len());
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌────────────┐  Subscribe / Update  ┌──────────────────────────────┐
//! │ ModelHandle│ ───────────────────▶ │          ModelActor          │
//! └────────────┘                      │  ┌────────────┐ ┌──────────┐ │
//!                                     │  │ Reconciler │ │ Registry │ │
//!                                     │  └─────┬──────┘ └────┬─────┘ │
//!                                     └────────┼─────────────┼───────┘
//!                                   poll/store │             │ Change
//!                                              ▼             ▼
//!                                 RevisionSource,      subscribers
//!                                 KittenStore
//! ```

pub mod attribution;
pub mod config;
pub mod error;
pub mod model;
pub mod source;
pub mod store;
pub mod types;

pub use attribution::Attributor;
pub use config::{ContributorConfig, ModelConfig, default_roster};
pub use error::{ConfigError, KittensError, ModelError, SourceError, UpdateFailure};
pub use model::{
    Cursor, ModelActor, ModelHandle, ModelStatus, Phase, Reconciler, Registry, SubscriberId,
    Subscription, UpdateReport, UpdateStatus,
};
pub use source::{LogLimit, MockSource, RevisionRef, RevisionSource, SvnClient};
pub use store::{KittenStore, RebuildReport, SqliteKittenStore, StoreError};
pub use types::{Change, Contributor, Revision, Snapshot};
