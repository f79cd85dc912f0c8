//! Persistence of revisions, contributors and attribution links in SQLite

mod error;
mod kitten_store;
mod migrations;

pub use error::StoreError;
pub use kitten_store::{KittenStore, RebuildReport, SqliteKittenStore};
