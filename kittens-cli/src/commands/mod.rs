pub mod config;
pub mod log;
pub mod rebuild;
pub mod serve;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use kittens_core::SqliteKittenStore;

use crate::config::RawKittensConfig;

/// Flags shared by every command that opens the store
#[derive(Debug, Clone, Default, Args)]
pub struct StoreArgs {
    /// Repository URL to follow
    #[arg(long, value_name = "URL")]
    pub source: Option<String>,

    /// SQLite database file
    #[arg(long, value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// First revision to ingest into an empty database
    #[arg(long, value_name = "REV")]
    pub earliest_revision: Option<i64>,
}

impl StoreArgs {
    /// Write the flags that were given into a config overlay
    pub fn apply(&self, raw: &mut RawKittensConfig) {
        raw.source.url = self.source.clone().or(raw.source.url.take());
        raw.store.path = self.db.clone().or(raw.store.path.take());
        raw.model.earliest_revision = self.earliest_revision.or(raw.model.earliest_revision);
    }
}

fn open_store(path: &std::path::Path) -> Result<Arc<SqliteKittenStore>> {
    let store = SqliteKittenStore::open(path)
        .with_context(|| format!("Failed to open database {}", path.display()))?;
    Ok(Arc::new(store))
}
