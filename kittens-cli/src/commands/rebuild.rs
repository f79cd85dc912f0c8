//! Kittens rebuild command
//!
//! Re-scans every stored revision against the configured roster and adds the
//! attribution links that are missing. Unless `--offline` is given the store is
//! also brought up to the repository head first.

use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use kittens_core::{
    Attributor, KittenStore, ModelConfig, RebuildReport, Reconciler, SvnClient,
};
use tracing::info;

use super::{StoreArgs, open_store};
use crate::config::{ConfigLoader, RawKittensConfig};

/// Arguments for the rebuild command
#[derive(Debug, Args)]
pub struct RebuildArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Only re-attribute stored revisions, without contacting the repository
    #[arg(long)]
    pub offline: bool,
}

pub async fn run(args: RebuildArgs) -> Result<()> {
    let mut raw = RawKittensConfig::default();
    args.store.apply(&mut raw);
    let config = ConfigLoader::load_with(raw)?;
    let store = open_store(&config.store.path)?;

    if args.offline {
        let report = rebuild_offline(&*store, &config.model_config())?;
        print_report(&report);
        return Ok(());
    }

    let source = Arc::new(SvnClient::with_timeout(
        &config.source.url,
        config.source.timeout(),
    )?);
    let model_config = config.model_config().with_rebuild_on_start(true);
    let reconciler = Reconciler::load(model_config, store.clone(), source).await?;

    println!(
        "Database at r{} with {} revisions and {} attribution links",
        reconciler.cursor(),
        store.revision_count()?,
        store.attribution_links()?.len()
    );
    Ok(())
}

/// Seed the roster and re-derive attribution links from stored revisions only
pub fn rebuild_offline(store: &dyn KittenStore, config: &ModelConfig) -> Result<RebuildReport> {
    config.validate()?;
    for contributor in &config.roster {
        store.upsert_contributor(contributor.email.trim(), &contributor.name)?;
    }

    let report = store.rebuild_attributions(&Attributor::new()?)?;
    info!(
        scanned = report.revisions_scanned,
        added = report.links_added,
        "Rebuilt attributions"
    );
    Ok(report)
}

fn print_report(report: &RebuildReport) {
    println!("Scanned {} revisions", report.revisions_scanned);
    println!(
        "Added {} attribution links ({} total)",
        report.links_added, report.links_total
    );
}
