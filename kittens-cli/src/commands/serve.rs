//! Kittens serve command
//!
//! Loads the model (seeding the roster and catching up with the repository),
//! then serves subscribers until ctrl-c.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use kittens_core::{ModelActor, Reconciler, RevisionSource, SvnClient};
use kittens_server::{AppState, KittensServer};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::{StoreArgs, open_store};
use crate::config::{ConfigLoader, RawKittensConfig};

/// Arguments for the serve command
#[derive(Debug, Args)]
pub struct ServeArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Seconds between polls of the repository
    #[arg(long, value_name = "SECS")]
    pub poll_interval: Option<u64>,

    /// Re-derive every attribution link before serving
    #[arg(long)]
    pub rebuild: bool,

    /// Repository answering /api/log (defaults to --source)
    #[arg(long, value_name = "URL")]
    pub log_source: Option<String>,

    /// Directory of static files to serve
    #[arg(long, value_name = "DIR")]
    pub public_dir: Option<PathBuf>,
}

impl ServeArgs {
    fn overrides(&self) -> RawKittensConfig {
        let mut raw = RawKittensConfig::default();
        self.store.apply(&mut raw);
        raw.server.port = self.port;
        raw.server.host = self.host.clone();
        raw.server.public_dir = self.public_dir.clone();
        raw.model.poll_interval_secs = self.poll_interval;
        raw.model.rebuild_on_start = self.rebuild.then_some(true);
        raw.log_source.url = self.log_source.clone();
        raw
    }
}

/// Run the server in the foreground
pub async fn run(args: ServeArgs) -> Result<()> {
    let config = ConfigLoader::load_with(args.overrides())?;
    info!(
        source = %config.source.url,
        db = %config.store.path.display(),
        contributors = config.contributors.len(),
        "Starting kittens"
    );

    let store = open_store(&config.store.path)?;
    let source = Arc::new(SvnClient::with_timeout(
        &config.source.url,
        config.source.timeout(),
    )?);
    let log_source: Arc<dyn RevisionSource> = if config.has_separate_log_source() {
        info!(url = %config.log_source.url, "Using separate log source");
        Arc::new(SvnClient::with_timeout(
            &config.log_source.url,
            config.log_source.timeout(),
        )?)
    } else {
        source.clone()
    };

    let model_config = config.model_config();
    let poll_interval = model_config.poll_interval;
    let reconciler = Reconciler::load(model_config, store, source).await?;

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received ctrl-c, shutting down");
            signal.cancel();
        }
    });

    let (model, model_task) = ModelActor::spawn(reconciler, poll_interval, shutdown.clone());
    let state = Arc::new(AppState::new(model, log_source));
    let result = KittensServer::new(config.server_config(), state)
        .run(shutdown.clone())
        .await;

    shutdown.cancel();
    if let Err(e) = model_task.await {
        error!("Model task failed: {}", e);
    }

    result.map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> ServeArgs {
        ServeArgs {
            store: StoreArgs::default(),
            port: None,
            host: None,
            poll_interval: None,
            rebuild: false,
            log_source: None,
            public_dir: None,
        }
    }

    #[test]
    fn test_overrides_leave_unset_flags_empty() {
        let raw = args().overrides();
        assert!(raw.server.port.is_none());
        assert!(raw.model.rebuild_on_start.is_none());
        assert!(raw.source.url.is_none());
    }

    #[test]
    fn test_overrides_carry_flags() {
        let mut args = args();
        args.port = Some(7000);
        args.rebuild = true;
        args.store.db = Some(PathBuf::from("webkit.sqlite"));
        args.log_source = Some("http://src.chromium.org/svn/trunk".to_string());

        let raw = args.overrides();
        assert_eq!(raw.server.port, Some(7000));
        assert_eq!(raw.model.rebuild_on_start, Some(true));
        assert_eq!(raw.store.path, Some(PathBuf::from("webkit.sqlite")));
        assert_eq!(
            raw.log_source.url.as_deref(),
            Some("http://src.chromium.org/svn/trunk")
        );
    }
}
