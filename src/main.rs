//! thingsync: keeps a local thing project in step with its remote catalog
//! entry.
//!
//! Each run creates or patches the catalog record, then walks the configured
//! files and images, replacing only those whose remote copy differs. Remote
//! ids are remembered in `.thingsync-state.json` so later runs converge
//! without re-uploading.

#![warn(clippy::all)]

mod catalog;
mod cli;
mod config;
mod state;
mod sync;
#[cfg(test)]
mod testutil;
mod types;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use catalog::HttpCatalog;
use config::Config;
use state::StateFile;
use sync::{SyncError, Synchronizer};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.effective_log_level().as_filter())),
        )
        .init();

    let config = Config::from_cli(&cli).context("Failed to load configuration")?;
    tracing::debug!(?config, "Loaded configuration");

    let store = StateFile::in_dir(&config.root);
    let lock = store.lock()?;
    tracing::debug!("Holding run lock {}", lock.path().display());
    let mut state = store.load().await?;

    let catalog = HttpCatalog::new(&config.api_url, &config.token)
        .context("Failed to build catalog client")?;
    let ctx = config.to_context();

    let mut synchronizer = Synchronizer::new(&catalog, &ctx, &mut state);
    if config.checkpoint {
        synchronizer = synchronizer.with_checkpoint(&store);
    }

    let report = match synchronizer.run().await {
        Ok(report) => report,
        Err(SyncError::Network(e)) => {
            tracing::error!(status = ?e.status(), "{e}; run state not saved");
            eprintln!("Error: catalog request failed: {e}");
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };

    store
        .save(&state)
        .await
        .with_context(|| format!("Failed to save {}", store.path().display()))?;
    report.log_summary();
    Ok(())
}
