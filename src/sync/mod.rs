//! Sync engine: resolves the remote thing, then walks every configured file
//! and image in order, skipping or replacing each one so repeated runs
//! converge on the same remote state.

mod asset;
pub mod error;
pub mod fingerprint;
pub mod locate;
mod thing;

pub use asset::AssetOutcome;
pub use error::SyncError;

use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::catalog::{CatalogApi, Thing};
use crate::state::{RunState, StateFile};

/// Immutable inputs for one run, built once from the configuration.
#[derive(Debug, Clone)]
pub struct SyncContext {
    pub username: String,
    /// Directory configured asset paths are relative to.
    pub root: PathBuf,
    /// Thing payload, description included.
    pub thing: Thing,
    pub files: Vec<String>,
    pub images: Vec<String>,
    pub no_progress_bar: bool,
}

impl SyncContext {
    pub fn local_path(&self, configured: &str) -> PathBuf {
        self.root.join(configured)
    }
}

/// Counters reported at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub thing_id: u64,
    pub uploaded: usize,
    pub replaced: usize,
    pub skipped: usize,
    pub elapsed: Duration,
}

impl SyncReport {
    fn note(&mut self, outcome: AssetOutcome) {
        match outcome {
            AssetOutcome::Uploaded => self.uploaded += 1,
            AssetOutcome::Replaced => self.replaced += 1,
            AssetOutcome::Skipped => self.skipped += 1,
        }
    }

    pub fn log_summary(&self) {
        tracing::info!("── Summary ──");
        tracing::info!("  thing: {}", self.thing_id);
        tracing::info!(
            "  {} uploaded, {} replaced, {} unchanged",
            self.uploaded,
            self.replaced,
            self.skipped
        );
        tracing::info!("  elapsed: {}", format_duration(self.elapsed));
    }
}

/// Drives one run against a catalog, mutating `state` as each step lands.
pub struct Synchronizer<'a> {
    catalog: &'a dyn CatalogApi,
    ctx: &'a SyncContext,
    state: &'a mut RunState,
    checkpoint: Option<&'a StateFile>,
}

impl<'a> Synchronizer<'a> {
    pub fn new(catalog: &'a dyn CatalogApi, ctx: &'a SyncContext, state: &'a mut RunState) -> Self {
        Self {
            catalog,
            ctx,
            state,
            checkpoint: None,
        }
    }

    /// Persist the state to `store` after every successful mutation instead
    /// of leaving it to the caller at the end of the run.
    pub fn with_checkpoint(mut self, store: &'a StateFile) -> Self {
        self.checkpoint = Some(store);
        self
    }

    async fn checkpoint(&self) -> Result<(), SyncError> {
        if let Some(store) = self.checkpoint {
            store.save(self.state).await?;
        }
        Ok(())
    }

    /// Sync the thing record, then every file, then every image.
    ///
    /// Stops at the first error; the state keeps whatever completed before it.
    pub async fn run(&mut self) -> Result<SyncReport, SyncError> {
        let started = std::time::Instant::now();
        let ctx = self.ctx;

        let thing_id = self.sync_thing().await?;
        let mut report = SyncReport {
            thing_id,
            ..Default::default()
        };

        let total = (ctx.files.len() + ctx.images.len()) as u64;
        let pb = create_progress_bar(ctx.no_progress_bar, total);

        for path in &ctx.files {
            pb.set_message(path.clone());
            let synced = match self.sync_file(thing_id, path).await {
                Ok(s) => s,
                Err(e) => {
                    pb.abandon();
                    return Err(e);
                }
            };
            pb.suspend(|| synced.log(path));
            report.note(synced.outcome);
            pb.inc(1);
        }

        for path in &ctx.images {
            pb.set_message(path.clone());
            let synced = match self.sync_image(thing_id, path).await {
                Ok(s) => s,
                Err(e) => {
                    pb.abandon();
                    return Err(e);
                }
            };
            pb.suspend(|| synced.log(path));
            report.note(synced.outcome);
            pb.inc(1);
        }

        pb.finish_and_clear();

        let dropped = self.state.retain_configured(&ctx.files, &ctx.images);
        if dropped > 0 {
            tracing::debug!(dropped, "Forgot state for assets no longer configured");
            self.checkpoint().await?;
        }
        report.elapsed = started.elapsed();
        Ok(report)
    }
}

/// Progress bar over the configured assets; hidden when disabled or when
/// stdout is not a terminal.
fn create_progress_bar(no_progress_bar: bool, total: u64) -> ProgressBar {
    if no_progress_bar || !std::io::stdout().is_terminal() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(total);
    let style = ProgressStyle::with_template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .map(|s| s.progress_chars("=> "))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb
}

fn format_duration(d: Duration) -> String {
    let total_secs = d.as_secs();
    let hours = total_secs / 3600;
    let mins = (total_secs % 3600) / 60;
    let secs = total_secs % 60;

    if hours > 0 {
        format!("{}h {:02}m {:02}s", hours, mins, secs)
    } else if mins > 0 {
        format!("{}m {:02}s", mins, secs)
    } else {
        format!("{}s", secs)
    }
}
