use clap::Parser;

use crate::types::LogLevel;

#[derive(Parser, Debug)]
#[command(
    name = "thingsync",
    version,
    about = "Sync a local thing project with its remote catalog entry"
)]
pub struct Cli {
    /// Catalog API token (overrides the config files).
    /// WARNING: passing via --token is visible in process listings.
    /// Prefer the THINGSYNC_TOKEN environment variable instead.
    #[arg(short = 't', long, env = "THINGSYNC_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Catalog account that owns the thing (overrides the config files)
    #[arg(short = 'u', long)]
    pub username: Option<String>,

    /// Project directory holding thingsync.json and the assets
    #[arg(short = 'C', long, default_value = ".")]
    pub directory: String,

    /// Shorthand for --log-level debug
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Save the run state after every change instead of only at the end
    #[arg(long)]
    pub checkpoint: bool,

    /// Disable progress bar
    #[arg(long)]
    pub no_progress_bar: bool,
}

impl Cli {
    /// Log level after applying `--verbose`.
    pub fn effective_log_level(&self) -> LogLevel {
        if self.verbose {
            LogLevel::Debug
        } else {
            self.log_level
        }
    }
}
