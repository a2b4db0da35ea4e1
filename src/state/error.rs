//! Error types for the state module.

use std::path::PathBuf;

use thiserror::Error;

/// Errors reading, writing or locking the run state file.
#[derive(Error, Debug)]
pub enum StateError {
    /// The file exists but could not be read.
    #[error("Failed to read state file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The file is not a valid state document.
    #[error("State file {path} is malformed: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to write state file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to serialize run state: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Another run holds the lock for this project.
    #[error("Another thingsync run is active for this project (lock: {path})")]
    Locked { path: PathBuf },

    #[error("Failed to create lock file {path}: {source}")]
    Lock {
        path: PathBuf,
        source: std::io::Error,
    },
}
