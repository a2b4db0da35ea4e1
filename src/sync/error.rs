use std::path::PathBuf;

use thiserror::Error;

use crate::catalog::{AssetKind, CatalogError};
use crate::state::StateError;

/// Everything that can stop a sync run. All variants are fatal.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A catalog or storage call failed (transport error or non-2xx).
    #[error("Network error: {0}")]
    Network(#[from] CatalogError),

    /// More than one remote asset of one kind shares a filename.
    #[error(
        "{count} remote {kind}s named '{name}' exist on thing {thing_id}; \
         delete the extras on the catalog and run again"
    )]
    DuplicateAsset {
        thing_id: u64,
        kind: AssetKind,
        name: String,
        count: usize,
    },

    /// More than one remote thing owned by the account shares a name.
    #[error(
        "{count} things named '{name}' exist on the account; \
         delete or rename the extras on the catalog and run again"
    )]
    DuplicateEntry { name: String, count: usize },

    #[error("Cannot read local asset {path}: {source}")]
    LocalIo {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    State(#[from] StateError),

    #[error("Hashing task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl SyncError {
    pub(crate) fn local_io(path: &std::path::Path) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.to_path_buf();
        move |source| SyncError::LocalIo { path, source }
    }
}
