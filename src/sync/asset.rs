//! Per-asset sync: decide skip vs replace, then run the upload handshake.

use std::io;
use std::path::Path;

use chrono::{DateTime, Utc};

use crate::catalog::{AssetKind, RemoteAsset};

use super::error::SyncError;
use super::fingerprint::files_match;
use super::locate::{locate_any, remote_name, RemoteMatch};
use super::Synchronizer;

/// What happened to one asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetOutcome {
    /// Nothing existed remotely; uploaded fresh.
    Uploaded,
    /// A stale remote copy was deleted and the local one uploaded.
    Replaced,
    /// Remote copy already current.
    Skipped,
}

/// Outcome plus the remote metadata now associated with the asset.
#[derive(Debug, Clone)]
pub struct SyncedAsset {
    pub outcome: AssetOutcome,
    pub remote: RemoteAsset,
}

impl SyncedAsset {
    pub(super) fn log(&self, path: &str) {
        match self.outcome {
            AssetOutcome::Uploaded => {
                tracing::info!(id = self.remote.id, "Uploaded {}", path)
            }
            AssetOutcome::Replaced => {
                tracing::info!(id = self.remote.id, "Replaced {}", path)
            }
            AssetOutcome::Skipped => tracing::info!("{} is up to date", path),
        }
    }
}

impl Synchronizer<'_> {
    /// Sync one configured file by content.
    pub async fn sync_file(&mut self, thing_id: u64, path: &str) -> Result<SyncedAsset, SyncError> {
        let local = self.ctx.local_path(path);
        tokio::fs::metadata(&local)
            .await
            .map_err(SyncError::local_io(&local))?;

        let (kind, existing) = match locate_any(self.catalog, thing_id, path).await? {
            RemoteMatch::None => (AssetKind::File, None),
            RemoteMatch::File(asset) => (AssetKind::File, Some(asset)),
            RemoteMatch::Image(asset) => (AssetKind::Image, Some(asset)),
        };

        let Some(existing) = existing else {
            let remote = self.upload(thing_id, AssetKind::File, path).await?;
            return Ok(SyncedAsset {
                outcome: AssetOutcome::Uploaded,
                remote,
            });
        };

        if files_match(self.catalog, &existing, &local).await? {
            if self.state.files.get(path) != Some(&existing) {
                self.state.record(AssetKind::File, path, existing.clone());
                self.checkpoint().await?;
            }
            return Ok(SyncedAsset {
                outcome: AssetOutcome::Skipped,
                remote: existing,
            });
        }

        tracing::debug!(id = existing.id, %kind, "Deleting stale remote copy of {}", path);
        self.catalog.delete_asset(thing_id, kind, existing.id).await?;
        let remote = self.upload(thing_id, AssetKind::File, path).await?;
        Ok(SyncedAsset {
            outcome: AssetOutcome::Replaced,
            remote,
        })
    }

    /// Sync one configured image by timestamp.
    ///
    /// Only the remote id recorded by a previous run is consulted. An image
    /// uploaded by some other means under the same name is not detected and
    /// will be uploaded alongside it.
    pub async fn sync_image(
        &mut self,
        thing_id: u64,
        path: &str,
    ) -> Result<SyncedAsset, SyncError> {
        let local = self.ctx.local_path(path);
        let metadata = tokio::fs::metadata(&local)
            .await
            .map_err(SyncError::local_io(&local))?;

        let Some(image_id) = self.state.remote_id(AssetKind::Image, path) else {
            let remote = self.upload(thing_id, AssetKind::Image, path).await?;
            return Ok(SyncedAsset {
                outcome: AssetOutcome::Uploaded,
                remote,
            });
        };

        let existing = self.catalog.get_image(thing_id, image_id).await?;
        let modified: DateTime<Utc> = metadata
            .modified()
            .map_err(SyncError::local_io(&local))?
            .into();

        let stale = match existing.added_at() {
            Some(added) => modified > added,
            None => {
                tracing::warn!(
                    id = image_id,
                    added = ?existing.added,
                    "Remote image has no usable timestamp, replacing {}",
                    path
                );
                true
            }
        };

        if !stale {
            return Ok(SyncedAsset {
                outcome: AssetOutcome::Skipped,
                remote: existing,
            });
        }

        tracing::debug!(id = image_id, "Local {} is newer than remote", path);
        self.catalog
            .delete_asset(thing_id, AssetKind::Image, image_id)
            .await?;
        let remote = self.upload(thing_id, AssetKind::Image, path).await?;
        Ok(SyncedAsset {
            outcome: AssetOutcome::Replaced,
            remote,
        })
    }

    /// Slot → storage POST → finalize, then record the finalize response.
    async fn upload(
        &mut self,
        thing_id: u64,
        kind: AssetKind,
        path: &str,
    ) -> Result<RemoteAsset, SyncError> {
        let local = self.ctx.local_path(path);
        let filename = remote_name(path);
        let (file, len) = open_regular(&local).await?;

        let slot = self.catalog.request_upload(thing_id, &filename).await?;
        self.catalog.submit_upload(&slot, &filename, file, len).await?;
        let remote = self.catalog.finalize_upload(&slot).await?;

        self.state.record(kind, path, remote.clone());
        self.checkpoint().await?;
        Ok(remote)
    }
}

/// Open `path` for upload. Only regular files are accepted.
async fn open_regular(path: &Path) -> Result<(tokio::fs::File, u64), SyncError> {
    let file = tokio::fs::File::open(path)
        .await
        .map_err(SyncError::local_io(path))?;
    let metadata = file.metadata().await.map_err(SyncError::local_io(path))?;
    if !metadata.is_file() {
        return Err(SyncError::local_io(path)(io::Error::new(
            io::ErrorKind::InvalidInput,
            "not a regular file",
        )));
    }
    Ok((file, metadata.len()))
}
