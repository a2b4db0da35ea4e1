//! Size + SHA-256 comparison between a remote asset and a local file.

use std::path::Path;

use sha2::{Digest, Sha256};

use crate::catalog::{CatalogApi, CatalogError, RemoteAsset};

use super::error::SyncError;

/// Whether `remote` already holds the same bytes as `local_path`.
///
/// Sizes are compared first; the remote content is only downloaded and
/// hashed when they agree. An asset without a reported size never matches.
pub async fn files_match(
    catalog: &dyn CatalogApi,
    remote: &RemoteAsset,
    local_path: &Path,
) -> Result<bool, SyncError> {
    let local_len = tokio::fs::metadata(local_path)
        .await
        .map_err(SyncError::local_io(local_path))?
        .len();

    if remote.size != Some(local_len) {
        tracing::debug!(
            remote_size = ?remote.size,
            local_size = local_len,
            "{} differs by size",
            remote.name
        );
        return Ok(false);
    }

    let url = remote.content_url().ok_or_else(|| {
        CatalogError::malformed(format!("asset {}", remote.id), "no content URL to compare")
    })?;
    let content = catalog.fetch_content(url).await?;
    let remote_digest = Sha256::digest(&content).to_vec();
    let local_digest = sha256_file(local_path).await?;

    let same = remote_digest == local_digest;
    tracing::debug!(
        remote = %hex(&remote_digest),
        local = %hex(&local_digest),
        same,
        "{} compared by hash",
        remote.name
    );
    Ok(same)
}

/// SHA-256 of a local file, streamed on the blocking pool.
pub async fn sha256_file(path: &Path) -> Result<Vec<u8>, SyncError> {
    let owned = path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let mut file = std::fs::File::open(&owned)?;
        let mut hasher = Sha256::new();
        std::io::copy(&mut file, &mut hasher)?;
        Ok::<_, std::io::Error>(hasher.finalize().to_vec())
    })
    .await?
    .map_err(SyncError::local_io(path))
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
