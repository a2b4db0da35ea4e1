//! Finding the remote copy of a local asset by filename.

use std::path::Path;

use crate::catalog::{AssetKind, CatalogApi, RemoteAsset};

use super::error::SyncError;

/// Result of probing both remote namespaces for a filename.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteMatch {
    None,
    File(RemoteAsset),
    Image(RemoteAsset),
}

/// Base filename the catalog stores `local_path` under.
pub fn remote_name(local_path: &str) -> String {
    Path::new(local_path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(local_path)
        .to_string()
}

/// Look up the single remote asset of `kind` named like `local_path`.
pub async fn locate(
    catalog: &dyn CatalogApi,
    thing_id: u64,
    kind: AssetKind,
    local_path: &str,
) -> Result<Option<RemoteAsset>, SyncError> {
    let name = remote_name(local_path);
    let mut matches: Vec<RemoteAsset> = catalog
        .list_assets(thing_id, kind)
        .await?
        .into_iter()
        .filter(|asset| asset.name == name)
        .collect();

    match matches.len() {
        0 => Ok(None),
        1 => Ok(matches.pop()),
        count => Err(SyncError::DuplicateAsset {
            thing_id,
            kind,
            name,
            count,
        }),
    }
}

/// Probe files first, then images. Files and images share one filename
/// namespace on the catalog.
pub async fn locate_any(
    catalog: &dyn CatalogApi,
    thing_id: u64,
    local_path: &str,
) -> Result<RemoteMatch, SyncError> {
    if let Some(asset) = locate(catalog, thing_id, AssetKind::File, local_path).await? {
        return Ok(RemoteMatch::File(asset));
    }
    Ok(
        match locate(catalog, thing_id, AssetKind::Image, local_path).await? {
            Some(asset) => RemoteMatch::Image(asset),
            None => RemoteMatch::None,
        },
    )
}
