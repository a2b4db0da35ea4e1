//! Types for the state module.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::catalog::{AssetKind, RemoteAsset, Thing};

/// Everything a run remembers between invocations.
///
/// Asset maps are keyed by the local path exactly as the configuration lists
/// it. `BTreeMap` keeps the written document stable across runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    #[serde(default)]
    pub thing: Thing,
    #[serde(default)]
    pub files: BTreeMap<String, RemoteAsset>,
    #[serde(default)]
    pub images: BTreeMap<String, RemoteAsset>,
}

impl RunState {
    pub fn thing_id(&self) -> Option<u64> {
        self.thing.id
    }

    pub fn assets(&self, kind: AssetKind) -> &BTreeMap<String, RemoteAsset> {
        match kind {
            AssetKind::File => &self.files,
            AssetKind::Image => &self.images,
        }
    }

    /// Record `remote` as the current remote copy of `local_path`.
    pub fn record(&mut self, kind: AssetKind, local_path: &str, remote: RemoteAsset) {
        let map = match kind {
            AssetKind::File => &mut self.files,
            AssetKind::Image => &mut self.images,
        };
        map.insert(local_path.to_string(), remote);
    }

    /// Drop entries for paths no longer configured. Returns how many went.
    pub fn retain_configured(&mut self, files: &[String], images: &[String]) -> usize {
        let before = self.files.len() + self.images.len();
        self.files.retain(|path, _| files.contains(path));
        self.images.retain(|path, _| images.contains(path));
        before - (self.files.len() + self.images.len())
    }

    /// Remote id last recorded for `local_path`, if any.
    pub fn remote_id(&self, kind: AssetKind, local_path: &str) -> Option<u64> {
        self.assets(kind).get(local_path).map(|a| a.id)
    }
}
