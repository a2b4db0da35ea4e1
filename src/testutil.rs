//! Shared test fixtures: an in-memory catalog and small filesystem helpers.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use bytes::Bytes;
use serde_json::{json, Map, Value};

use crate::catalog::types::COMPLETION_FIELD;
use crate::catalog::{AssetKind, CatalogApi, CatalogError, RemoteAsset, Thing, UploadSlot};
use crate::sync::SyncContext;

/// One recorded catalog call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListThings(String),
    CreateThing(String),
    UpdateThing(u64),
    ListAssets(u64, AssetKind),
    DeleteAsset(u64, AssetKind, u64),
    GetImage(u64, u64),
    FetchContent(String),
    RequestUpload(u64, String),
    SubmitUpload(String),
    FinalizeUpload(String),
}

impl Call {
    fn is_mutation(&self) -> bool {
        matches!(
            self,
            Call::CreateThing(_)
                | Call::UpdateThing(_)
                | Call::DeleteAsset(..)
                | Call::RequestUpload(..)
                | Call::SubmitUpload(_)
                | Call::FinalizeUpload(_)
        )
    }
}

#[derive(Default)]
struct Inner {
    things: Vec<Thing>,
    assets: HashMap<(u64, AssetKind), Vec<RemoteAsset>>,
    content: HashMap<String, Vec<u8>>,
    /// Slot action URL -> (thing id, filename, submitted bytes).
    pending: HashMap<String, (u64, String, Option<Vec<u8>>)>,
    calls: Vec<Call>,
    failures: HashMap<&'static str, usize>,
    seen: HashMap<&'static str, usize>,
    last_finalized: Option<RemoteAsset>,
    next_id: u64,
}

/// In-memory [`CatalogApi`] that records every call.
///
/// `fail_on(op)` makes the named trait method return HTTP 500.
pub struct FakeCatalog {
    inner: Mutex<Inner>,
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                next_id: 1000,
                ..Default::default()
            }),
        }
    }

    pub fn add_thing(&self, id: u64, name: &str) {
        self.inner.lock().unwrap().things.push(Thing {
            id: Some(id),
            name: name.to_string(),
            ..Default::default()
        });
    }

    pub fn thing(&self, id: u64) -> Option<Thing> {
        let inner = self.inner.lock().unwrap();
        inner.things.iter().find(|t| t.id == Some(id)).cloned()
    }

    /// Seed a remote asset. With `content`, a download URL serving it is set.
    pub fn add_remote(
        &self,
        thing_id: u64,
        kind: AssetKind,
        mut asset: RemoteAsset,
        content: Option<&[u8]>,
    ) -> RemoteAsset {
        let mut inner = self.inner.lock().unwrap();
        if let Some(bytes) = content {
            let url = format!("https://cdn.test/{}", asset.id);
            inner.content.insert(url.clone(), bytes.to_vec());
            asset.download_url = Some(url);
        }
        inner
            .assets
            .entry((thing_id, kind))
            .or_default()
            .push(asset.clone());
        asset
    }

    /// Fail every call to `op`.
    pub fn fail_on(&self, op: &'static str) {
        self.fail_on_nth(op, 1);
    }

    /// Fail calls to `op` from the `nth` (1-based) onwards.
    pub fn fail_on_nth(&self, op: &'static str, nth: usize) {
        self.inner.lock().unwrap().failures.insert(op, nth);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.inner.lock().unwrap().calls.clear();
    }

    pub fn mutations(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_mutation).collect()
    }

    pub fn downloads(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::FetchContent(_)))
            .count()
    }

    pub fn last_finalized(&self) -> Option<RemoteAsset> {
        self.inner.lock().unwrap().last_finalized.clone()
    }

    /// Record `call` and apply any configured failure for `op`.
    fn enter(&self, op: &'static str, call: Call) -> Result<(), CatalogError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(call);
        let seen = {
            let n = inner.seen.entry(op).or_insert(0);
            *n += 1;
            *n
        };
        match inner.failures.get(op) {
            Some(&nth) if seen >= nth => Err(CatalogError::Status {
                method: "POST",
                url: format!("https://api.test/{op}"),
                status: 500,
                body: "injected failure".into(),
            }),
            _ => Ok(()),
        }
    }

    fn next_id(inner: &mut Inner) -> u64 {
        inner.next_id += 1;
        inner.next_id
    }
}

fn is_image(filename: &str) -> bool {
    mime_guess::from_path(filename)
        .first()
        .is_some_and(|m| m.type_() == mime_guess::mime::IMAGE)
}

#[async_trait::async_trait]
impl CatalogApi for FakeCatalog {
    async fn list_user_things(&self, username: &str) -> Result<Vec<Thing>, CatalogError> {
        self.enter("list_user_things", Call::ListThings(username.to_string()))?;
        Ok(self.inner.lock().unwrap().things.clone())
    }

    async fn create_thing(&self, thing: &Thing) -> Result<Thing, CatalogError> {
        self.enter("create_thing", Call::CreateThing(thing.name.clone()))?;
        let mut inner = self.inner.lock().unwrap();
        let mut created = thing.payload();
        created.id = Some(Self::next_id(&mut inner));
        inner.things.push(created.clone());
        Ok(created)
    }

    async fn update_thing(&self, id: u64, thing: &Thing) -> Result<Thing, CatalogError> {
        self.enter("update_thing", Call::UpdateThing(id))?;
        let mut inner = self.inner.lock().unwrap();
        let mut updated = thing.payload();
        updated.id = Some(id);
        match inner.things.iter_mut().find(|t| t.id == Some(id)) {
            Some(existing) => *existing = updated.clone(),
            None => inner.things.push(updated.clone()),
        }
        Ok(updated)
    }

    async fn list_assets(
        &self,
        thing_id: u64,
        kind: AssetKind,
    ) -> Result<Vec<RemoteAsset>, CatalogError> {
        self.enter("list_assets", Call::ListAssets(thing_id, kind))?;
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .assets
            .get(&(thing_id, kind))
            .cloned()
            .unwrap_or_default())
    }

    async fn delete_asset(
        &self,
        thing_id: u64,
        kind: AssetKind,
        asset_id: u64,
    ) -> Result<(), CatalogError> {
        self.enter("delete_asset", Call::DeleteAsset(thing_id, kind, asset_id))?;
        let mut inner = self.inner.lock().unwrap();
        let list = inner.assets.entry((thing_id, kind)).or_default();
        let before = list.len();
        list.retain(|a| a.id != asset_id);
        if list.len() == before {
            return Err(CatalogError::Status {
                method: "DELETE",
                url: format!("https://api.test/things/{thing_id}/{}/{asset_id}", kind.as_str()),
                status: 404,
                body: "no such asset".into(),
            });
        }
        Ok(())
    }

    async fn get_image(&self, thing_id: u64, image_id: u64) -> Result<RemoteAsset, CatalogError> {
        self.enter("get_image", Call::GetImage(thing_id, image_id))?;
        let inner = self.inner.lock().unwrap();
        inner
            .assets
            .get(&(thing_id, AssetKind::Image))
            .and_then(|list| list.iter().find(|a| a.id == image_id))
            .cloned()
            .ok_or_else(|| CatalogError::Status {
                method: "GET",
                url: format!("https://api.test/things/{thing_id}/images/{image_id}"),
                status: 404,
                body: "no such image".into(),
            })
    }

    async fn fetch_content(&self, url: &str) -> Result<Bytes, CatalogError> {
        self.enter("fetch_content", Call::FetchContent(url.to_string()))?;
        let inner = self.inner.lock().unwrap();
        inner
            .content
            .get(url)
            .map(|b| Bytes::from(b.clone()))
            .ok_or_else(|| CatalogError::Status {
                method: "GET",
                url: url.to_string(),
                status: 404,
                body: String::new(),
            })
    }

    async fn request_upload(
        &self,
        thing_id: u64,
        filename: &str,
    ) -> Result<UploadSlot, CatalogError> {
        self.enter(
            "request_upload",
            Call::RequestUpload(thing_id, filename.to_string()),
        )?;
        let mut inner = self.inner.lock().unwrap();
        let n = Self::next_id(&mut inner);
        let action = format!("https://storage.test/{n}");
        inner
            .pending
            .insert(action.clone(), (thing_id, filename.to_string(), None));
        let mut fields = Map::new();
        fields.insert("key".into(), Value::String(filename.to_string()));
        fields.insert(
            COMPLETION_FIELD.into(),
            Value::String(format!("https://api.test/finalize/{n}")),
        );
        Ok(UploadSlot { action, fields })
    }

    async fn submit_upload(
        &self,
        slot: &UploadSlot,
        filename: &str,
        mut file: tokio::fs::File,
        len: u64,
    ) -> Result<(), CatalogError> {
        use tokio::io::AsyncReadExt;

        self.enter("submit_upload", Call::SubmitUpload(filename.to_string()))?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes).await.expect("readable upload");
        assert_eq!(bytes.len() as u64, len, "declared length matches content");
        let mut inner = self.inner.lock().unwrap();
        match inner.pending.get_mut(&slot.action) {
            Some(entry) => {
                entry.2 = Some(bytes);
                Ok(())
            }
            None => Err(CatalogError::malformed(&slot.action, "unknown upload slot")),
        }
    }

    async fn finalize_upload(&self, slot: &UploadSlot) -> Result<RemoteAsset, CatalogError> {
        let name = slot
            .fields
            .get("key")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        self.enter("finalize_upload", Call::FinalizeUpload(name))?;

        let mut inner = self.inner.lock().unwrap();
        let (thing_id, filename, bytes) = inner
            .pending
            .remove(&slot.action)
            .ok_or_else(|| CatalogError::malformed(&slot.action, "unknown upload slot"))?;
        let bytes =
            bytes.ok_or_else(|| CatalogError::malformed(&slot.action, "finalized before upload"))?;

        let id = Self::next_id(&mut inner);
        let url = format!("https://cdn.test/{id}");
        let asset = RemoteAsset {
            id,
            name: filename.clone(),
            size: Some(bytes.len() as u64),
            added: Some(chrono::Utc::now().to_rfc3339()),
            public_url: None,
            download_url: Some(url.clone()),
            extra: Map::new(),
        };
        inner.content.insert(url, bytes);
        let kind = if is_image(&filename) {
            AssetKind::Image
        } else {
            AssetKind::File
        };
        inner
            .assets
            .entry((thing_id, kind))
            .or_default()
            .push(asset.clone());
        inner.last_finalized = Some(asset.clone());
        Ok(asset)
    }
}

/// A remote asset with just an id, name and size.
pub fn remote_asset(id: u64, name: &str, size: u64) -> RemoteAsset {
    serde_json::from_value(json!({"id": id, "name": name, "size": size}))
        .expect("valid asset literal")
}

/// Write `contents` to `dir/rel`, creating parent directories.
pub fn write_file(dir: &Path, rel: &str, contents: &[u8]) -> PathBuf {
    let path = dir.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, contents).unwrap();
    path
}

/// Sync context for user `alice` rooted at `root`.
pub fn context(root: &Path, name: &str, files: &[&str], images: &[&str]) -> SyncContext {
    let mut fields = Map::new();
    fields.insert("license".into(), Value::String("cc".into()));
    SyncContext {
        username: "alice".into(),
        root: root.to_path_buf(),
        thing: Thing {
            id: None,
            name: name.to_string(),
            description: Some("A widget".into()),
            fields,
        },
        files: files.iter().map(|s| s.to_string()).collect(),
        images: images.iter().map(|s| s.to_string()).collect(),
        no_progress_bar: true,
    }
}
