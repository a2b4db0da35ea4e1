//! Remote catalog service: REST entities, the `CatalogApi` seam the
//! synchronizer drives, and the reqwest-backed implementation.

pub mod client;
pub mod error;
pub mod types;

pub use client::HttpCatalog;
pub use error::CatalogError;
pub use types::{AssetKind, RemoteAsset, Thing, UploadSlot};

use bytes::Bytes;

/// Operations the synchronizer needs from the catalog.
///
/// Every call is a single request (or a single paged listing); callers
/// treat any `Err` as fatal.
#[async_trait::async_trait]
pub trait CatalogApi: Send + Sync {
    /// All things owned by `username`, across every page.
    async fn list_user_things(&self, username: &str) -> Result<Vec<Thing>, CatalogError>;

    async fn create_thing(&self, thing: &Thing) -> Result<Thing, CatalogError>;

    async fn update_thing(&self, id: u64, thing: &Thing) -> Result<Thing, CatalogError>;

    async fn list_assets(
        &self,
        thing_id: u64,
        kind: AssetKind,
    ) -> Result<Vec<RemoteAsset>, CatalogError>;

    async fn delete_asset(
        &self,
        thing_id: u64,
        kind: AssetKind,
        asset_id: u64,
    ) -> Result<(), CatalogError>;

    async fn get_image(&self, thing_id: u64, image_id: u64) -> Result<RemoteAsset, CatalogError>;

    /// Fetch the full content behind an asset's content URL.
    async fn fetch_content(&self, url: &str) -> Result<Bytes, CatalogError>;

    /// Step 1 of the upload handshake.
    async fn request_upload(&self, thing_id: u64, filename: &str)
        -> Result<UploadSlot, CatalogError>;

    /// Step 2: stream `file` (`len` bytes) to the slot's storage target.
    async fn submit_upload(
        &self,
        slot: &UploadSlot,
        filename: &str,
        file: tokio::fs::File,
        len: u64,
    ) -> Result<(), CatalogError>;

    /// Step 3: tell the catalog the upload landed; returns the new asset.
    async fn finalize_upload(&self, slot: &UploadSlot) -> Result<RemoteAsset, CatalogError>;
}
