use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, Response};
use serde::de::DeserializeOwned;
use tokio_util::io::ReaderStream;
use url::Url;

use super::error::CatalogError;
use super::types::{AssetKind, RemoteAsset, Thing, UploadSlot};
use super::CatalogApi;

pub const DEFAULT_API_URL: &str = "https://api.thingiverse.com/";

/// Page size used when listing a user's things.
const PAGE_SIZE: usize = 100;

const DEFAULT_USER_AGENT: &str = concat!("thingsync/", env!("CARGO_PKG_VERSION"));

/// Catalog client over HTTPS with bearer-token auth.
pub struct HttpCatalog {
    /// Authenticated client for the catalog API.
    client: Client,
    /// Unauthenticated client for direct-to-storage uploads. Redirects are
    /// not followed: storage answers a successful form post with a 303 to
    /// the completion URL, which is called separately with auth.
    storage: Client,
    /// Unauthenticated client for content hosted outside the catalog origin.
    public: Client,
    base: Url,
}

impl std::fmt::Debug for HttpCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpCatalog")
            .field("base", &self.base.as_str())
            .finish_non_exhaustive()
    }
}

impl HttpCatalog {
    pub fn new(api_url: &str, token: &str) -> Result<Self, CatalogError> {
        let mut base = api_url.to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base = Url::parse(&base)?;

        let mut default_headers = HeaderMap::new();
        let mut bearer = HeaderValue::from_str(&format!("Bearer {token}"))?;
        bearer.set_sensitive(true);
        default_headers.insert(AUTHORIZATION, bearer);
        default_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        default_headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));

        let client = Client::builder().default_headers(default_headers).build()?;
        let storage = Client::builder()
            .user_agent(DEFAULT_USER_AGENT)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        let public = Client::builder().user_agent(DEFAULT_USER_AGENT).build()?;

        Ok(Self {
            client,
            storage,
            public,
            base,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, CatalogError> {
        Ok(self.base.join(path)?)
    }

    /// The bearer token only goes to the catalog's own origin.
    fn client_for(&self, url: &Url) -> &Client {
        if url.origin() == self.base.origin() {
            &self.client
        } else {
            &self.public
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, CatalogError> {
        tracing::debug!("GET {}", url);
        let response = self.client.get(url).send().await?;
        let response = check("GET", response).await?;
        Ok(response.json().await?)
    }
}

/// Turn any non-2xx response into `CatalogError::Status`, keeping the body
/// for the error message.
async fn check(method: &'static str, response: Response) -> Result<Response, CatalogError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let url = response.url().to_string();
    let body = response.text().await.unwrap_or_default();
    Err(CatalogError::Status {
        method,
        url,
        status: status.as_u16(),
        body,
    })
}

#[async_trait::async_trait]
impl CatalogApi for HttpCatalog {
    async fn list_user_things(&self, username: &str) -> Result<Vec<Thing>, CatalogError> {
        let mut things = Vec::new();
        let mut page = 1usize;
        loop {
            let mut url = self.endpoint(&format!("users/{username}/things"))?;
            url.query_pairs_mut()
                .append_pair("page", &page.to_string())
                .append_pair("per_page", &PAGE_SIZE.to_string());
            let batch: Vec<Thing> = self.get_json(url).await?;
            let short = batch.len() < PAGE_SIZE;
            things.extend(batch);
            if short {
                break;
            }
            page += 1;
        }
        tracing::debug!(username, count = things.len(), "Listed things");
        Ok(things)
    }

    async fn create_thing(&self, thing: &Thing) -> Result<Thing, CatalogError> {
        let url = self.endpoint("things/")?;
        tracing::debug!("POST {}", url);
        let response = self.client.post(url).json(&thing.payload()).send().await?;
        let response = check("POST", response).await?;
        Ok(response.json().await?)
    }

    async fn update_thing(&self, id: u64, thing: &Thing) -> Result<Thing, CatalogError> {
        let url = self.endpoint(&format!("things/{id}"))?;
        tracing::debug!("PATCH {}", url);
        let response = self.client.patch(url).json(&thing.payload()).send().await?;
        let response = check("PATCH", response).await?;
        Ok(response.json().await?)
    }

    async fn list_assets(
        &self,
        thing_id: u64,
        kind: AssetKind,
    ) -> Result<Vec<RemoteAsset>, CatalogError> {
        let url = self.endpoint(&format!("things/{thing_id}/{}", kind.as_str()))?;
        self.get_json(url).await
    }

    async fn delete_asset(
        &self,
        thing_id: u64,
        kind: AssetKind,
        asset_id: u64,
    ) -> Result<(), CatalogError> {
        let url = self.endpoint(&format!("things/{thing_id}/{}/{asset_id}", kind.as_str()))?;
        tracing::debug!("DELETE {}", url);
        let response = self.client.delete(url).send().await?;
        check("DELETE", response).await?;
        Ok(())
    }

    async fn get_image(&self, thing_id: u64, image_id: u64) -> Result<RemoteAsset, CatalogError> {
        let url = self.endpoint(&format!("things/{thing_id}/images/{image_id}"))?;
        self.get_json(url).await
    }

    async fn fetch_content(&self, url: &str) -> Result<Bytes, CatalogError> {
        let url = Url::parse(url)?;
        tracing::debug!("GET {}", url);
        let response = self.client_for(&url).get(url).send().await?;
        let response = check("GET", response).await?;
        Ok(response.bytes().await?)
    }

    async fn request_upload(
        &self,
        thing_id: u64,
        filename: &str,
    ) -> Result<UploadSlot, CatalogError> {
        let url = self.endpoint(&format!("things/{thing_id}/files"))?;
        tracing::debug!("POST {}", url);
        let response = self
            .client
            .post(url)
            .json(&serde_json::json!({ "filename": filename }))
            .send()
            .await?;
        let response = check("POST", response).await?;
        let source = response.url().to_string();
        let slot: UploadSlot = response.json().await?;
        if slot.completion_url().is_none() {
            return Err(CatalogError::malformed(
                source,
                "upload slot has no completion URL",
            ));
        }
        Ok(slot)
    }

    async fn submit_upload(
        &self,
        slot: &UploadSlot,
        filename: &str,
        file: tokio::fs::File,
        len: u64,
    ) -> Result<(), CatalogError> {
        let mime = mime_guess::from_path(filename).first_or_octet_stream();

        let part = Part::stream_with_length(Body::wrap_stream(ReaderStream::new(file)), len)
            .file_name(filename.to_string())
            .mime_str(mime.as_ref())?;

        // Storage backends expect the file part after every policy field.
        let form = slot
            .form_fields()
            .into_iter()
            .fold(Form::new(), |form, (k, v)| form.text(k, v))
            .part("file", part);

        tracing::debug!(size_bytes = len, "POST {}", slot.action);
        let response = self.storage.post(&slot.action).multipart(form).send().await?;
        if response.status().is_redirection() {
            return Ok(());
        }
        check("POST", response).await?;
        Ok(())
    }

    async fn finalize_upload(&self, slot: &UploadSlot) -> Result<RemoteAsset, CatalogError> {
        let url = slot
            .completion_url()
            .ok_or_else(|| CatalogError::malformed(&slot.action, "upload slot has no completion URL"))?;
        tracing::debug!("POST {}", url);
        let response = self
            .client
            .post(url)
            .form(&slot.form_fields())
            .send()
            .await?;
        let response = check("POST", response).await?;
        Ok(response.json().await?)
    }
}
