use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Form field carrying the URL the catalog wants hit once storage has the bytes.
pub const COMPLETION_FIELD: &str = "success_action_redirect";

/// Remote namespace an asset lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    File,
    Image,
}

impl AssetKind {
    /// Path segment used by the catalog's REST endpoints.
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::File => "files",
            AssetKind::Image => "images",
        }
    }
}

impl std::fmt::Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetKind::File => f.write_str("file"),
            AssetKind::Image => f.write_str("image"),
        }
    }
}

/// A catalog entry. Everything besides id, name and description is passed
/// through to the catalog untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Thing {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Thing {
    /// Body sent on create and patch: the full record minus the id.
    pub fn payload(&self) -> Thing {
        Thing {
            id: None,
            ..self.clone()
        }
    }

    /// Copy suitable for the persisted run state.
    pub fn without_description(&self) -> Thing {
        Thing {
            description: None,
            ..self.clone()
        }
    }
}

/// Metadata the catalog reports for an uploaded file or image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteAsset {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RemoteAsset {
    /// URL the full content can be fetched from.
    pub fn content_url(&self) -> Option<&str> {
        self.download_url
            .as_deref()
            .or(self.public_url.as_deref())
    }

    /// The `added` timestamp as an instant.
    ///
    /// Accepts RFC 3339, or a naive `YYYY-MM-DDTHH:MM:SS` which is read as UTC.
    pub fn added_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.added.as_deref()?.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
                return Some(naive.and_utc());
            }
        }
        None
    }
}

/// Pre-authorized direct-to-storage upload target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadSlot {
    pub action: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl UploadSlot {
    /// Slot fields flattened to strings.
    pub fn form_fields(&self) -> Vec<(String, String)> {
        self.fields
            .iter()
            .map(|(k, v)| match v {
                Value::String(s) => (k.clone(), s.clone()),
                other => (k.clone(), other.to_string()),
            })
            .collect()
    }

    pub fn completion_url(&self) -> Option<&str> {
        self.fields.get(COMPLETION_FIELD).and_then(Value::as_str)
    }
}
