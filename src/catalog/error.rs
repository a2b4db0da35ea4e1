use thiserror::Error;

/// Failures talking to the remote catalog or its storage backend.
///
/// Every variant is fatal to the run; nothing here is retried.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("{method} {url} returned HTTP {status}: {body}")]
    Status {
        method: &'static str,
        url: String,
        status: u16,
        body: String,
    },

    #[error("Malformed response from {url}: {reason}")]
    MalformedResponse { url: String, reason: String },

    #[error("Invalid catalog URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Bearer token is not a valid header value")]
    InvalidToken(#[from] reqwest::header::InvalidHeaderValue),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl CatalogError {
    pub(crate) fn malformed(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedResponse {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// HTTP status code of the failed call, when the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            CatalogError::Status { status, .. } => Some(*status),
            CatalogError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_message_includes_body() {
        let e = CatalogError::Status {
            method: "PATCH",
            url: "https://api.example.com/things/7".into(),
            status: 403,
            body: "not your thing".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("PATCH"));
        assert!(msg.contains("403"));
        assert!(msg.contains("not your thing"));
        assert_eq!(e.status(), Some(403));
    }

    #[test]
    fn test_malformed_has_no_status() {
        let e = CatalogError::malformed("https://x", "missing id");
        assert_eq!(e.status(), None);
        assert!(e.to_string().contains("missing id"));
    }
}
