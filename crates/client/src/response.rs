//! Response model shared by the network boundary and the strategies.

use bytes::Bytes;
use swcache_core::{ResponseType, StoredResponse};

use crate::request::Request;

const OFFLINE_BODY: &str = "Asset unavailable offline";

/// A response delivered to the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Final URL of the response, empty for synthetic responses.
    pub url: String,
    /// HTTP status; 0 for opaque and network-error responses.
    pub status: u16,
    pub status_text: String,
    pub response_type: ResponseType,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl Response {
    /// Same-origin response as produced by the network boundary.
    pub fn basic(url: impl Into<String>, status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            url: url.into(),
            status,
            status_text: reqwest::StatusCode::from_u16(status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .unwrap_or_default()
                .to_string(),
            response_type: ResponseType::Basic,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// Cross-origin no-cors response: status and body are hidden.
    pub fn opaque(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status: 0,
            status_text: String::new(),
            response_type: ResponseType::Opaque,
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    /// What a page sees when a fetch fails outright.
    pub fn network_error() -> Self {
        Self {
            url: String::new(),
            status: 0,
            status_text: String::new(),
            response_type: ResponseType::Error,
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    /// Stand-in for a media asset that could not be fetched offline.
    pub fn offline_placeholder() -> Self {
        Self {
            url: String::new(),
            status: 503,
            status_text: "Service Unavailable".to_string(),
            response_type: ResponseType::Default,
            headers: vec![("content-type".to_string(), "text/plain".to_string())],
            body: Bytes::from_static(OFFLINE_BODY.as_bytes()),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// 2xx status.
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Eligible for storage: exactly 200 and same-origin basic.
    pub fn is_cacheable(&self) -> bool {
        self.status == 200 && self.response_type == ResponseType::Basic
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Snapshot of this response stored under the request's identity.
    pub fn to_stored(&self, request: &Request) -> StoredResponse {
        let key = request.key();
        StoredResponse {
            method: key.method,
            url: key.url,
            response_url: self.url.clone(),
            status: self.status,
            status_text: self.status_text.clone(),
            response_type: self.response_type,
            headers: self.headers.clone(),
            body: self.body.to_vec(),
            stored_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

impl From<StoredResponse> for Response {
    fn from(stored: StoredResponse) -> Self {
        let url = if stored.response_url.is_empty() { stored.url } else { stored.response_url };
        Self {
            url,
            status: stored.status,
            status_text: stored.status_text,
            response_type: stored.response_type,
            headers: stored.headers,
            body: Bytes::from(stored.body),
        }
    }
}
