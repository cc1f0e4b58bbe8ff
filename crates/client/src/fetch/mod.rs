//! Network boundary.
//!
//! ### Network trait
//! Strategies only talk to the network through [`Network`], so the whole
//! pipeline can be exercised without sockets.
//!
//! ### Response typing
//! - `basic`: final URL shares the request's origin
//! - `cors`: cross-origin response to a CORS-mode request
//! - `opaque`: any other cross-origin response; status and body are hidden
//!
//! HTTP error statuses are responses, not errors. Only a rejected fetch
//! (DNS, connect, TLS, body read) is an `Error::Network`.

pub mod url;

use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};
use swcache_core::{AppConfig, Error, ResponseType};

pub use url::{UrlError, resolve, same_origin};

use crate::request::{Request, RequestMode};
use crate::response::Response;

/// Anything that can perform a fetch on the worker's behalf.
#[async_trait]
pub trait Network: Send + Sync {
    /// Perform the request.
    ///
    /// # Errors
    ///
    /// Returns `Error::Network` when no response could be obtained.
    async fn fetch(&self, request: &Request) -> Result<Response, Error>;
}

/// Configuration for the HTTP network.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "swcache/0.1")
    pub user_agent: String,

    /// Request timeout (default: none)
    pub timeout: Option<Duration>,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { user_agent: "swcache/0.1".to_string(), timeout: None, max_redirects: 5 }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self { user_agent: config.user_agent.clone(), timeout: config.timeout(), max_redirects: config.max_redirects }
    }
}

/// reqwest-backed network.
pub struct HttpNetwork {
    http: Client,
}

impl HttpNetwork {
    /// Create a new network client with the given configuration.
    pub fn new(config: &FetchConfig) -> Result<Self, Error> {
        let mut builder = Client::builder()
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true);

        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        let http = builder
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http })
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let start = Instant::now();

        let response = self
            .http
            .request(request.method.clone(), request.url.clone())
            .send()
            .await
            .map_err(|e| Error::Network(format!("{} {}: {}", request.method, request.url, e)))?;

        let final_url = response.url().clone();
        let response_type = classify_response(request, &final_url);

        if response_type == ResponseType::Opaque {
            tracing::debug!("opaque response for {} -> {}", request.url, final_url);
            return Ok(Response::opaque(final_url.as_str()));
        }

        let status = response.status();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect();

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::Network(format!("failed to read response: {}", e)))?;

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            "fetched {} -> {} {} in {}ms ({} bytes)",
            request.url,
            final_url,
            status.as_u16(),
            fetch_ms,
            body.len()
        );

        Ok(Response {
            url: final_url.to_string(),
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            response_type,
            headers,
            body,
        })
    }
}

fn classify_response(request: &Request, final_url: &::url::Url) -> ResponseType {
    if same_origin(&request.url, final_url) {
        ResponseType::Basic
    } else if request.mode == RequestMode::Cors {
        ResponseType::Cors
    } else {
        ResponseType::Opaque
    }
}
