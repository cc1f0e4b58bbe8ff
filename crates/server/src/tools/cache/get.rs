//! cache_get tool implementation.
//!
//! Retrieves the stored response for a URL.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::CacheWorker;
use swcache_client::fetch::resolve;
use swcache_core::{Error, ResponseType};

use crate::error::ToolError;
use crate::tools::json_result;

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// URL of the stored entry, absolute or relative to the site origin.
    pub url: String,

    /// Generation to read from (default: the current one).
    #[serde(default)]
    pub generation: Option<String>,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    pub generation: String,
    pub url: String,
    pub response_url: String,
    pub status: u16,
    pub response_type: ResponseType,
    pub headers: Vec<(String, String)>,
    pub body_len: usize,
    pub stored_at: String,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(worker: &CacheWorker, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let url = resolve(worker.origin(), &params.url).map_err(|e| ToolError::InvalidInput(e.to_string()))?;
    let name = params.generation.unwrap_or_else(|| worker.cache_name().to_string());

    let stored = worker
        .storage()
        .generation(&name)
        .match_request("GET", url.as_str())
        .await?
        .ok_or_else(|| Error::CacheMiss(format!("{url} in {name}")))?;

    let output = CacheGetOutput {
        generation: name,
        url: stored.url,
        response_url: stored.response_url,
        status: stored.status,
        response_type: stored.response_type,
        headers: stored.headers,
        body_len: stored.body.len(),
        stored_at: stored.stored_at,
    };

    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::lifecycle::install_impl;
    use crate::tools::test_support::{output, worker};

    #[tokio::test]
    async fn test_get_impl_missing() {
        let worker = worker(&[]).await;
        let params = CacheGetParams { url: "/nonexistent".to_string(), generation: None };

        let result = get_impl(&worker, params).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_get_impl_found() {
        let worker = worker(&["/"]).await;
        install_impl(&worker).await.unwrap();

        let params = CacheGetParams { url: "/".to_string(), generation: None };
        let result = get_impl(&worker, params).await.unwrap();
        let out: CacheGetOutput = output(&result);

        assert_eq!(out.generation, "site-cache-v1");
        assert_eq!(out.url, "https://site.test/");
        assert_eq!(out.response_url, "https://site.test/");
        assert_eq!(out.status, 200);
        assert_eq!(out.body_len, "body of /".len());
    }

    #[tokio::test]
    async fn test_get_impl_other_generation() {
        let worker = worker(&["/"]).await;
        install_impl(&worker).await.unwrap();

        let params = CacheGetParams { url: "/".to_string(), generation: Some("site-cache-v0".into()) };
        assert!(get_impl(&worker, params).await.is_err());
    }
}
