//! worker_fetch tool implementation.
//!
//! The fetch-interception hook: hands one request to the worker and reports
//! whether it was passed through or answered, and with what.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::fetch::resolve;
use swcache_client::{CacheWorker, Destination, FetchOutcome, Method, Request, RequestMode};
use swcache_core::ResponseType;

use super::json_result;
use crate::error::ToolError;

/// Largest body echoed back as text.
const MAX_BODY_PREVIEW: usize = 64 * 1024;

/// Input parameters for the worker_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerFetchParams {
    /// Target URL, absolute or relative to the site origin.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default)]
    pub method: Option<String>,

    /// Treat the request as a top-level page load.
    #[serde(default)]
    pub navigate: bool,

    /// Fetch destination: image, audio, video, script, style, font, manifest, document.
    #[serde(default)]
    pub destination: Option<String>,

    /// Issue the request in CORS mode.
    #[serde(default)]
    pub cors: bool,
}

/// Output structure for the worker_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerFetchOutput {
    /// The resolved request URL.
    pub url: String,
    /// "passthrough" when the worker left the request to the host, otherwise "response".
    pub outcome: String,
    pub status: Option<u16>,
    /// Whether the response status is 2xx.
    pub ok: bool,
    pub response_type: Option<ResponseType>,
    pub headers: Vec<(String, String)>,
    /// Body as UTF-8 text, when it is text and small enough.
    pub body: Option<String>,
    pub body_len: usize,
}

impl WorkerFetchParams {
    fn into_request(self, worker: &CacheWorker) -> Result<Request, ToolError> {
        let url = resolve(worker.origin(), &self.url).map_err(|e| ToolError::InvalidInput(e.to_string()))?;

        let method = match self.method.as_deref() {
            Some(m) => Method::from_bytes(m.to_ascii_uppercase().as_bytes())
                .map_err(|e| ToolError::InvalidInput(format!("invalid method {m:?}: {e}")))?,
            None => Method::GET,
        };

        let destination = match self.destination.as_deref() {
            Some(d) => d
                .parse::<Destination>()
                .map_err(|e| ToolError::InvalidInput(e.to_string()))?,
            None => Destination::Other,
        };

        let request = if self.navigate { Request::navigate(url) } else { Request::get(url) };
        let request = if self.navigate { request } else { request.with_destination(destination) };
        let request = if self.cors { request.with_mode(RequestMode::Cors) } else { request };

        Ok(request.with_method(method))
    }
}

/// Implementation of the worker_fetch tool.
pub async fn fetch_impl(worker: &CacheWorker, params: WorkerFetchParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(ToolError::InvalidInput("url cannot be empty".into()).into());
    }

    let request = params.into_request(worker)?;
    let url = request.url.to_string();

    let output = match worker.handle_fetch(&request).await? {
        FetchOutcome::Passthrough => WorkerFetchOutput {
            url,
            outcome: "passthrough".into(),
            status: None,
            ok: false,
            response_type: None,
            headers: Vec::new(),
            body: None,
            body_len: 0,
        },
        FetchOutcome::Respond(response) => {
            let body = (response.body.len() <= MAX_BODY_PREVIEW)
                .then(|| std::str::from_utf8(&response.body).ok().map(str::to_string))
                .flatten();
            WorkerFetchOutput {
                url,
                outcome: "response".into(),
                status: Some(response.status),
                ok: response.ok(),
                response_type: Some(response.response_type),
                body_len: response.body.len(),
                headers: response.headers,
                body,
            }
        }
    };

    json_result(&output)
}
