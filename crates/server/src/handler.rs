//! MCP server handler implementation.
//!
//! This module defines the main server handler that routes tool calls to
//! the worker's lifecycle hooks and cache inspection.

use std::sync::Arc;

use crate::tools::{
    CacheGetParams, WorkerFetchParams, activate_impl, fetch_impl, get_impl, install_impl, list_impl,
};
use swcache_client::CacheWorker;

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The main MCP server handler for swcache.
#[derive(Clone)]
pub struct CacheWorkerServer {
    worker: Arc<CacheWorker>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl CacheWorkerServer {
    /// Create a new server handler around a worker.
    pub fn new(worker: Arc<CacheWorker>) -> Self {
        Self { worker, tool_router: Self::tool_router() }
    }

    /// Install phase: open the current generation and pre-cache the manifest.
    #[tool(description = "Run the install phase: pre-cache the manifest into the current cache generation. \
                          Missing assets are skipped and reported.")]
    async fn worker_install(&self) -> Result<CallToolResult, McpError> {
        install_impl(&self.worker).await
    }

    /// Activate phase: delete stale generations and claim clients.
    #[tool(description = "Run the activate phase: delete every cache generation except the current one \
                          and take control of open clients.")]
    async fn worker_activate(&self) -> Result<CallToolResult, McpError> {
        activate_impl(&self.worker).await
    }

    /// Fetch interception.
    #[tool(description = "Intercept a request as the worker would: network-first for navigations, \
                          cache-first for media and assets, stale-while-revalidate otherwise. \
                          Cross-origin requests pass through.")]
    async fn worker_fetch(&self, params: Parameters<WorkerFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.worker, params.0).await
    }

    /// List generations.
    #[tool(description = "List cache generations with their entry counts.")]
    async fn cache_list(&self) -> Result<CallToolResult, McpError> {
        list_impl(&self.worker).await
    }

    /// Read one stored entry.
    #[tool(description = "Get metadata of the stored response for a URL in the current (or named) generation.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.worker, params.0).await
    }
}

impl ServerHandler for CacheWorkerServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "swcache".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
