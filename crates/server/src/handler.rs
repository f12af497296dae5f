//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::tools::{
    Host,
    cache::{CacheGetParams, CacheListParams, get_impl, list_impl},
    worker_fetch::{WorkerFetchParams, fetch_impl},
    worker_lifecycle::{activate_impl, install_impl, status_impl},
};

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

/// The main MCP server handler for shellcache.
#[derive(Clone)]
pub struct ShellCacheServer {
    host: Arc<Host>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
#[tool_router]
impl ShellCacheServer {
    /// Create a new server handler around a worker host.
    pub fn new(host: Arc<Host>) -> Self {
        Self { host, tool_router: Self::tool_router() }
    }

    #[tool(description = "Deliver the install event: cache every shell asset into the current bucket.")]
    async fn worker_install(&self) -> Result<CallToolResult, McpError> {
        install_impl(&*self.host).await
    }

    #[tool(description = "Deliver the activate event: delete every cache bucket except the current one.")]
    async fn worker_activate(&self) -> Result<CallToolResult, McpError> {
        activate_impl(&*self.host).await
    }

    #[tool(description = "Report the worker lifecycle state, origin, current cache name and existing buckets.")]
    async fn worker_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&*self.host).await
    }

    /// Fetch through the worker.
    ///
    /// Same-origin GETs are served network-first with cache and offline-page fallback;
    /// everything else passes straight to the network.
    #[tool(
        description = "Deliver a fetch event. Returns status, headers, body and whether the response came from the network, the cache, the offline page, or passthrough."
    )]
    async fn worker_fetch(&self, params: Parameters<WorkerFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&*self.host, params.0).await
    }

    #[tool(description = "Read a cached response by URL from the current bucket, or from a named bucket.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&*self.host, params.0).await
    }

    #[tool(description = "List cache bucket names, or the entries of one bucket.")]
    async fn cache_list(&self, params: Parameters<CacheListParams>) -> Result<CallToolResult, McpError> {
        list_impl(&*self.host, params.0).await
    }
}

impl ServerHandler for ShellCacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "shellcache".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(
                "Offline-first shell cache worker. Install and activate once, then fetch same-origin pages \
                 through worker_fetch."
                    .into(),
            ),
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
