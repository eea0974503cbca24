//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::tools::cache::{CacheEntriesParams, entries_impl, keys_impl};
use crate::tools::proxy_fetch::{ProxyFetchParams, fetch_impl};
use crate::tools::proxy_update::update_impl;
use lownet_proxy::CacheProxy;

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

/// The main MCP server handler for lownet.
#[derive(Clone)]
pub struct LownetServer {
    tool_router: ToolRouter<Self>,
    proxy: Arc<CacheProxy>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl LownetServer {
    /// Create a new server handler around a shared proxy.
    pub fn new(proxy: Arc<CacheProxy>) -> Self {
        Self { tool_router: Self::tool_router(), proxy }
    }

    /// Fetch a URL through the caching proxy.
    #[tool(
        description = "Fetch a URL or origin-relative path through the stale-while-revalidate cache. Returns status, source (cache, network or passthrough) and body."
    )]
    async fn proxy_fetch(&self, params: Parameters<ProxyFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.proxy, params.0).await
    }

    /// Re-run install and activate for the configured version.
    #[tool(description = "Re-populate the current bucket from the precache manifest and delete all other buckets.")]
    async fn proxy_update(&self) -> Result<CallToolResult, McpError> {
        update_impl(&self.proxy).await
    }

    /// List bucket names.
    #[tool(description = "List cache bucket names and which one is current.")]
    async fn cache_keys(&self) -> Result<CallToolResult, McpError> {
        keys_impl(&self.proxy).await
    }

    /// List request descriptors stored in a bucket.
    #[tool(description = "List the requests stored in a bucket (default: the current bucket).")]
    async fn cache_entries(&self, params: Parameters<CacheEntriesParams>) -> Result<CallToolResult, McpError> {
        entries_impl(&self.proxy, params.0).await
    }
}

impl ServerHandler for LownetServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "lownet".into(),
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
