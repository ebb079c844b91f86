//! MCP server handler implementation.
//!
//! Routes tool calls to the hosted service worker.

use std::sync::Arc;

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
use sp1sh_worker::ServiceWorker;

use crate::tools::cache::{CacheKeysParams, CacheSweepParams, keys_impl, sweep_impl};
use crate::tools::clients::{ClosePageParams, close_impl};
use crate::tools::fetch::{SwFetchParams, fetch_impl};
use crate::tools::message::{SwMessageParams, message_impl};

/// The MCP server handler for sp1sh-sw.
#[derive(Clone)]
pub struct Sp1shServer {
    worker: Arc<ServiceWorker>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl Sp1shServer {
    pub fn new(worker: Arc<ServiceWorker>) -> Self {
        Self { worker, tool_router: Self::tool_router() }
    }

    #[tool(
        description = "Send a request through the service worker. Returns the response with its route and source (network, cache, offline_fallback, synthetic)."
    )]
    async fn sw_fetch(&self, params: Parameters<SwFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.worker, params.0).await
    }

    #[tool(description = "Post a page message (SKIP_WAITING or CLEAR_CACHE) to the service worker.")]
    async fn sw_message(&self, params: Parameters<SwMessageParams>) -> Result<CallToolResult, McpError> {
        message_impl(&self.worker, params.0).await
    }

    #[tool(description = "Forget a page opened through sw_fetch so activation no longer claims it.")]
    async fn sw_close_page(&self, params: Parameters<ClosePageParams>) -> Result<CallToolResult, McpError> {
        close_impl(&self.worker, params.0).await
    }

    #[tool(description = "List cache partitions with entry counts, or the entries of one partition.")]
    async fn cache_keys(&self, params: Parameters<CacheKeysParams>) -> Result<CallToolResult, McpError> {
        keys_impl(&self.worker, params.0).await
    }

    #[tool(description = "Delete cache entries older than the configured maximum age now.")]
    async fn cache_sweep(&self, params: Parameters<CacheSweepParams>) -> Result<CallToolResult, McpError> {
        sweep_impl(&self.worker, params.0).await
    }
}

impl ServerHandler for Sp1shServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "sp1sh-sw".into(),
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
