//! MCP server handler implementation.
//!
//! The worker host owns one [`RequestCache`] and dispatches lifecycle,
//! fetch and auxiliary events to it as tool calls, alongside inspection
//! tools for the SQLite stores.
use std::sync::Arc;

use crate::tools::cache::{
    CacheDeleteParams, CacheGetParams, CacheKeysParams, CachePurgeParams, delete_impl, get_impl, keys_impl, purge_impl,
};
use crate::tools::events::{
    NotificationClickParams, PeriodicSyncParams, PushParams, SyncParams, notification_click_impl, periodic_sync_impl,
    push_impl, sync_impl,
};
use crate::tools::fetch::{SwFetchParams, fetch_impl};
use crate::tools::lifecycle::{activate_impl, install_impl};

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
use swcache_client::{RecordingControl, RequestCache};
use swcache_core::{CacheDb, PrecacheManifest};
use url::Url;

/// Everything a tool call may touch.
pub struct HostState {
    pub worker: RequestCache,
    pub db: CacheDb,
    /// Control surface handed to `worker`; tools drain it to report side effects.
    pub control: Arc<RecordingControl>,
    pub manifest: PrecacheManifest,
    /// Base for relative URLs in tool arguments.
    pub origin: Url,
}

/// The worker host handler.
#[derive(Clone)]
pub struct SwCacheHost {
    state: Arc<HostState>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
#[tool_router]
impl SwCacheHost {
    pub fn new(state: Arc<HostState>) -> Self {
        Self { state, tool_router: Self::tool_router() }
    }

    #[tool(description = "Run the install event: precache the app shell into the current generation's stores.")]
    async fn sw_install(&self) -> Result<CallToolResult, McpError> {
        install_impl(&self.state).await
    }

    #[tool(description = "Run the activate event: delete stores from older generations and claim clients.")]
    async fn sw_activate(&self) -> Result<CallToolResult, McpError> {
        activate_impl(&self.state).await
    }

    /// Intercept a request the way a page fetch would be intercepted.
    #[tool(description = "Dispatch a fetch event. Returns the response served and where it came from.")]
    async fn sw_fetch(&self, params: Parameters<SwFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.state, params.0).await
    }

    #[tool(description = "Dispatch a background sync event with the given tag.")]
    async fn sw_sync(&self, params: Parameters<SyncParams>) -> Result<CallToolResult, McpError> {
        sync_impl(&self.state, params.0).await
    }

    #[tool(description = "Dispatch a push event. The payload is JSON text with optional title, body and primaryKey.")]
    async fn sw_push(&self, params: Parameters<PushParams>) -> Result<CallToolResult, McpError> {
        push_impl(&self.state, params.0).await
    }

    #[tool(description = "Dispatch a notification click, optionally for a named action such as \"explore\".")]
    async fn sw_notification_click(
        &self, params: Parameters<NotificationClickParams>,
    ) -> Result<CallToolResult, McpError> {
        notification_click_impl(&self.state, params.0).await
    }

    #[tool(description = "Dispatch a periodic sync event. The content-sync tag refreshes critical content.")]
    async fn sw_periodic_sync(&self, params: Parameters<PeriodicSyncParams>) -> Result<CallToolResult, McpError> {
        periodic_sync_impl(&self.state, params.0).await
    }

    #[tool(description = "List stores with their entry counts, or the entries of one store.")]
    async fn cache_keys(&self, params: Parameters<CacheKeysParams>) -> Result<CallToolResult, McpError> {
        keys_impl(&self.state.db, params.0).await
    }

    #[tool(description = "Get a stored response by store name and URL.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.state.db, &self.state.origin, params.0).await
    }

    #[tool(description = "Delete a store and every entry in it.")]
    async fn cache_delete(&self, params: Parameters<CacheDeleteParams>) -> Result<CallToolResult, McpError> {
        delete_impl(&self.state.db, params.0).await
    }

    #[tool(description = "Delete entries of a store older than the given age in seconds.")]
    async fn cache_purge(&self, params: Parameters<CachePurgeParams>) -> Result<CallToolResult, McpError> {
        purge_impl(&self.state.db, params.0).await
    }
}

impl ServerHandler for SwCacheHost {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "swcache-host".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(
                "Service worker request cache. Run sw_install then sw_activate, then dispatch sw_fetch events.".into(),
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
        self.tool_router.call(ToolCallContext::new(self, request, context)).await
    }
}
