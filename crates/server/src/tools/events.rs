//! Auxiliary event tools: sw_sync, sw_push, sw_notification_click and
//! sw_periodic_sync.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::ControlAction;

use super::json_result;
use crate::handler::HostState;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SyncParams {
    /// Sync tag; `background-sync` is recognised.
    pub tag: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct PushParams {
    /// Push message data as text, normally a JSON object.
    #[serde(default)]
    pub payload: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct NotificationClickParams {
    /// Action button that was clicked, if any.
    #[serde(default)]
    pub action: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PeriodicSyncParams {
    /// Periodic sync tag; `content-sync` is recognised.
    pub tag: String,
}

/// Output shared by the event tools.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct EventOutput {
    /// Whether the event did anything.
    pub handled: bool,
    /// Calls made on the client control surface.
    pub control: Vec<ControlAction>,
}

fn event_output(state: &HostState, handled: bool) -> Result<CallToolResult, McpError> {
    json_result(&EventOutput { handled, control: state.control.drain() })
}

pub async fn sync_impl(state: &HostState, params: SyncParams) -> Result<CallToolResult, McpError> {
    let handled = state.worker.background_sync(&params.tag).await;
    event_output(state, handled)
}

pub async fn push_impl(state: &HostState, params: PushParams) -> Result<CallToolResult, McpError> {
    let shown = state.worker.push(params.payload.as_deref().map(str::as_bytes)).await?;
    event_output(state, shown.is_some())
}

pub async fn notification_click_impl(
    state: &HostState, params: NotificationClickParams,
) -> Result<CallToolResult, McpError> {
    state.worker.notification_click(params.action.as_deref()).await?;
    event_output(state, true)
}

pub async fn periodic_sync_impl(state: &HostState, params: PeriodicSyncParams) -> Result<CallToolResult, McpError> {
    let handled = state.worker.periodic_sync(&params.tag).await;
    event_output(state, handled)
}
