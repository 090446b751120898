//! sw_install and sw_activate tool implementations.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::Serialize;
use swcache_client::{ActivateReport, ControlAction, InstallReport, LifecycleState};

use super::json_result;
use crate::handler::HostState;

/// Output from the sw_install tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct InstallOutput {
    pub state: LifecycleState,
    #[serde(flatten)]
    pub report: InstallReport,
    /// Calls made on the client control surface.
    pub control: Vec<ControlAction>,
}

/// Output from the sw_activate tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ActivateOutput {
    pub state: LifecycleState,
    #[serde(flatten)]
    pub report: ActivateReport,
    pub control: Vec<ControlAction>,
}

pub async fn install_impl(state: &HostState) -> Result<CallToolResult, McpError> {
    let report = state.worker.install(&state.manifest).await?;
    let output = InstallOutput { state: state.worker.state().await, report, control: state.control.drain() };
    json_result(&output)
}

pub async fn activate_impl(state: &HostState) -> Result<CallToolResult, McpError> {
    let report = state.worker.activate().await?;
    let output = ActivateOutput { state: state.worker.state().await, report, control: state.control.drain() };
    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{host_state, output_json};
    use swcache_core::{CacheStorage, Request, Response};

    #[tokio::test]
    async fn test_install_reports_precached_urls() {
        let (state, _) = host_state().await;

        let result = install_impl(&state).await.unwrap();
        let json = output_json(&result);
        assert_eq!(json["state"], "installed");
        assert_eq!(json["navigation"].as_array().unwrap().len(), 2);
        assert_eq!(json["assets"][0], "https://school.test/manifest.json");
        assert_eq!(json["control"][0]["type"], "skip_waiting");
        assert_eq!(state.db.count_entries("kindergarten-v1").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_install_failure_is_tool_error() {
        let (state, fetcher) = host_state().await;
        fetcher.set_offline(true);

        let err = install_impl(&state).await.unwrap_err();
        assert_eq!(err.code.0, -32008);
        assert!(state.control.actions().is_empty());
    }

    #[tokio::test]
    async fn test_activate_reports_deleted_stores() {
        let (state, _) = host_state().await;
        let request = Request::get_str("https://school.test/").unwrap();
        state.db.put("kindergarten-v0", &request, &Response::new(200, "old")).await.unwrap();

        let result = activate_impl(&state).await.unwrap();
        let json = output_json(&result);
        assert_eq!(json["state"], "activated");
        assert_eq!(json["deleted"][0], "kindergarten-v0");
        assert_eq!(json["control"][0]["type"], "claim");
    }
}
