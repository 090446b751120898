//! sw_fetch tool implementation.
//!
//! Builds an intercepted request from the tool arguments and reports what
//! the request cache answered with.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::fetch::canonicalize;
use swcache_client::{FetchOutcome, RequestKind, ResponseSource};
use swcache_core::{Error, Request, RequestMode};

use super::json_result;
use crate::handler::HostState;

/// Bodies longer than this are cut in the tool output.
const BODY_PREVIEW_BYTES: usize = 64 * 1024;

/// Input parameters for the sw_fetch tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// Absolute URL, or a path resolved against the configured origin.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default)]
    pub method: Option<String>,

    /// Issue the request as a top-level navigation.
    #[serde(default)]
    pub navigate: bool,

    /// Optional Accept header.
    #[serde(default)]
    pub accept: Option<String>,
}

/// Output structure for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct SwFetchOutput {
    pub url: String,
    /// False when the request was left to the default network handling.
    pub intercepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<RequestKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<ResponseSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub headers: Vec<(String, String)>,
    /// Body as text, lossily decoded and cut at 64KB.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    pub body_len: usize,
}

pub fn build_request(state: &HostState, params: &SwFetchParams) -> Result<Request, Error> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()));
    }

    let url = canonicalize(&params.url, &state.origin).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let method = params.method.as_deref().unwrap_or("GET");
    if method.is_empty() || !method.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(Error::InvalidInput(format!("invalid method: {method}")));
    }

    let mut request = Request::new(method, url);
    if params.navigate {
        request = request.with_mode(RequestMode::Navigate);
    }
    if let Some(accept) = &params.accept {
        request = request.with_header("Accept", accept);
    }
    Ok(request)
}

pub async fn fetch_impl(state: &HostState, params: SwFetchParams) -> Result<CallToolResult, McpError> {
    let request = build_request(state, &params)?;
    let url = request.url.to_string();

    let output = match state.worker.handle_fetch(&request).await? {
        FetchOutcome::PassThrough => SwFetchOutput {
            url,
            intercepted: false,
            kind: None,
            source: None,
            status: None,
            headers: Vec::new(),
            body: None,
            body_len: 0,
        },
        FetchOutcome::Responded(served) => {
            let body = &served.response.body;
            let preview = &body[..body.len().min(BODY_PREVIEW_BYTES)];
            SwFetchOutput {
                url,
                intercepted: true,
                kind: Some(served.kind),
                source: Some(served.source),
                status: Some(served.response.status),
                headers: served.response.headers.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
                body: Some(String::from_utf8_lossy(preview).into_owned()),
                body_len: body.len(),
            }
        }
    };

    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{host_state, output_json};

    #[tokio::test]
    async fn test_relative_navigation_served_from_network() {
        let (state, _) = host_state().await;
        let params = SwFetchParams { url: "/".into(), navigate: true, ..Default::default() };

        let json = output_json(&fetch_impl(&state, params).await.unwrap());
        assert_eq!(json["url"], "https://school.test/");
        assert_eq!(json["intercepted"], true);
        assert_eq!(json["kind"], "navigation");
        assert_eq!(json["source"], "network");
        assert_eq!(json["body"], "<h1>Welcome</h1>");
    }

    #[tokio::test]
    async fn test_offline_navigation_replayed_from_cache() {
        let (state, fetcher) = host_state().await;
        let params = SwFetchParams { url: "/".into(), navigate: true, ..Default::default() };
        fetch_impl(&state, params.clone()).await.unwrap();

        fetcher.set_offline(true);
        let json = output_json(&fetch_impl(&state, params).await.unwrap());
        assert_eq!(json["source"], "cache");
        assert_eq!(json["body"], "<h1>Welcome</h1>");
    }

    #[tokio::test]
    async fn test_post_not_intercepted() {
        let (state, _) = host_state().await;
        let params = SwFetchParams { url: "/api/enquiries".into(), method: Some("post".into()), ..Default::default() };

        let json = output_json(&fetch_impl(&state, params).await.unwrap());
        assert_eq!(json["intercepted"], false);
        assert!(json.get("status").is_none());
    }

    #[tokio::test]
    async fn test_offline_api_miss_is_network_error() {
        let (state, fetcher) = host_state().await;
        fetcher.set_offline(true);
        let params = SwFetchParams { url: "/api/events".into(), ..Default::default() };

        let err = fetch_impl(&state, params).await.unwrap_err();
        assert_eq!(err.code.0, -32004);
    }

    #[tokio::test]
    async fn test_accept_header_makes_navigation() {
        let (state, _) = host_state().await;
        let params = SwFetchParams { url: "/".into(), accept: Some("text/html".into()), ..Default::default() };
        let request = build_request(&state, &params).unwrap();
        assert_eq!(request.headers.get("accept"), Some("text/html"));

        let json = output_json(&fetch_impl(&state, params).await.unwrap());
        assert_eq!(json["kind"], "navigation");
    }

    #[tokio::test]
    async fn test_invalid_input() {
        let (state, _) = host_state().await;
        assert!(build_request(&state, &SwFetchParams::default()).is_err());

        let params = SwFetchParams { url: "/".into(), method: Some("G ET".into()), ..Default::default() };
        assert!(matches!(build_request(&state, &params), Err(Error::InvalidInput(_))));
    }
}
