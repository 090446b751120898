//! cache_get tool implementation.
//!
//! Retrieves a stored response by store name and request URL.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::fetch::canonicalize;
use swcache_core::{CacheDb, Error, Request, StoredEntry};
use url::Url;

use crate::tools::json_result;

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Store to look in.
    pub store: String,

    /// Request URL, absolute or relative to the origin.
    pub url: String,

    /// Request method (default: GET).
    #[serde(default)]
    pub method: Option<String>,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct CacheGetOutput {
    #[serde(flatten)]
    pub entry: StoredEntry,
    /// Body as text, lossily decoded.
    pub body: String,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(cache: &CacheDb, origin: &Url, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let url = canonicalize(&params.url, origin).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let request = Request::new(params.method.as_deref().unwrap_or("GET"), url);

    let entry = cache
        .get_entry(&params.store, &request.cache_key())
        .await?
        .ok_or_else(|| Error::CacheMiss(format!("{} in {}", request.url, params.store)))?;

    let body = String::from_utf8_lossy(&entry.body).into_owned();
    json_result(&CacheGetOutput { entry, body })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::output_json;
    use swcache_core::{CacheStorage, Response};

    fn origin() -> Url {
        Url::parse("https://school.test/").unwrap()
    }

    #[tokio::test]
    async fn test_get_impl_missing() {
        let cache = CacheDb::open_in_memory().await.unwrap();
        let params = CacheGetParams { store: "kindergarten-v1".into(), url: "/news".into(), method: None };

        let err = get_impl(&cache, &origin(), params).await.unwrap_err();
        assert_eq!(err.code.0, -32001);
    }

    #[tokio::test]
    async fn test_get_impl_found() {
        let cache = CacheDb::open_in_memory().await.unwrap();
        let request = Request::get_str("https://school.test/news?page=2").unwrap();
        let response = Response::new(200, "page two").with_header("content-type", "text/html");
        cache.put("kindergarten-v1", &request, &response).await.unwrap();

        let params =
            CacheGetParams { store: "kindergarten-v1".into(), url: "/news?page=2#latest".into(), method: None };
        let json = output_json(&get_impl(&cache, &origin(), params).await.unwrap());
        assert_eq!(json["url"], "https://school.test/news?page=2");
        assert_eq!(json["status"], 200);
        assert_eq!(json["body"], "page two");
        assert_eq!(json["body_len"], 8);
    }
}
