//! cache_delete tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_core::{CacheDb, CacheStorage, Error};

use crate::tools::json_result;

/// Parameters for the cache_delete tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheDeleteParams {
    /// Store to delete, with all its entries.
    pub store: String,
}

/// Output from the cache_delete tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct CacheDeleteOutput {
    pub store: String,
    /// False when no such store existed.
    pub deleted: bool,
}

/// Implementation of the cache_delete tool.
pub async fn delete_impl(cache: &CacheDb, params: CacheDeleteParams) -> Result<CallToolResult, McpError> {
    if params.store.is_empty() {
        return Err(Error::InvalidInput("store cannot be empty".into()).into());
    }

    let deleted = cache.delete_store(&params.store).await?;
    tracing::info!(store = %params.store, deleted, "cache_delete");
    json_result(&CacheDeleteOutput { store: params.store, deleted })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::output_json;
    use swcache_core::{Request, Response};

    #[tokio::test]
    async fn test_delete_store() {
        let cache = CacheDb::open_in_memory().await.unwrap();
        let request = Request::get_str("https://school.test/").unwrap();
        cache.put("kindergarten-v0", &request, &Response::new(200, "old")).await.unwrap();

        let params = CacheDeleteParams { store: "kindergarten-v0".into() };
        let json = output_json(&delete_impl(&cache, params.clone()).await.unwrap());
        assert_eq!(json["deleted"], true);
        assert_eq!(cache.count_entries("kindergarten-v0").await.unwrap(), 0);

        let json = output_json(&delete_impl(&cache, params).await.unwrap());
        assert_eq!(json["deleted"], false);
    }

    #[tokio::test]
    async fn test_delete_requires_store() {
        let cache = CacheDb::open_in_memory().await.unwrap();
        let result = delete_impl(&cache, CacheDeleteParams { store: String::new() }).await;
        assert!(result.is_err());
    }
}
