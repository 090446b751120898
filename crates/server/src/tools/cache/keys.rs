//! cache_keys tool implementation.
//!
//! Lists stores in creation order, or the entries of a single store.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_core::{CacheDb, CacheStorage, StoredEntry};

use crate::tools::json_result;

/// Parameters for the cache_keys tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheKeysParams {
    /// List the entries of this store instead of the store summary.
    #[serde(default)]
    pub store: Option<String>,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct StoreSummary {
    pub name: String,
    pub entries: u64,
}

/// Output from the cache_keys tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(untagged)]
pub enum CacheKeysOutput {
    Stores { stores: Vec<StoreSummary> },
    Entries { store: String, entries: Vec<StoredEntry> },
}

/// Implementation of the cache_keys tool.
pub async fn keys_impl(cache: &CacheDb, params: CacheKeysParams) -> Result<CallToolResult, McpError> {
    let output = match params.store {
        Some(store) => {
            let entries = cache.list_entries(&store).await?;
            CacheKeysOutput::Entries { store, entries }
        }
        None => {
            let mut stores = Vec::new();
            for name in cache.store_names().await? {
                let entries = cache.count_entries(&name).await?;
                stores.push(StoreSummary { name, entries });
            }
            CacheKeysOutput::Stores { stores }
        }
    };

    json_result(&output)
}
