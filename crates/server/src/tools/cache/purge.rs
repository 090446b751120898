//! cache_purge tool implementation.
//!
//! Purges entries of one store by age.

use chrono::{Duration, Utc};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_core::{CacheDb, Error};

use crate::tools::json_result;

/// Parameters for the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeParams {
    /// Store to purge.
    pub store: String,

    /// Purge entries stored more than this many seconds ago.
    pub older_than_secs: i64,
}

/// Output from the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeOutput {
    /// Number of entries deleted.
    pub deleted: u64,
}

/// Implementation of the cache_purge tool.
pub async fn purge_impl(cache: &CacheDb, params: CachePurgeParams) -> Result<CallToolResult, McpError> {
    if params.older_than_secs < 0 {
        return Err(Error::InvalidInput("older_than_secs cannot be negative".into()).into());
    }

    let cutoff = Utc::now() - Duration::seconds(params.older_than_secs);
    let deleted = cache.purge_entries_older_than(&params.store, cutoff).await?;
    json_result(&CachePurgeOutput { deleted })
}
