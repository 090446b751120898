//! swcache worker host entry point.
//!
//! Boots a request cache over the SQLite store and serves it as an MCP server
//! on stdio transport. Logging goes to stderr to avoid interfering with the
//! JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use swcache_client::{EventSettings, FetchConfig, HttpFetcher, RecordingControl, RequestCache};
use swcache_core::{AppConfig, CacheDb};
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

use handler::{HostState, SwCacheHost};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    let db = CacheDb::open(&config.db_path).await?;
    let fetcher = HttpFetcher::new(FetchConfig::from_app(&config))?;
    let control = Arc::new(RecordingControl::new());

    let worker = RequestCache::new(
        config.cache_config()?,
        Arc::new(fetcher),
        Arc::new(db.clone()),
        control.clone(),
        EventSettings::from_config(&config)?,
    );
    let state = Arc::new(HostState {
        worker,
        db,
        control,
        manifest: config.manifest()?,
        origin: config.origin_url()?,
    });

    tracing::info!(
        origin = %state.origin,
        db = %config.db_path.display(),
        version = %config.cache_version,
        "Starting swcache worker host on stdio transport"
    );

    let handler = SwCacheHost::new(state.clone());
    let server = serve_server(handler, stdio()).await?;
    server.waiting().await?;

    state.worker.settle().await;
    tracing::info!("worker host stopped");

    Ok(())
}
