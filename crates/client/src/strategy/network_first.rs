//! Network first, falling back to any cached copy.
//!
//! Navigations that miss the cache while offline get the offline document,
//! or a bare 503 when even that was never cached.

use swcache_core::{Error, Request, Response};

use super::{Engine, ResponseSource};
use crate::classify::RequestKind;

/// Body of the synthesized offline response.
pub const OFFLINE_BODY: &str = "Offline";

pub async fn handle(
    engine: &Engine, request: &Request, kind: RequestKind,
) -> Result<(Response, ResponseSource), Error> {
    let network_error = match engine.fetch_bounded(request).await {
        Ok(response) => {
            if response.ok() {
                engine.store(&engine.config.navigation_store, request, &response).await;
            }
            return Ok((response, ResponseSource::Network));
        }
        Err(e) => e,
    };

    tracing::debug!(url = %request.url, error = %network_error, "network failed, trying cache");

    if let Some(cached) = engine.lookup(request).await {
        return Ok((cached, ResponseSource::Cache));
    }

    if kind != RequestKind::Navigation {
        return Err(network_error);
    }

    if let Some(offline_url) = &engine.config.offline_url
        && let Some(page) = engine.lookup(&Request::get(offline_url.clone())).await
    {
        return Ok((page, ResponseSource::OfflineFallback));
    }

    Ok((offline_response(), ResponseSource::Synthesized))
}

/// Minimal 503 returned when nothing better is cached.
pub fn offline_response() -> Response {
    Response::new(503, OFFLINE_BODY).with_header("Content-Type", "text/plain")
}
