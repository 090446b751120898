//! Caching strategies.
//!
//! - [`network_first`]: navigations and unclassified requests
//! - [`cache_first`]: static assets, with background revalidation
//! - [`api`]: API calls, network first with a short-lived cached fallback
//!
//! Storage failures never fail a request: they are logged and treated as a
//! cache miss (on reads) or skipped (on writes).

pub mod api;
pub mod cache_first;
pub mod network_first;

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use swcache_core::{CacheConfig, CacheStorage, Error, Request, Response};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::clock::Clock;
use crate::fetch::Fetcher;

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    Network,
    Cache,
    /// The configured offline document.
    OfflineFallback,
    /// Built locally because nothing else was available.
    Synthesized,
}

/// Shared collaborators for every strategy.
pub struct Engine {
    pub config: CacheConfig,
    pub fetcher: Arc<dyn Fetcher>,
    pub storage: Arc<dyn CacheStorage>,
    pub clock: Arc<dyn Clock>,
}

impl Engine {
    /// Network attempt bounded by the configured timeout, if any.
    pub(crate) async fn fetch_bounded(&self, request: &Request) -> Result<Response, Error> {
        match self.config.network_timeout {
            Some(limit) => tokio::time::timeout(limit, self.fetcher.fetch(request))
                .await
                .map_err(|_| Error::FetchTimeout(format!("{} after {}ms", request.url, limit.as_millis())))?,
            None => self.fetcher.fetch(request).await,
        }
    }

    /// Look `request` up in any store; storage errors count as a miss.
    pub(crate) async fn lookup(&self, request: &Request) -> Option<Response> {
        match self.storage.match_any(request).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "cache lookup failed, treating as miss");
                None
            }
        }
    }

    /// Store `response` in `store`; failures are logged and skipped.
    pub(crate) async fn store(&self, store: &str, request: &Request, response: &Response) {
        if let Err(e) = self.storage.put(store, request, response).await {
            tracing::warn!(store, url = %request.url, error = %e, "cache write failed");
        }
    }
}

/// Detached tasks spawned off the response path.
///
/// Nobody awaits them on the request path; [`Background::settle`] exists for
/// shutdown and tests.
#[derive(Default)]
pub struct Background {
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Background {
    pub(crate) async fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(task);
        let mut tasks = self.tasks.lock().await;
        tasks.retain(|t| !t.is_finished());
        tasks.push(handle);
    }

    /// Wait for every task spawned so far.
    pub async fn settle(&self) {
        let tasks = std::mem::take(&mut *self.tasks.lock().await);
        for task in tasks {
            if let Err(e) = task.await {
                tracing::debug!(error = %e, "background task aborted");
            }
        }
    }

    pub async fn pending(&self) -> usize {
        self.tasks.lock().await.iter().filter(|t| !t.is_finished()).count()
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use std::time::Duration;
    use swcache_core::MemoryCacheStorage;
    use test_support::HangingFetcher;

    #[tokio::test]
    async fn test_fetch_bounded_times_out() {
        let engine = Engine {
            config: CacheConfig {
                network_timeout: Some(Duration::from_millis(20)),
                ..CacheConfig::new("nav", "static")
            },
            fetcher: Arc::new(HangingFetcher),
            storage: Arc::new(MemoryCacheStorage::new()),
            clock: Arc::new(SystemClock),
        };
        let result = engine.fetch_bounded(&Request::get_str("https://school.test/").unwrap()).await;
        assert!(matches!(result, Err(Error::FetchTimeout(_))));
    }

    #[tokio::test]
    async fn test_background_settle() {
        let background = Background::default();
        let (tx, rx) = tokio::sync::oneshot::channel();
        background
            .spawn(async move {
                let _ = tx.send(42);
            })
            .await;
        background.settle().await;
        assert_eq!(rx.await.unwrap(), 42);
        assert_eq!(background.pending().await, 0);
    }
}
