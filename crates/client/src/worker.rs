//! The request cache: a service-worker style interceptor in front of the
//! network.
//!
//! Every intercepted request is classified and handed to the strategy bound
//! to its kind. Requests the cache must not touch (non-GET, non-http schemes)
//! come back as [`FetchOutcome::PassThrough`] for the host's default handling.

use std::sync::Arc;

use serde::Serialize;
use swcache_core::{CacheConfig, CacheStorage, Error, Request, Response};
use tokio::sync::RwLock;

use crate::classify::{RequestKind, StrategyKind, classify};
use crate::clock::{Clock, SystemClock};
use crate::control::ClientControl;
use crate::events::EventSettings;
use crate::fetch::{Fetcher, is_fetchable_scheme};
use crate::strategy::{Background, Engine, ResponseSource, api, cache_first, network_first};

/// Worker lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
}

/// A response produced by the cache, with how it was obtained.
#[derive(Debug, Clone)]
pub struct Served {
    pub response: Response,
    pub source: ResponseSource,
    pub kind: RequestKind,
}

#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// Not intercepted; the host performs its default network handling.
    PassThrough,
    Responded(Served),
}

impl FetchOutcome {
    pub fn served(&self) -> Option<&Served> {
        match self {
            FetchOutcome::PassThrough => None,
            FetchOutcome::Responded(served) => Some(served),
        }
    }
}

pub struct RequestCache {
    pub(crate) engine: Arc<Engine>,
    pub(crate) control: Arc<dyn ClientControl>,
    pub(crate) events: EventSettings,
    pub(crate) state: RwLock<LifecycleState>,
    background: Background,
}

impl RequestCache {
    pub fn new(
        config: CacheConfig, fetcher: Arc<dyn Fetcher>, storage: Arc<dyn CacheStorage>,
        control: Arc<dyn ClientControl>, events: EventSettings,
    ) -> Self {
        Self::with_clock(config, fetcher, storage, control, events, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: CacheConfig, fetcher: Arc<dyn Fetcher>, storage: Arc<dyn CacheStorage>,
        control: Arc<dyn ClientControl>, events: EventSettings, clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            engine: Arc::new(Engine { config, fetcher, storage, clock }),
            control,
            events,
            state: RwLock::new(LifecycleState::Parsed),
            background: Background::default(),
        }
    }

    pub async fn state(&self) -> LifecycleState {
        *self.state.read().await
    }

    /// Handle one intercepted request.
    ///
    /// # Errors
    ///
    /// Returns the network error when the chosen strategy has no cached
    /// fallback to offer.
    pub async fn handle_fetch(&self, request: &Request) -> Result<FetchOutcome, Error> {
        if !request.is_get() {
            tracing::debug!(method = %request.method, url = %request.url, "not intercepting non-GET request");
            return Ok(FetchOutcome::PassThrough);
        }

        if !is_fetchable_scheme(&request.url) {
            tracing::debug!(url = %request.url, "not intercepting non-http request");
            return Ok(FetchOutcome::PassThrough);
        }

        let kind = classify(request);
        let (response, source) = match StrategyKind::for_kind(kind) {
            StrategyKind::NetworkFirst => network_first::handle(&self.engine, request, kind).await?,
            StrategyKind::CacheFirst => cache_first::handle(&self.engine, &self.background, request).await?,
            StrategyKind::NetworkFirstShortCache => api::handle(&self.engine, request).await?,
        };

        tracing::debug!(url = %request.url, ?kind, ?source, status = response.status, "served");
        Ok(FetchOutcome::Responded(Served { response, source, kind }))
    }

    /// Wait for background revalidations spawned so far.
    pub async fn settle(&self) {
        self.background.settle().await;
    }

    /// Background revalidations still running.
    pub async fn pending_revalidations(&self) -> usize {
        self.background.pending().await
    }
}
