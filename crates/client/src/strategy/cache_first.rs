//! Cache first with stale-while-revalidate.
//!
//! A hit is returned at once while a detached task refetches the asset and
//! overwrites the static store entry. A miss goes to the network and stores
//! the result.

use std::sync::Arc;

use swcache_core::{Error, Request, Response};

use super::{Background, Engine, ResponseSource};

pub async fn handle(
    engine: &Arc<Engine>, background: &Background, request: &Request,
) -> Result<(Response, ResponseSource), Error> {
    if let Some(cached) = engine.lookup(request).await {
        tracing::debug!(url = %request.url, "static cache hit, revalidating in background");
        let engine = Arc::clone(engine);
        let request = request.clone();
        background.spawn(async move { revalidate(&engine, &request).await }).await;
        return Ok((cached, ResponseSource::Cache));
    }

    let response = engine.fetcher.fetch(request).await?;
    if response.ok() {
        engine.store(&engine.config.static_store, request, &response).await;
    }
    Ok((response, ResponseSource::Network))
}

async fn revalidate(engine: &Engine, request: &Request) {
    match engine.fetcher.fetch(request).await {
        Ok(fresh) if fresh.ok() => {
            engine.store(&engine.config.static_store, request, &fresh).await;
            tracing::debug!(url = %request.url, "revalidated static asset");
        }
        Ok(fresh) => {
            tracing::debug!(url = %request.url, status = fresh.status, "revalidation skipped: non-success status");
        }
        Err(e) => {
            tracing::debug!(url = %request.url, error = %e, "revalidation failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::strategy::test_support::ScriptedFetcher;
    use swcache_core::{CacheConfig, CacheStorage, MemoryCacheStorage};

    fn setup() -> (Arc<Engine>, Arc<ScriptedFetcher>, Arc<MemoryCacheStorage>) {
        let fetcher = Arc::new(ScriptedFetcher::new());
        let storage = Arc::new(MemoryCacheStorage::new());
        let engine = Arc::new(Engine {
            config: CacheConfig::new("v1-nav", "v1-static"),
            fetcher: fetcher.clone(),
            storage: storage.clone(),
            clock: Arc::new(SystemClock),
        });
        (engine, fetcher, storage)
    }

    const LOGO: &str = "https://school.test/images/logo.png";

    #[tokio::test]
    async fn test_stale_while_revalidate() {
        let (engine, fetcher, _storage) = setup();
        let background = Background::default();
        let request = Request::get_str(LOGO).unwrap();

        fetcher.route(LOGO, Response::new(200, "logo-v1"));
        let (first, source) = handle(&engine, &background, &request).await.unwrap();
        assert_eq!(first.body, "logo-v1");
        assert_eq!(source, ResponseSource::Network);

        fetcher.route(LOGO, Response::new(200, "logo-v2"));
        let (second, source) = handle(&engine, &background, &request).await.unwrap();
        assert_eq!(second.body, "logo-v1");
        assert_eq!(source, ResponseSource::Cache);

        background.settle().await;
        let (third, source) = handle(&engine, &background, &request).await.unwrap();
        assert_eq!(third.body, "logo-v2");
        assert_eq!(source, ResponseSource::Cache);
    }

    #[tokio::test]
    async fn test_hit_served_offline_and_refresh_failure_swallowed() {
        let (engine, fetcher, storage) = setup();
        let background = Background::default();
        let request = Request::get_str(LOGO).unwrap();
        storage.put("v1-static", &request, &Response::new(200, "cached")).await.unwrap();
        fetcher.set_offline(true);

        let (response, source) = handle(&engine, &background, &request).await.unwrap();
        assert_eq!(response.body, "cached");
        assert_eq!(source, ResponseSource::Cache);

        background.settle().await;
        let stored = storage.match_in("v1-static", &request).await.unwrap().unwrap();
        assert_eq!(stored.body, "cached");
    }

    #[tokio::test]
    async fn test_revalidation_ignores_error_status() {
        let (engine, fetcher, storage) = setup();
        let background = Background::default();
        let request = Request::get_str(LOGO).unwrap();
        storage.put("v1-static", &request, &Response::new(200, "cached")).await.unwrap();
        fetcher.route(LOGO, Response::new(500, "oops"));

        handle(&engine, &background, &request).await.unwrap();
        background.settle().await;

        let stored = storage.match_in("v1-static", &request).await.unwrap().unwrap();
        assert_eq!(stored.body, "cached");
    }

    #[tokio::test]
    async fn test_miss_offline_propagates() {
        let (engine, fetcher, _storage) = setup();
        fetcher.set_offline(true);

        let result = handle(&engine, &Background::default(), &Request::get_str(LOGO).unwrap()).await;
        assert!(matches!(result, Err(Error::Network(_))));
    }
}
