//! Install and activate.
//!
//! Install precaches the app shell for the current generation, all or
//! nothing. Activate retires every store from older generations and takes
//! control of open pages.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::Serialize;
use swcache_core::{Error, PrecacheManifest, Request, Response};
use tokio::task::JoinSet;
use url::Url;

use crate::fetch::Fetcher;
use crate::worker::{LifecycleState, RequestCache};

const BUNDLER_STATIC_DIR: &str = "/_next/static/";

/// Build-hashed paths change every deploy and are never precached.
static HASHED_PATH_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)[.-]([0-9a-f]{8,})(\.[a-z0-9]+)?$").expect("valid hashed path regex"));

/// Whether `url` points at a build-hashed asset.
///
/// A hash is a run of 8+ hex digits after `.` or `-` at the end of the
/// path, containing at least one letter so dates and numeric ids are kept.
pub fn is_build_hashed(url: &Url) -> bool {
    let path = url.path();
    if path.contains(BUNDLER_STATIC_DIR) {
        return true;
    }
    HASHED_PATH_REGEX
        .captures(path)
        .and_then(|caps| caps.get(1))
        .is_some_and(|hash| hash.as_str().bytes().any(|b| b.is_ascii_alphabetic()))
}

#[derive(Debug, Clone, Default, Serialize, schemars::JsonSchema)]
pub struct InstallReport {
    /// URLs stored in the navigation store.
    pub navigation: Vec<String>,
    /// URLs stored in the static store.
    pub assets: Vec<String>,
    /// Build-hashed URLs left out.
    pub skipped: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, schemars::JsonSchema)]
pub struct ActivateReport {
    pub deleted: Vec<String>,
    pub kept: Vec<String>,
}

fn precachable(urls: &[Url], skipped: &mut Vec<String>) -> Vec<Url> {
    urls.iter()
        .filter(|url| {
            if is_build_hashed(url) {
                tracing::debug!(%url, "skipping build-hashed asset");
                skipped.push(url.to_string());
                false
            } else {
                true
            }
        })
        .cloned()
        .collect()
}

/// Fetch every URL concurrently, stopping at the first failure.
async fn fetch_all(fetcher: &Arc<dyn Fetcher>, urls: Vec<Url>) -> Result<Vec<(Request, Response)>, Error> {
    let mut join_set = JoinSet::new();
    let mut in_flight = HashMap::with_capacity(urls.len());
    for (index, url) in urls.into_iter().enumerate() {
        let fetcher = Arc::clone(fetcher);
        let request = Request::get(url);
        let task_url = request.url.to_string();
        let task = join_set.spawn(async move {
            let result = fetcher.fetch(&request).await;
            (index, request, result)
        });
        in_flight.insert(task.id(), task_url);
    }

    let mut fetched = Vec::with_capacity(join_set.len());
    while let Some(joined) = join_set.join_next().await {
        let (index, request, result) = joined.map_err(|e| Error::InstallFailed {
            url: in_flight.remove(&e.id()).unwrap_or_default(),
            reason: format!("install task failed: {e}"),
        })?;

        let failure = match result {
            Ok(response) if response.ok() => {
                fetched.push((index, request, response));
                continue;
            }
            Ok(response) => format!("HTTP {}", response.status),
            Err(e) => e.to_string(),
        };

        join_set.shutdown().await;
        return Err(Error::InstallFailed { url: request.url.to_string(), reason: failure });
    }

    fetched.sort_by_key(|(index, ..)| *index);
    Ok(fetched.into_iter().map(|(_, request, response)| (request, response)).collect())
}

impl RequestCache {
    /// Precache `manifest` into the current generation's stores, then ask
    /// to activate without waiting.
    ///
    /// # Errors
    ///
    /// Returns `Error::InstallFailed` if any asset fails to fetch or answers
    /// with a non-2xx status; nothing is stored in that case. Storage errors
    /// are propagated.
    pub async fn install(&self, manifest: &PrecacheManifest) -> Result<InstallReport, Error> {
        let previous = {
            let mut state = self.state.write().await;
            std::mem::replace(&mut *state, LifecycleState::Installing)
        };
        tracing::info!("installing");

        match self.precache(manifest).await {
            Ok(report) => {
                *self.state.write().await = LifecycleState::Installed;
                tracing::info!(
                    navigation = report.navigation.len(),
                    assets = report.assets.len(),
                    skipped = report.skipped.len(),
                    "installed"
                );
                self.control.skip_waiting().await;
                Ok(report)
            }
            Err(e) => {
                *self.state.write().await = previous;
                tracing::warn!(error = %e, "install failed");
                Err(e)
            }
        }
    }

    async fn precache(&self, manifest: &PrecacheManifest) -> Result<InstallReport, Error> {
        let mut skipped = Vec::new();
        let navigation = precachable(&manifest.navigation, &mut skipped);
        let assets = precachable(&manifest.assets, &mut skipped);
        let split = navigation.len();

        let mut fetched = fetch_all(&self.engine.fetcher, navigation.into_iter().chain(assets).collect()).await?;
        let static_entries = fetched.split_off(split);

        let config = &self.engine.config;
        self.engine.storage.put_all(&config.navigation_store, &fetched).await?;
        self.engine.storage.put_all(&config.static_store, &static_entries).await?;

        Ok(InstallReport {
            navigation: fetched.iter().map(|(request, _)| request.url.to_string()).collect(),
            assets: static_entries.iter().map(|(request, _)| request.url.to_string()).collect(),
            skipped,
        })
    }

    /// Delete every store outside the current generation, then claim open
    /// pages.
    ///
    /// # Errors
    ///
    /// Returns an error only when the store list cannot be read; individual
    /// deletion failures are logged and skipped.
    pub async fn activate(&self) -> Result<ActivateReport, Error> {
        *self.state.write().await = LifecycleState::Activating;
        tracing::info!("activating");

        let keep = self.engine.config.current_stores();
        let mut report = ActivateReport::default();

        for name in self.engine.storage.store_names().await? {
            if keep.contains(&name.as_str()) {
                report.kept.push(name);
                continue;
            }
            match self.engine.storage.delete_store(&name).await {
                Ok(_) => {
                    tracing::info!(store = %name, "deleted old store");
                    report.deleted.push(name);
                }
                Err(e) => tracing::warn!(store = %name, error = %e, "failed to delete old store"),
            }
        }

        self.control.claim().await;
        *self.state.write().await = LifecycleState::Activated;
        tracing::info!(deleted = report.deleted.len(), kept = report.kept.len(), "activated");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::{ControlAction, RecordingControl};
    use crate::events::EventSettings;
    use crate::strategy::test_support::ScriptedFetcher;
    use async_trait::async_trait;
    use swcache_core::{CacheConfig, CacheStorage, MemoryCacheStorage};

    struct Fixture {
        worker: RequestCache,
        fetcher: Arc<ScriptedFetcher>,
        storage: Arc<MemoryCacheStorage>,
        control: Arc<RecordingControl>,
    }

    fn fixture_with(storage: Arc<dyn CacheStorage>, memory: Arc<MemoryCacheStorage>) -> Fixture {
        let fetcher = Arc::new(ScriptedFetcher::new());
        let control = Arc::new(RecordingControl::new());
        let worker = RequestCache::new(
            CacheConfig::new("kindergarten-v1", "kindergarten-static-v1"),
            fetcher.clone(),
            storage,
            control.clone(),
            EventSettings::for_origin(&Url::parse("https://school.test/").unwrap()),
        );
        Fixture { worker, fetcher, storage: memory, control }
    }

    fn fixture() -> Fixture {
        let storage = Arc::new(MemoryCacheStorage::new());
        fixture_with(storage.clone(), storage)
    }

    fn url(path: &str) -> Url {
        Url::parse("https://school.test/").unwrap().join(path).unwrap()
    }

    fn manifest() -> PrecacheManifest {
        PrecacheManifest {
            navigation: vec![url("/"), url("/about"), url("/offline.html")],
            assets: vec![url("/manifest.json"), url("/icons/icon-192x192.png")],
        }
    }

    fn route_all(fetcher: &ScriptedFetcher, manifest: &PrecacheManifest) {
        for u in manifest.navigation.iter().chain(&manifest.assets) {
            fetcher.route(u.as_str(), Response::new(200, format!("body of {}", u.path())));
        }
    }

    #[test]
    fn test_build_hashed_detection() {
        assert!(is_build_hashed(&url("/_next/static/chunks/main.js")));
        assert!(is_build_hashed(&url("/assets/app.3f9a2c1b.js")));
        assert!(is_build_hashed(&url("/assets/vendor-0123456789abcdef.css")));
        assert!(!is_build_hashed(&url("/manifest.json")));
        assert!(!is_build_hashed(&url("/icons/icon-192x192.png")));
        assert!(!is_build_hashed(&url("/about")));
    }

    #[test]
    fn test_numeric_slugs_are_not_build_hashed() {
        assert!(!is_build_hashed(&url("/events/20260315")));
        assert!(!is_build_hashed(&url("/photos/team-20250101.jpg")));
        assert!(!is_build_hashed(&url("/news/12345678")));
        assert!(is_build_hashed(&url("/photos/team-2025a101.jpg")));
    }

    #[tokio::test]
    async fn test_install_stores_everything() {
        let f = fixture();
        let manifest = manifest();
        route_all(&f.fetcher, &manifest);

        let report = f.worker.install(&manifest).await.unwrap();
        assert_eq!(report.navigation.len(), 3);
        assert_eq!(report.assets.len(), 2);
        assert!(report.skipped.is_empty());

        assert_eq!(f.storage.len("kindergarten-v1").await, Some(3));
        assert_eq!(f.storage.len("kindergarten-static-v1").await, Some(2));
        assert_eq!(f.worker.state().await, LifecycleState::Installed);
        assert_eq!(f.control.actions(), vec![ControlAction::SkipWaiting]);
    }

    #[tokio::test]
    async fn test_install_skips_hashed_assets() {
        let f = fixture();
        let mut manifest = manifest();
        manifest.assets.push(url("/_next/static/chunks/app.js"));
        route_all(&f.fetcher, &manifest);

        let report = f.worker.install(&manifest).await.unwrap();
        assert_eq!(report.skipped, vec!["https://school.test/_next/static/chunks/app.js".to_string()]);
        assert_eq!(f.storage.len("kindergarten-static-v1").await, Some(2));
        assert_eq!(f.fetcher.calls(), 5);
    }

    #[tokio::test]
    async fn test_install_is_all_or_nothing() {
        let f = fixture();
        let mut manifest = manifest();
        route_all(&f.fetcher, &manifest);
        manifest.navigation.push(url("/missing"));

        let err = f.worker.install(&manifest).await.unwrap_err();
        match err {
            Error::InstallFailed { url, reason } => {
                assert_eq!(url, "https://school.test/missing");
                assert_eq!(reason, "HTTP 404");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(f.storage.store_names().await.unwrap().is_empty());
        assert_eq!(f.worker.state().await, LifecycleState::Parsed);
        assert!(f.control.actions().is_empty());
    }

    #[tokio::test]
    async fn test_install_offline_fails() {
        let f = fixture();
        f.fetcher.set_offline(true);
        let err = f.worker.install(&manifest()).await.unwrap_err();
        assert!(matches!(err, Error::InstallFailed { .. }));
    }

    struct PanickingFetcher {
        path: &'static str,
    }

    #[async_trait]
    impl Fetcher for PanickingFetcher {
        async fn fetch(&self, request: &Request) -> Result<Response, Error> {
            if request.url.path() == self.path {
                panic!("fetcher crashed on {}", self.path);
            }
            Ok(Response::new(200, "ok"))
        }
    }

    #[tokio::test]
    async fn test_install_crashed_fetch_names_url() {
        let storage = Arc::new(MemoryCacheStorage::new());
        let worker = RequestCache::new(
            CacheConfig::new("kindergarten-v1", "kindergarten-static-v1"),
            Arc::new(PanickingFetcher { path: "/about" }),
            storage.clone(),
            Arc::new(RecordingControl::new()),
            EventSettings::for_origin(&Url::parse("https://school.test/").unwrap()),
        );

        match worker.install(&manifest()).await.unwrap_err() {
            Error::InstallFailed { url, reason } => {
                assert_eq!(url, "https://school.test/about");
                assert!(reason.starts_with("install task failed"), "{reason}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(storage.store_names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_activate_removes_old_generations() {
        let f = fixture();
        let request = Request::get(url("/"));
        for store in ["kindergarten-v0", "kindergarten-static-v0", "kindergarten-v1", "kindergarten-static-v1"] {
            f.storage.put(store, &request, &Response::new(200, store)).await.unwrap();
        }

        let report = f.worker.activate().await.unwrap();
        assert_eq!(report.deleted, vec!["kindergarten-v0", "kindergarten-static-v0"]);
        assert_eq!(report.kept, vec!["kindergarten-v1", "kindergarten-static-v1"]);
        assert_eq!(f.storage.store_names().await.unwrap(), vec!["kindergarten-v1", "kindergarten-static-v1"]);
        assert_eq!(f.worker.state().await, LifecycleState::Activated);
        assert_eq!(f.control.actions(), vec![ControlAction::Claim]);
    }

    /// Storage whose deletes always fail.
    struct StubbornStorage(Arc<MemoryCacheStorage>);

    #[async_trait]
    impl CacheStorage for StubbornStorage {
        async fn open(&self, store: &str) -> Result<(), Error> {
            self.0.open(store).await
        }
        async fn match_in(&self, store: &str, request: &Request) -> Result<Option<Response>, Error> {
            self.0.match_in(store, request).await
        }
        async fn match_any(&self, request: &Request) -> Result<Option<Response>, Error> {
            self.0.match_any(request).await
        }
        async fn put(&self, store: &str, request: &Request, response: &Response) -> Result<(), Error> {
            self.0.put(store, request, response).await
        }
        async fn put_all(&self, store: &str, entries: &[(Request, Response)]) -> Result<(), Error> {
            self.0.put_all(store, entries).await
        }
        async fn store_names(&self) -> Result<Vec<String>, Error> {
            self.0.store_names().await
        }
        async fn delete_store(&self, _store: &str) -> Result<bool, Error> {
            Err(Error::InvalidInput("locked".into()))
        }
    }

    #[tokio::test]
    async fn test_activate_tolerates_delete_failures() {
        let memory = Arc::new(MemoryCacheStorage::new());
        memory.open("kindergarten-v0").await.unwrap();
        let f = fixture_with(Arc::new(StubbornStorage(memory.clone())), memory);

        let report = f.worker.activate().await.unwrap();
        assert!(report.deleted.is_empty());
        assert_eq!(f.worker.state().await, LifecycleState::Activated);
        assert_eq!(f.control.actions(), vec![ControlAction::Claim]);
    }
}
