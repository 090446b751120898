//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SWCACHE_*)
//! 2. TOML config file (if SWCACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

mod cache_config;
mod validation;

pub use cache_config::{CacheConfig, MissingTimestampPolicy, PrecacheManifest};
pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SWCACHE_*)
/// 2. TOML config file (if SWCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Origin the worker is registered for; relative paths resolve against it.
    ///
    /// Set via SWCACHE_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Path to the SQLite file holding the response stores.
    ///
    /// Set via SWCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for network requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP client timeout in milliseconds.
    ///
    /// Set via SWCACHE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum response body size accepted from the network.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Prefix shared by every store name.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Deployment generation. Bumping it retires every existing store on the
    /// next activation.
    ///
    /// Set via SWCACHE_CACHE_VERSION environment variable.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Maximum age of a cached API response served while offline.
    #[serde(default = "default_api_stale_ttl_secs")]
    pub api_stale_ttl_secs: u64,

    /// Treat cached API responses without a `cached-at` stamp as stale.
    #[serde(default = "default_true")]
    pub strict_api_staleness: bool,

    /// Keep API responses in their own store instead of the navigation store.
    #[serde(default)]
    pub dedicated_api_store: bool,

    /// Upper bound on a network attempt before falling back to cache.
    #[serde(default)]
    pub network_timeout_ms: Option<u64>,

    /// Document served to offline navigations with no cached match.
    #[serde(default = "default_offline_page")]
    pub offline_page: String,

    /// Pages and shell assets cached at install time.
    #[serde(default = "default_precache_pages")]
    pub precache_pages: Vec<String>,

    /// Icons and manifest cached at install time.
    #[serde(default = "default_precache_static")]
    pub precache_static: Vec<String>,

    /// Endpoint refreshed by the `content-sync` periodic sync.
    #[serde(default = "default_critical_content_path")]
    pub critical_content_path: String,

    /// Notification title used when a push payload has none.
    #[serde(default = "default_app_name")]
    pub app_name: String,

    #[serde(default = "default_notification_icon")]
    pub notification_icon: String,

    #[serde(default = "default_notification_badge")]
    pub notification_badge: String,
}

fn default_origin() -> String {
    "http://localhost:3000".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./swcache.sqlite")
}

fn default_user_agent() -> String {
    "swcache/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_cache_prefix() -> String {
    "kindergarten".into()
}

fn default_cache_version() -> String {
    "v1".into()
}

fn default_api_stale_ttl_secs() -> u64 {
    300
}

fn default_true() -> bool {
    true
}

fn default_offline_page() -> String {
    "/offline.html".into()
}

fn default_precache_pages() -> Vec<String> {
    ["/", "/about", "/admissions", "/academics", "/news", "/events", "/teachers", "/offline.html"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_precache_static() -> Vec<String> {
    ["/manifest.json", "/favicon.ico", "/icons/icon-192x192.png", "/icons/icon-512x512.png"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_critical_content_path() -> String {
    "/api/critical-content".into()
}

fn default_app_name() -> String {
    "Kindergarten".into()
}

fn default_notification_icon() -> String {
    "/icons/icon-192x192.png".into()
}

fn default_notification_badge() -> String {
    "/icons/icon-72x72.png".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
            cache_prefix: default_cache_prefix(),
            cache_version: default_cache_version(),
            api_stale_ttl_secs: default_api_stale_ttl_secs(),
            strict_api_staleness: true,
            dedicated_api_store: false,
            network_timeout_ms: None,
            offline_page: default_offline_page(),
            precache_pages: default_precache_pages(),
            precache_static: default_precache_static(),
            critical_content_path: default_critical_content_path(),
            app_name: default_app_name(),
            notification_icon: default_notification_icon(),
            notification_badge: default_notification_badge(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Parsed origin.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if `origin` is not an absolute URL.
    pub fn origin_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.origin).map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })
    }

    /// Name of the navigation store for the current generation.
    pub fn navigation_store(&self) -> String {
        format!("{}-{}", self.cache_prefix, self.cache_version)
    }

    /// Name of the static asset store for the current generation.
    pub fn static_store(&self) -> String {
        format!("{}-static-{}", self.cache_prefix, self.cache_version)
    }

    /// Name of the API store, when API responses are kept apart.
    pub fn api_store(&self) -> Option<String> {
        self.dedicated_api_store.then(|| format!("{}-api-{}", self.cache_prefix, self.cache_version))
    }

    /// Build the cache engine configuration.
    pub fn cache_config(&self) -> Result<CacheConfig, ConfigError> {
        let origin = self.origin_url()?;
        let offline_url = origin
            .join(&self.offline_page)
            .map_err(|e| ConfigError::Invalid { field: "offline_page".into(), reason: e.to_string() })?;

        Ok(CacheConfig {
            navigation_store: self.navigation_store(),
            static_store: self.static_store(),
            api_store: self.api_store(),
            stale_ttl: Duration::from_secs(self.api_stale_ttl_secs),
            missing_timestamp: if self.strict_api_staleness {
                MissingTimestampPolicy::TreatAsStale
            } else {
                MissingTimestampPolicy::ServeCached
            },
            network_timeout: self.network_timeout_ms.map(Duration::from_millis),
            offline_url: Some(offline_url),
        })
    }

    /// Install-time asset lists resolved against the origin.
    pub fn manifest(&self) -> Result<PrecacheManifest, ConfigError> {
        let origin = self.origin_url()?;
        let resolve = |field: &str, paths: &[String]| -> Result<Vec<Url>, ConfigError> {
            paths
                .iter()
                .map(|p| {
                    origin.join(p).map_err(|e| ConfigError::Invalid { field: field.into(), reason: e.to_string() })
                })
                .collect()
        };

        Ok(PrecacheManifest {
            navigation: resolve("precache_pages", &self.precache_pages)?,
            assets: resolve("precache_static", &self.precache_static)?,
        })
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SWCACHE_`
    /// 2. TOML file from `SWCACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SWCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SWCACHE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
