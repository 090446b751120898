//! Engine-facing configuration values.

use std::time::Duration;

use url::Url;

/// What to do with a cached API response that carries no `cached-at` stamp.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MissingTimestampPolicy {
    /// Unknown age counts as stale; the network error is surfaced.
    #[default]
    TreatAsStale,
    /// Serve the entry regardless of age.
    ServeCached,
}

/// Store names and staleness rules for one deployment generation.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Store for page shells, navigations and (by default) API responses.
    pub navigation_store: String,
    /// Store for icons, fonts, scripts and styles.
    pub static_store: String,
    /// Separate store for API responses. `None` shares the navigation store.
    pub api_store: Option<String>,
    /// Maximum age of a cached API response served after a network failure.
    pub stale_ttl: Duration,
    pub missing_timestamp: MissingTimestampPolicy,
    /// Bound on network attempts in the network-first strategies.
    pub network_timeout: Option<Duration>,
    /// Document returned to offline navigations without a cached match.
    pub offline_url: Option<Url>,
}

impl CacheConfig {
    /// Config with the given store names and the default five minute TTL.
    pub fn new(navigation_store: impl Into<String>, static_store: impl Into<String>) -> Self {
        Self {
            navigation_store: navigation_store.into(),
            static_store: static_store.into(),
            api_store: None,
            stale_ttl: Duration::from_secs(300),
            missing_timestamp: MissingTimestampPolicy::default(),
            network_timeout: None,
            offline_url: None,
        }
    }

    /// Store that receives annotated API responses.
    pub fn api_target(&self) -> &str {
        self.api_store.as_deref().unwrap_or(&self.navigation_store)
    }

    /// Stores that survive activation.
    pub fn current_stores(&self) -> Vec<&str> {
        let mut stores = vec![self.navigation_store.as_str(), self.static_store.as_str()];
        if let Some(api) = &self.api_store {
            stores.push(api);
        }
        stores
    }
}

/// Assets fetched and stored during install.
#[derive(Debug, Clone, Default)]
pub struct PrecacheManifest {
    /// Stored in the navigation store.
    pub navigation: Vec<Url>,
    /// Stored in the static store.
    pub assets: Vec<Url>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_target_defaults_to_navigation_store() {
        let config = CacheConfig::new("v1-nav", "v1-static");
        assert_eq!(config.api_target(), "v1-nav");
        assert_eq!(config.current_stores(), vec!["v1-nav", "v1-static"]);
    }

    #[test]
    fn test_dedicated_api_store() {
        let config = CacheConfig { api_store: Some("v1-api".into()), ..CacheConfig::new("v1-nav", "v1-static") };
        assert_eq!(config.api_target(), "v1-api");
        assert_eq!(config.current_stores(), vec!["v1-nav", "v1-static", "v1-api"]);
    }
}
