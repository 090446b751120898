//! Request classification.
//!
//! Each intercepted GET is sorted into one of four kinds, checked in
//! priority order: navigation, static asset, API call, other.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use swcache_core::{Request, RequestMode};

static STATIC_ASSET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\.(css|js|png|jpg|jpeg|gif|webp|svg|ico|woff|woff2|ttf|eot)$").expect("static asset pattern")
});

/// Path prefixes served by the site's data endpoints.
pub const API_PREFIXES: &[&str] = &["/api/", "/data/"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    Navigation,
    StaticAsset,
    ApiCall,
    Other,
}

/// Caching strategy bound to a [`RequestKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    NetworkFirst,
    CacheFirst,
    NetworkFirstShortCache,
}

impl StrategyKind {
    pub fn for_kind(kind: RequestKind) -> Self {
        match kind {
            RequestKind::Navigation | RequestKind::Other => StrategyKind::NetworkFirst,
            RequestKind::StaticAsset => StrategyKind::CacheFirst,
            RequestKind::ApiCall => StrategyKind::NetworkFirstShortCache,
        }
    }
}

/// Classify a request. Pure function of mode, `Accept` header and URL path.
pub fn classify(request: &Request) -> RequestKind {
    let accepts_html = request.headers.get("accept").is_some_and(|accept| accept.contains("text/html"));
    if request.mode == RequestMode::Navigate || accepts_html {
        return RequestKind::Navigation;
    }

    let path = request.url.path();
    if STATIC_ASSET.is_match(path) {
        return RequestKind::StaticAsset;
    }

    if API_PREFIXES.iter().any(|prefix| path.starts_with(prefix)) {
        return RequestKind::ApiCall;
    }

    RequestKind::Other
}
