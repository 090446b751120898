//! Network first for API calls, with a short-lived offline fallback.
//!
//! Successful responses are stored with a `cached-at` stamp. When the network
//! fails, a cached copy is served only while it is younger than the
//! configured TTL; older copies, and copies with no readable stamp under the
//! strict policy, surface the original network error instead.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use swcache_core::{Error, MissingTimestampPolicy, Request, Response};

use super::{Engine, ResponseSource};

/// Header carrying the time an API response was stored.
pub const CACHED_AT_HEADER: &str = "cached-at";

/// Age classification of a cached API response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Fresh,
    Stale,
    /// No readable `cached-at` stamp.
    Unknown,
}

/// Parse a `cached-at` value: RFC 3339, or milliseconds since the epoch.
pub fn parse_cached_at(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(value) {
        return Some(at.with_timezone(&Utc));
    }
    value.parse::<i64>().ok().and_then(DateTime::from_timestamp_millis)
}

/// Classify `response` against `ttl` at `now`. An age equal to the TTL is
/// still fresh.
pub fn freshness(response: &Response, now: DateTime<Utc>, ttl: std::time::Duration) -> Freshness {
    let Some(cached_at) = response.headers.get(CACHED_AT_HEADER).and_then(parse_cached_at) else {
        return Freshness::Unknown;
    };
    let ttl = Duration::from_std(ttl).unwrap_or(Duration::MAX);
    if now - cached_at <= ttl { Freshness::Fresh } else { Freshness::Stale }
}

pub async fn handle(engine: &Engine, request: &Request) -> Result<(Response, ResponseSource), Error> {
    let network_error = match engine.fetch_bounded(request).await {
        Ok(response) => {
            if response.ok() {
                let stamp = engine.clock.now().to_rfc3339_opts(SecondsFormat::Millis, true);
                let stamped = response.clone().with_header(CACHED_AT_HEADER, &stamp);
                engine.store(engine.config.api_target(), request, &stamped).await;
            }
            return Ok((response, ResponseSource::Network));
        }
        Err(e) => e,
    };

    let Some(cached) = engine.lookup(request).await else {
        tracing::debug!(url = %request.url, error = %network_error, "api call failed with no cached copy");
        return Err(network_error);
    };

    let serve = match freshness(&cached, engine.clock.now(), engine.config.stale_ttl) {
        Freshness::Fresh => true,
        Freshness::Stale => false,
        Freshness::Unknown => engine.config.missing_timestamp == MissingTimestampPolicy::ServeCached,
    };

    if serve {
        tracing::debug!(url = %request.url, "api call failed, serving cached copy");
        Ok((cached, ResponseSource::Cache))
    } else {
        tracing::debug!(url = %request.url, "api call failed, cached copy too old");
        Err(network_error)
    }
}
