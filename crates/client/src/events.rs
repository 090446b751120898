//! Auxiliary worker events: background sync, push, notification click and
//! periodic sync.

use serde::Deserialize;
use swcache_core::{AppConfig, ConfigError, Error, Request};
use url::Url;

use crate::control::{NotificationAction, NotificationData, NotificationOptions};
use crate::worker::RequestCache;

pub const BACKGROUND_SYNC_TAG: &str = "background-sync";
pub const CONTENT_SYNC_TAG: &str = "content-sync";
pub const EXPLORE_ACTION: &str = "explore";
pub const CLOSE_ACTION: &str = "close";

const VIBRATE_PATTERN: [u32; 3] = [100, 50, 100];

/// Deployment values the auxiliary events need.
#[derive(Debug, Clone)]
pub struct EventSettings {
    /// Opened when a notification's explore action is clicked.
    pub root_url: Url,
    /// Refreshed on `content-sync`.
    pub critical_content_url: Url,
    /// Notification title when a push carries none.
    pub app_name: String,
    pub icon: String,
    pub badge: String,
}

impl EventSettings {
    /// Defaults for `origin`.
    pub fn for_origin(origin: &Url) -> Self {
        let mut root_url = origin.clone();
        root_url.set_path("/");
        root_url.set_query(None);
        let mut critical_content_url = root_url.clone();
        critical_content_url.set_path("/api/critical-content");
        Self {
            root_url,
            critical_content_url,
            app_name: "Kindergarten".to_string(),
            icon: "/icons/icon-192x192.png".to_string(),
            badge: "/icons/icon-72x72.png".to_string(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let origin = config.origin_url()?;
        let critical_content_url = origin
            .join(&config.critical_content_path)
            .map_err(|e| ConfigError::Invalid { field: "critical_content_path".into(), reason: e.to_string() })?;
        Ok(Self {
            critical_content_url,
            app_name: config.app_name.clone(),
            icon: config.notification_icon.clone(),
            badge: config.notification_badge.clone(),
            ..Self::for_origin(&origin)
        })
    }
}

#[derive(Debug, Deserialize)]
struct PushPayload {
    title: Option<String>,
    body: Option<String>,
    #[serde(rename = "primaryKey")]
    primary_key: Option<serde_json::Value>,
}

impl RequestCache {
    /// Returns whether the tag was recognised.
    pub async fn background_sync(&self, tag: &str) -> bool {
        if tag != BACKGROUND_SYNC_TAG {
            tracing::debug!(tag, "ignoring sync tag");
            return false;
        }
        tracing::info!(tag, "background sync");
        true
    }

    /// Show a notification for a push message.
    ///
    /// Returns the title and options shown, or `None` when the payload is
    /// missing or not a JSON object.
    ///
    /// # Errors
    ///
    /// Propagates failures from the control surface.
    pub async fn push(&self, payload: Option<&[u8]>) -> Result<Option<(String, NotificationOptions)>, Error> {
        let Some(bytes) = payload else {
            tracing::debug!("push without payload");
            return Ok(None);
        };
        let message: PushPayload = match serde_json::from_slice(bytes) {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!(error = %e, "malformed push payload");
                return Ok(None);
            }
        };

        let title = message.title.unwrap_or_else(|| self.events.app_name.clone());
        let options = NotificationOptions {
            body: message.body,
            icon: self.events.icon.clone(),
            badge: self.events.badge.clone(),
            vibrate: VIBRATE_PATTERN.to_vec(),
            data: NotificationData {
                date_of_arrival: self.engine.clock.now().timestamp_millis(),
                primary_key: message.primary_key,
            },
            actions: vec![
                NotificationAction { action: EXPLORE_ACTION.into(), title: "View details".into(), icon: None },
                NotificationAction { action: CLOSE_ACTION.into(), title: "Close".into(), icon: None },
            ],
        };

        self.control.show_notification(&title, &options).await?;
        Ok(Some((title, options)))
    }

    /// Close the clicked notification, opening the site for `explore`.
    ///
    /// # Errors
    ///
    /// Propagates a failure to open the window.
    pub async fn notification_click(&self, action: Option<&str>) -> Result<(), Error> {
        self.control.close_notification().await;
        if action == Some(EXPLORE_ACTION) {
            self.control.open_window(&self.events.root_url).await?;
        }
        Ok(())
    }

    /// Refresh critical content on `content-sync`. Returns whether a fresh
    /// copy was stored; non-2xx responses and fetch failures leave the
    /// cached copy untouched.
    pub async fn periodic_sync(&self, tag: &str) -> bool {
        if tag != CONTENT_SYNC_TAG {
            tracing::debug!(tag, "ignoring periodic sync tag");
            return false;
        }

        let request = Request::get(self.events.critical_content_url.clone());
        match self.engine.fetcher.fetch(&request).await {
            Ok(response) if response.ok() => {
                match self.engine.storage.put(&self.engine.config.navigation_store, &request, &response).await {
                    Ok(()) => {
                        tracing::debug!(url = %request.url, "critical content refreshed");
                        true
                    }
                    Err(e) => {
                        tracing::debug!(url = %request.url, error = %e, "critical content not stored");
                        false
                    }
                }
            }
            Ok(response) => {
                tracing::debug!(url = %request.url, status = response.status, "critical content refresh skipped");
                false
            }
            Err(e) => {
                tracing::debug!(url = %request.url, error = %e, "critical content refresh failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::control::{ControlAction, RecordingControl};
    use crate::strategy::test_support::ScriptedFetcher;
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;
    use swcache_core::{CacheConfig, CacheStorage, MemoryCacheStorage, Response};

    struct Fixture {
        worker: RequestCache,
        fetcher: Arc<ScriptedFetcher>,
        storage: Arc<MemoryCacheStorage>,
        control: Arc<RecordingControl>,
    }

    fn fixture() -> Fixture {
        let fetcher = Arc::new(ScriptedFetcher::new());
        let storage = Arc::new(MemoryCacheStorage::new());
        let control = Arc::new(RecordingControl::new());
        let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2026, 3, 1, 8, 30, 0).unwrap()));
        let worker = RequestCache::with_clock(
            CacheConfig::new("v1-nav", "v1-static"),
            fetcher.clone(),
            storage.clone(),
            control.clone(),
            EventSettings::for_origin(&Url::parse("https://school.test/news").unwrap()),
            clock,
        );
        Fixture { worker, fetcher, storage, control }
    }

    #[test]
    fn test_settings_for_origin() {
        let settings = EventSettings::for_origin(&Url::parse("https://school.test/news?x=1").unwrap());
        assert_eq!(settings.root_url.as_str(), "https://school.test/");
        assert_eq!(settings.critical_content_url.as_str(), "https://school.test/api/critical-content");
    }

    #[tokio::test]
    async fn test_background_sync_tags() {
        let f = fixture();
        assert!(f.worker.background_sync("background-sync").await);
        assert!(!f.worker.background_sync("other").await);
        assert!(f.control.actions().is_empty());
    }

    #[tokio::test]
    async fn test_push_shows_notification() {
        let f = fixture();
        let payload = br#"{"title":"Sports day","body":"Friday at 10am","primaryKey":7}"#;

        let (title, options) = f.worker.push(Some(payload)).await.unwrap().unwrap();
        assert_eq!(title, "Sports day");
        assert_eq!(options.body.as_deref(), Some("Friday at 10am"));
        assert_eq!(options.vibrate, vec![100, 50, 100]);
        assert_eq!(options.data.primary_key, Some(serde_json::json!(7)));
        assert_eq!(options.data.date_of_arrival, 1_772_353_800_000);
        let actions: Vec<_> = options.actions.iter().map(|a| a.action.as_str()).collect();
        assert_eq!(actions, vec!["explore", "close"]);

        match &f.control.actions()[..] {
            [ControlAction::ShowNotification { title, .. }] => assert_eq!(title, "Sports day"),
            other => panic!("unexpected actions: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_push_title_falls_back_to_app_name() {
        let f = fixture();
        let (title, options) = f.worker.push(Some(br#"{"body":"hello"}"#)).await.unwrap().unwrap();
        assert_eq!(title, "Kindergarten");
        assert_eq!(options.data.primary_key, None);
    }

    #[tokio::test]
    async fn test_push_malformed_payload_ignored() {
        let f = fixture();
        assert!(f.worker.push(Some(b"not json")).await.unwrap().is_none());
        assert!(f.worker.push(None).await.unwrap().is_none());
        assert!(f.control.actions().is_empty());
    }

    #[tokio::test]
    async fn test_notification_click_explore_opens_root() {
        let f = fixture();
        f.worker.notification_click(Some("explore")).await.unwrap();
        assert_eq!(
            f.control.drain(),
            vec![ControlAction::CloseNotification, ControlAction::OpenWindow { url: "https://school.test/".into() }]
        );

        f.worker.notification_click(Some("close")).await.unwrap();
        f.worker.notification_click(None).await.unwrap();
        assert_eq!(f.control.drain(), vec![ControlAction::CloseNotification, ControlAction::CloseNotification]);
    }

    #[tokio::test]
    async fn test_periodic_sync_refreshes_critical_content() {
        let f = fixture();
        f.fetcher.route("https://school.test/api/critical-content", Response::new(200, r#"{"closures":[]}"#));

        assert!(f.worker.periodic_sync("content-sync").await);
        let request = Request::get_str("https://school.test/api/critical-content").unwrap();
        let stored = f.storage.match_in("v1-nav", &request).await.unwrap().unwrap();
        assert_eq!(stored.body, r#"{"closures":[]}"#);
    }

    #[tokio::test]
    async fn test_periodic_sync_failures_swallowed() {
        let f = fixture();
        assert!(!f.worker.periodic_sync("content-sync").await);

        f.fetcher.set_offline(true);
        assert!(!f.worker.periodic_sync("content-sync").await);
        assert!(!f.worker.periodic_sync("unknown").await);
        assert_eq!(f.fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_periodic_sync_keeps_copy_on_error_status() {
        let f = fixture();
        let request = Request::get_str("https://school.test/api/critical-content").unwrap();
        f.storage.put("v1-nav", &request, &Response::new(200, "yesterday")).await.unwrap();
        f.fetcher.route("https://school.test/api/critical-content", Response::new(503, "maintenance"));

        assert!(!f.worker.periodic_sync("content-sync").await);
        let stored = f.storage.match_in("v1-nav", &request).await.unwrap().unwrap();
        assert_eq!(stored.status, 200);
        assert_eq!(stored.body, "yesterday");
    }
}
