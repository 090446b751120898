//! Client and registration control surface.
//!
//! The request cache asks its host to activate immediately, take control of
//! open pages, open windows and show notifications. [`RecordingControl`]
//! logs and records every call so hosts can report side effects.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use swcache_core::Error;
use url::Url;

/// A button shown on a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// Data attached to a notification, handed back on click.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct NotificationData {
    /// Milliseconds since the Unix epoch.
    pub date_of_arrival: i64,
    pub primary_key: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct NotificationOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
    pub data: NotificationData,
    pub actions: Vec<NotificationAction>,
}

#[async_trait]
pub trait ClientControl: Send + Sync {
    /// Activate this worker without waiting for older instances to finish.
    async fn skip_waiting(&self);

    /// Take control of every open page in scope.
    async fn claim(&self);

    async fn open_window(&self, url: &Url) -> Result<(), Error>;

    async fn show_notification(&self, title: &str, options: &NotificationOptions) -> Result<(), Error>;

    /// Dismiss the notification that triggered a click event.
    async fn close_notification(&self);
}

/// A call made on the control surface.
#[derive(Debug, Clone, PartialEq, Serialize, schemars::JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlAction {
    SkipWaiting,
    Claim,
    OpenWindow { url: String },
    ShowNotification { title: String, options: NotificationOptions },
    CloseNotification,
}

/// Control surface that records calls instead of driving a browser.
#[derive(Debug, Default)]
pub struct RecordingControl {
    actions: Mutex<Vec<ControlAction>>,
}

impl RecordingControl {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, action: ControlAction) {
        self.actions.lock().unwrap_or_else(PoisonError::into_inner).push(action);
    }

    /// Snapshot of recorded calls.
    pub fn actions(&self) -> Vec<ControlAction> {
        self.actions.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Take recorded calls, leaving the log empty.
    pub fn drain(&self) -> Vec<ControlAction> {
        std::mem::take(&mut *self.actions.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

#[async_trait]
impl ClientControl for RecordingControl {
    async fn skip_waiting(&self) {
        tracing::info!("skip_waiting");
        self.record(ControlAction::SkipWaiting);
    }

    async fn claim(&self) {
        tracing::info!("claiming clients");
        self.record(ControlAction::Claim);
    }

    async fn open_window(&self, url: &Url) -> Result<(), Error> {
        tracing::info!(%url, "open window");
        self.record(ControlAction::OpenWindow { url: url.to_string() });
        Ok(())
    }

    async fn show_notification(&self, title: &str, options: &NotificationOptions) -> Result<(), Error> {
        tracing::info!(title, "show notification");
        self.record(ControlAction::ShowNotification { title: title.to_string(), options: options.clone() });
        Ok(())
    }

    async fn close_notification(&self) {
        self.record(ControlAction::CloseNotification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_recording_control_drain() {
        let control = RecordingControl::new();
        control.skip_waiting().await;
        control.claim().await;
        assert_eq!(control.actions(), vec![ControlAction::SkipWaiting, ControlAction::Claim]);

        assert_eq!(control.drain().len(), 2);
        assert!(control.actions().is_empty());
    }

    #[test]
    fn test_control_action_serialization() {
        let action = ControlAction::OpenWindow { url: "https://school.test/".into() };
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["type"], "open_window");
        assert_eq!(json["url"], "https://school.test/");
    }
}
