//! Request interception and caching strategies.
//!
//! This crate provides the [`RequestCache`]: request classification, the
//! network-first, cache-first and API strategies, the install and activate
//! lifecycle, and the auxiliary push and sync events. The network and the
//! page-facing control surface sit behind the [`Fetcher`] and
//! [`ClientControl`] traits.

pub mod classify;
pub mod clock;
pub mod control;
pub mod events;
pub mod fetch;
pub mod lifecycle;
pub mod strategy;
pub mod worker;

pub use classify::{RequestKind, StrategyKind, classify};
pub use clock::{Clock, FixedClock, SystemClock};
pub use control::{
    ClientControl, ControlAction, NotificationAction, NotificationData, NotificationOptions, RecordingControl,
};
pub use events::EventSettings;
pub use fetch::{FetchConfig, Fetcher, HttpFetcher};
pub use lifecycle::{ActivateReport, InstallReport};
pub use strategy::ResponseSource;
pub use worker::{FetchOutcome, LifecycleState, RequestCache, Served};
