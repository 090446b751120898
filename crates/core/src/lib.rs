//! Core types and shared functionality for swcache.
//!
//! This crate provides:
//! - Named response stores with SQLite and in-memory backends
//! - Request/response message types
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod message;

pub use cache::{CacheDb, CacheStorage, MemoryCacheStorage, StoredEntry};
pub use config::{AppConfig, CacheConfig, ConfigError, MissingTimestampPolicy, PrecacheManifest};
pub use error::Error;
pub use message::{Headers, Request, RequestMode, Response};
