//! Cache-related MCP tools.
//!
//! This module provides tools for inspecting and maintaining the SQLite
//! response stores.

pub mod delete;
pub mod get;
pub mod keys;
pub mod purge;

pub use delete::{CacheDeleteParams, delete_impl};
pub use get::{CacheGetParams, get_impl};
pub use keys::{CacheKeysParams, keys_impl};
pub use purge::{CachePurgeParams, purge_impl};
