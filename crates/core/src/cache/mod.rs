//! Named, versioned response stores.
//!
//! A store maps a request key (method + URL) to the last response stored for
//! it. Several stores live side by side; their names carry the deployment
//! generation, so replacing a generation means deleting stores by name.
//!
//! Two backends implement [`CacheStorage`]:
//!
//! - [`CacheDb`]: SQLite with async access via tokio-rusqlite, WAL mode and
//!   automatic schema migrations
//! - [`MemoryCacheStorage`]: process-local maps, used for tests and
//!   short-lived hosts

pub mod connection;
pub mod entries;
pub mod hash;
pub mod memory;
pub mod migrations;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::StoredEntry;
pub use memory::MemoryCacheStorage;

use async_trait::async_trait;

use crate::message::{Request, Response};

/// Cache Storage primitives used by the request cache.
///
/// Lookups that search "any store" visit stores in creation order and return
/// the first hit. Writes to a store that does not exist create it.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Create `store` if it does not exist yet.
    async fn open(&self, store: &str) -> Result<(), Error>;

    /// Look up `request` in a single store.
    async fn match_in(&self, store: &str, request: &Request) -> Result<Option<Response>, Error>;

    /// Look up `request` across every store.
    async fn match_any(&self, request: &Request) -> Result<Option<Response>, Error>;

    /// Store `response` for `request`, replacing any previous entry.
    async fn put(&self, store: &str, request: &Request, response: &Response) -> Result<(), Error>;

    /// Store every pair or none of them.
    async fn put_all(&self, store: &str, entries: &[(Request, Response)]) -> Result<(), Error>;

    /// Names of all stores, in creation order.
    async fn store_names(&self) -> Result<Vec<String>, Error>;

    /// Delete `store` and its entries. Returns false if it did not exist.
    async fn delete_store(&self, store: &str) -> Result<bool, Error>;
}
