//! In-memory [`CacheStorage`] backend.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::CacheStorage;
use crate::Error;
use crate::message::{Request, Response};

/// Stores kept in a `Vec` so creation order is preserved for `match_any`.
type Stores = Vec<(String, HashMap<String, Response>)>;

/// Process-local cache storage.
///
/// Uses a tokio RwLock so concurrent fetch handlers see each put atomically.
#[derive(Clone, Default)]
pub struct MemoryCacheStorage {
    stores: Arc<RwLock<Stores>>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries in `store`, or None if it does not exist.
    pub async fn len(&self, store: &str) -> Option<usize> {
        let stores = self.stores.read().await;
        stores.iter().find(|(name, _)| name == store).map(|(_, entries)| entries.len())
    }
}

fn entries_mut<'a>(stores: &'a mut Stores, store: &str) -> &'a mut HashMap<String, Response> {
    let idx = match stores.iter().position(|(name, _)| name == store) {
        Some(idx) => idx,
        None => {
            stores.push((store.to_string(), HashMap::new()));
            stores.len() - 1
        }
    };
    &mut stores[idx].1
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn open(&self, store: &str) -> Result<(), Error> {
        let mut stores = self.stores.write().await;
        entries_mut(&mut stores, store);
        Ok(())
    }

    async fn match_in(&self, store: &str, request: &Request) -> Result<Option<Response>, Error> {
        let key = request.cache_key();
        let stores = self.stores.read().await;
        Ok(stores.iter().find(|(name, _)| name == store).and_then(|(_, entries)| entries.get(&key)).cloned())
    }

    async fn match_any(&self, request: &Request) -> Result<Option<Response>, Error> {
        let key = request.cache_key();
        let stores = self.stores.read().await;
        Ok(stores.iter().find_map(|(_, entries)| entries.get(&key)).cloned())
    }

    async fn put(&self, store: &str, request: &Request, response: &Response) -> Result<(), Error> {
        let mut stores = self.stores.write().await;
        entries_mut(&mut stores, store).insert(request.cache_key(), response.clone());
        Ok(())
    }

    async fn put_all(&self, store: &str, entries: &[(Request, Response)]) -> Result<(), Error> {
        let mut stores = self.stores.write().await;
        let target = entries_mut(&mut stores, store);
        for (request, response) in entries {
            target.insert(request.cache_key(), response.clone());
        }
        Ok(())
    }

    async fn store_names(&self) -> Result<Vec<String>, Error> {
        let stores = self.stores.read().await;
        Ok(stores.iter().map(|(name, _)| name.clone()).collect())
    }

    async fn delete_store(&self, store: &str) -> Result<bool, Error> {
        let mut stores = self.stores.write().await;
        let before = stores.len();
        stores.retain(|(name, _)| name != store);
        Ok(stores.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(path: &str) -> Request {
        Request::get_str(&format!("https://school.test{path}")).unwrap()
    }

    #[tokio::test]
    async fn test_put_and_match() {
        let storage = MemoryCacheStorage::new();
        storage.put("nav", &req("/"), &Response::new(200, "home")).await.unwrap();

        let hit = storage.match_in("nav", &req("/")).await.unwrap().unwrap();
        assert_eq!(hit.body, "home");
        assert!(storage.match_in("static", &req("/")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_match_any_prefers_older_store() {
        let storage = MemoryCacheStorage::new();
        storage.put("first", &req("/logo.png"), &Response::new(200, "a")).await.unwrap();
        storage.put("second", &req("/logo.png"), &Response::new(200, "b")).await.unwrap();

        let hit = storage.match_any(&req("/logo.png")).await.unwrap().unwrap();
        assert_eq!(hit.body, "a");
    }

    #[tokio::test]
    async fn test_delete_store() {
        let storage = MemoryCacheStorage::new();
        storage.open("v0-nav").await.unwrap();
        storage.open("v1-nav").await.unwrap();

        assert!(storage.delete_store("v0-nav").await.unwrap());
        assert!(!storage.delete_store("v0-nav").await.unwrap());
        assert_eq!(storage.store_names().await.unwrap(), vec!["v1-nav".to_string()]);
    }

    #[tokio::test]
    async fn test_put_all() {
        let storage = MemoryCacheStorage::new();
        let entries = vec![(req("/"), Response::new(200, "home")), (req("/about"), Response::new(200, "about"))];
        storage.put_all("nav", &entries).await.unwrap();
        assert_eq!(storage.len("nav").await, Some(2));
    }
}
