//! Resource store abstraction
//!
//! A resource store holds named namespaces (cache generations), each mapping
//! request identity to a stored response. The worker only depends on the
//! [`ResourceStore`] trait so tests can substitute the in-memory store.
//!
//! Writes to the same identity are last-write-wins. Responses are immutable
//! per identity, so a racing overwrite stores an equivalent payload.

use crate::error::ShopResult;
use crate::worker::request::{Request, Response};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::debug;

/// A stored request/response pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedEntry {
    /// The request the response was stored under
    pub request: Request,
    /// The stored response
    pub response: Response,
    /// When the entry was written
    pub cached_at: DateTime<Utc>,
}

impl CachedEntry {
    /// Create an entry stamped with the current time
    pub fn new(request: Request, response: Response) -> Self {
        Self {
            request,
            response,
            cached_at: Utc::now(),
        }
    }

    /// Whether this entry answers `request`.
    ///
    /// Identity is method + URL, plus every request header the stored
    /// response names in `Vary`. `Vary: *` never matches.
    pub fn matches(&self, request: &Request) -> bool {
        if self.request.cache_key() != request.cache_key() {
            return false;
        }
        self.response.vary().iter().all(|name| {
            name != "*" && self.request.header(name) == request.header(name)
        })
    }

    /// Body size in bytes
    pub fn size(&self) -> usize {
        self.response.body.len()
    }
}

/// Abstract resource store interface
///
/// Implemented by [`MemoryResourceStore`] and
/// [`DiskResourceStore`](crate::worker::DiskResourceStore).
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Open a namespace, creating it if absent
    async fn open(&self, name: &str) -> ShopResult<()>;

    /// Check if a namespace exists
    async fn has(&self, name: &str) -> ShopResult<bool>;

    /// Store every entry, or none of them
    async fn put_all(&self, name: &str, entries: Vec<(Request, Response)>) -> ShopResult<()>;

    /// Store a single entry, replacing any entry with the same identity
    async fn put(&self, name: &str, request: Request, response: Response) -> ShopResult<()>;

    /// Look up a request in a namespace
    async fn match_request(&self, name: &str, request: &Request) -> ShopResult<Option<Response>>;

    /// List all namespace names
    async fn keys(&self) -> ShopResult<Vec<String>>;

    /// Delete a namespace in full. Returns whether it existed.
    async fn delete(&self, name: &str) -> ShopResult<bool>;

    /// All entries of a namespace, ordered by identity
    async fn entries(&self, name: &str) -> ShopResult<Vec<CachedEntry>>;

    /// Human-readable backend name for display
    fn backend_name(&self) -> &'static str;
}

type Namespace = BTreeMap<String, CachedEntry>;

/// In-memory resource store
#[derive(Debug, Default)]
pub struct MemoryResourceStore {
    namespaces: RwLock<BTreeMap<String, Namespace>>,
}

impl MemoryResourceStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResourceStore for MemoryResourceStore {
    async fn open(&self, name: &str) -> ShopResult<()> {
        self.namespaces
            .write()
            .await
            .entry(name.to_string())
            .or_default();
        Ok(())
    }

    async fn has(&self, name: &str) -> ShopResult<bool> {
        Ok(self.namespaces.read().await.contains_key(name))
    }

    async fn put_all(&self, name: &str, entries: Vec<(Request, Response)>) -> ShopResult<()> {
        let mut namespaces = self.namespaces.write().await;
        let namespace = namespaces.entry(name.to_string()).or_default();
        for (request, response) in entries {
            namespace.insert(request.cache_key(), CachedEntry::new(request, response));
        }
        Ok(())
    }

    async fn put(&self, name: &str, request: Request, response: Response) -> ShopResult<()> {
        debug!("Storing {} in {}", request.url, name);
        self.namespaces
            .write()
            .await
            .entry(name.to_string())
            .or_default()
            .insert(request.cache_key(), CachedEntry::new(request, response));
        Ok(())
    }

    async fn match_request(&self, name: &str, request: &Request) -> ShopResult<Option<Response>> {
        let namespaces = self.namespaces.read().await;
        Ok(namespaces
            .get(name)
            .and_then(|ns| ns.get(&request.cache_key()))
            .filter(|entry| entry.matches(request))
            .map(|entry| entry.response.clone()))
    }

    async fn keys(&self) -> ShopResult<Vec<String>> {
        Ok(self.namespaces.read().await.keys().cloned().collect())
    }

    async fn delete(&self, name: &str) -> ShopResult<bool> {
        Ok(self.namespaces.write().await.remove(name).is_some())
    }

    async fn entries(&self, name: &str) -> ShopResult<Vec<CachedEntry>> {
        Ok(self
            .namespaces
            .read()
            .await
            .get(name)
            .map(|ns| ns.values().cloned().collect())
            .unwrap_or_default())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn request(path: &str) -> Request {
        Request::resolve(&Url::parse("http://shop.test/").unwrap(), path).unwrap()
    }

    #[tokio::test]
    async fn open_creates_namespace_once() {
        let store = MemoryResourceStore::new();
        store.open("coffee-shop-cache-v1").await.unwrap();
        store
            .put("coffee-shop-cache-v1", request("a.css"), Response::new(200))
            .await
            .unwrap();
        store.open("coffee-shop-cache-v1").await.unwrap();

        assert_eq!(store.keys().await.unwrap(), vec!["coffee-shop-cache-v1"]);
        assert_eq!(store.entries("coffee-shop-cache-v1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn match_is_scoped_to_namespace() {
        let store = MemoryResourceStore::new();
        store
            .put("v1", request("a.css"), Response::new(200).with_body("body{}"))
            .await
            .unwrap();

        let hit = store.match_request("v1", &request("a.css")).await.unwrap();
        assert_eq!(hit.unwrap().text(), "body{}");
        assert!(store.match_request("v2", &request("a.css")).await.unwrap().is_none());
        assert!(store.match_request("v1", &request("b.css")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn put_overwrites_same_identity() {
        let store = MemoryResourceStore::new();
        store
            .put("v1", request("/"), Response::new(200).with_body("old"))
            .await
            .unwrap();
        store
            .put("v1", request("/"), Response::new(200).with_body("new"))
            .await
            .unwrap();

        let entries = store.entries("v1").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].response.text(), "new");
    }

    #[tokio::test]
    async fn vary_headers_take_part_in_matching() {
        let store = MemoryResourceStore::new();
        let stored = request("menu.json").with_header("Accept-Language", "en");
        let response = Response::new(200).with_header("Vary", "Accept-Language");
        store.put("v1", stored, response).await.unwrap();

        let same = request("menu.json").with_header("accept-language", "en");
        let other = request("menu.json").with_header("accept-language", "fr");
        assert!(store.match_request("v1", &same).await.unwrap().is_some());
        assert!(store.match_request("v1", &other).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn vary_star_never_matches() {
        let store = MemoryResourceStore::new();
        let response = Response::new(200).with_header("Vary", "*");
        store.put("v1", request("/"), response).await.unwrap();
        assert!(store.match_request("v1", &request("/")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_reports_existence() {
        let store = MemoryResourceStore::new();
        store.open("v1").await.unwrap();
        assert!(store.delete("v1").await.unwrap());
        assert!(!store.delete("v1").await.unwrap());
        assert!(!store.has("v1").await.unwrap());
    }
}
