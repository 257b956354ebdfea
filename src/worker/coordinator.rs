//! Cache lifecycle coordinator
//!
//! Owns one cache generation and drives it through install, activate and
//! fetch interception. Store and network are injected, so every policy
//! decision here is testable against in-memory doubles.

use crate::config::schema::WorkerConfig;
use crate::error::{ShopError, ShopResult};
use crate::worker::events::ExtendableEvent;
use crate::worker::network::Network;
use crate::worker::request::{Method, Request, Response};
use crate::worker::store::ResourceStore;
use crate::worker::WorkerPhase;
use futures_util::future::{join_all, try_join_all};
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};
use url::Url;

/// Explicit coordinator configuration
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Origin relative manifest entries resolve against
    pub origin: Url,
    /// Prefix shared by every generation this coordinator owns
    pub cache_prefix: String,
    /// Name of the current generation
    pub generation: String,
    /// Resources stored at install time
    pub manifest: Vec<String>,
    /// Resource served when content is unreachable
    pub offline_fallback: String,
}

impl CoordinatorConfig {
    /// Build from the `[worker]` config section
    pub fn from_worker_config(config: &WorkerConfig) -> ShopResult<Self> {
        let origin = Url::parse(&config.origin).map_err(|e| ShopError::InvalidOrigin {
            url: config.origin.clone(),
            reason: e.to_string(),
        })?;
        if origin.cannot_be_a_base() {
            return Err(ShopError::InvalidOrigin {
                url: config.origin.clone(),
                reason: "origin cannot be a base URL".to_string(),
            });
        }

        // An empty prefix would claim every namespace in the store
        if config.cache_prefix.trim().is_empty() {
            return Err(ShopError::InvalidCachePrefix(config.cache_prefix.clone()));
        }

        Ok(Self {
            origin,
            cache_prefix: config.cache_prefix.clone(),
            generation: config.generation_label(),
            manifest: config.manifest.clone(),
            offline_fallback: config.offline_fallback.clone(),
        })
    }

    /// Whether a generation name belongs to this coordinator but is not current
    pub fn is_stale(&self, name: &str) -> bool {
        name.starts_with(&self.cache_prefix) && name != self.generation
    }
}

/// Result of a successful install
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    /// Generation that was populated
    pub generation: String,
    /// Number of stored entries
    pub entries: usize,
    /// Total body bytes stored
    pub bytes: usize,
    /// Activate immediately instead of waiting for old clients to go away
    pub skip_waiting: bool,
}

/// Result of an activation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivateReport {
    /// Generation now current
    pub generation: String,
    /// Stale generations that were deleted
    pub deleted: Vec<String>,
    /// Cleanup failures, already logged
    pub failures: Vec<String>,
}

/// Where an intercepted response came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    /// Served from the current generation
    Cache,
    /// Fetched from the network (and cached when eligible)
    Network,
    /// Network unavailable or response invalid; offline page served
    OfflineFallback,
    /// Worker not active; request went straight to the network
    Passthrough,
}

impl fmt::Display for ResponseSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Cache => "cache",
            Self::Network => "network",
            Self::OfflineFallback => "offline-fallback",
            Self::Passthrough => "passthrough",
        };
        f.write_str(s)
    }
}

/// Outcome of a fetch interception
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub response: Response,
    pub source: ResponseSource,
}

/// Coordinates one cache generation's lifecycle
pub struct CacheCoordinator {
    config: CoordinatorConfig,
    store: Arc<dyn ResourceStore>,
    network: Arc<dyn Network>,
    phase: Mutex<WorkerPhase>,
}

impl CacheCoordinator {
    /// Create a coordinator in the `Parsed` phase
    pub fn new(
        config: CoordinatorConfig,
        store: Arc<dyn ResourceStore>,
        network: Arc<dyn Network>,
    ) -> Self {
        Self {
            config,
            store,
            network,
            phase: Mutex::new(WorkerPhase::Parsed),
        }
    }

    /// Resume from a previously persisted phase.
    ///
    /// Transient phases (`Installing`, `Activating`) were interrupted and
    /// resume as `Parsed`.
    pub fn with_phase(self, phase: WorkerPhase) -> Self {
        let resumed = match phase {
            WorkerPhase::Installing | WorkerPhase::Activating => WorkerPhase::Parsed,
            other => other,
        };
        *lock(&self.phase) = resumed;
        self
    }

    /// Current phase
    pub fn phase(&self) -> WorkerPhase {
        *lock(&self.phase)
    }

    /// Name of the current generation
    pub fn generation(&self) -> &str {
        &self.config.generation
    }

    /// Coordinator configuration
    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Injected resource store
    pub fn store(&self) -> &Arc<dyn ResourceStore> {
        &self.store
    }

    fn set_phase(&self, phase: WorkerPhase) {
        let mut current = lock(&self.phase);
        debug!("Worker phase {} -> {}", *current, phase);
        *current = phase;
    }

    /// Move to `next` if `allowed` accepts the current phase
    fn begin(&self, allowed: fn(&WorkerPhase) -> bool, expected: &str, next: WorkerPhase) -> ShopResult<()> {
        let mut current = lock(&self.phase);
        if !allowed(&*current) {
            return Err(ShopError::phase(expected, *current));
        }
        debug!("Worker phase {} -> {}", *current, next);
        *current = next;
        Ok(())
    }

    /// Populate the current generation with every manifest entry.
    pub async fn install(&self) -> ShopResult<InstallReport> {
        self.install_with_progress(&|_| {}).await
    }

    /// Install, calling `on_fetched` with each manifest URL once it is fetched.
    ///
    /// All-or-nothing: any unreachable or non-2xx manifest entry fails the
    /// install before anything is written, and the worker becomes redundant.
    pub async fn install_with_progress(
        &self,
        on_fetched: &(dyn Fn(&str) + Send + Sync),
    ) -> ShopResult<InstallReport> {
        self.begin(WorkerPhase::can_install, "installable", WorkerPhase::Installing)?;
        info!("Installing cache generation {}", self.config.generation);

        match self.populate(on_fetched).await {
            Ok(report) => {
                self.set_phase(WorkerPhase::Installed);
                info!(
                    "Installed {} ({} entries, {} bytes)",
                    report.generation, report.entries, report.bytes
                );
                Ok(report)
            }
            Err(e) => {
                self.set_phase(WorkerPhase::Redundant);
                warn!("Install of {} failed: {}", self.config.generation, e);
                Err(e)
            }
        }
    }

    async fn populate(&self, on_fetched: &(dyn Fn(&str) + Send + Sync)) -> ShopResult<InstallReport> {
        let requests = self.manifest_requests()?;

        let fetches = requests.into_iter().map(|request| async move {
            let response = self
                .network
                .fetch(&request)
                .await
                .map_err(|e| ShopError::population(&request.url, e))?;
            if !response.ok() {
                return Err(ShopError::population(
                    &request.url,
                    format!("server responded {}", response.status),
                ));
            }
            on_fetched(&request.url);
            Ok((request, response))
        });
        let entries = try_join_all(fetches).await?;

        let bytes = entries.iter().map(|(_, r)| r.body.len()).sum();
        let count = entries.len();

        self.store.open(&self.config.generation).await?;
        self.store.put_all(&self.config.generation, entries).await?;

        Ok(InstallReport {
            generation: self.config.generation.clone(),
            entries: count,
            bytes,
            skip_waiting: true,
        })
    }

    /// Manifest entries as requests; duplicates are rejected
    fn manifest_requests(&self) -> ShopResult<Vec<Request>> {
        let mut seen = HashSet::new();
        let mut requests = Vec::with_capacity(self.config.manifest.len());

        for entry in &self.config.manifest {
            let request = Request::resolve(&self.config.origin, entry)
                .map_err(|e| ShopError::population(entry, e))?;
            if !seen.insert(request.cache_key()) {
                return Err(ShopError::population(&request.url, "duplicate manifest entry"));
            }
            requests.push(request);
        }

        Ok(requests)
    }

    /// Make the current generation the only one carrying the prefix.
    ///
    /// Cleanup is best-effort: failures are logged and reported, and the
    /// worker activates regardless.
    pub async fn activate(&self) -> ShopResult<ActivateReport> {
        self.begin(WorkerPhase::can_activate, "installed", WorkerPhase::Activating)?;

        let mut report = ActivateReport {
            generation: self.config.generation.clone(),
            ..Default::default()
        };

        match self.store.keys().await {
            Ok(names) => {
                let stale: Vec<String> = names
                    .into_iter()
                    .filter(|name| self.config.is_stale(name))
                    .collect();

                let deletions = stale.iter().map(|name| self.store.delete(name));
                for (name, result) in stale.iter().zip(join_all(deletions).await) {
                    match result {
                        Ok(_) => {
                            info!("Deleted stale cache generation {}", name);
                            report.deleted.push(name.clone());
                        }
                        Err(e) => {
                            warn!("Failed to delete cache generation {}: {}", name, e);
                            report.failures.push(format!("{}: {}", name, e));
                        }
                    }
                }
            }
            Err(e) => {
                warn!("Cache activation failed to list generations: {}", e);
                report.failures.push(e.to_string());
            }
        }

        self.set_phase(WorkerPhase::Activated);
        info!("Activated cache generation {}", self.config.generation);
        Ok(report)
    }

    /// Answer an intercepted request: cache, then network, then the offline page.
    ///
    /// A valid network response is written to the current generation by an
    /// extension registered on `event`; the response is returned without
    /// waiting for the write.
    pub async fn handle_fetch(
        &self,
        request: Request,
        event: &mut ExtendableEvent,
    ) -> ShopResult<FetchOutcome> {
        if !self.phase().is_active() {
            debug!("Worker not active, passing {} through", request.url);
            let response = self.network.fetch(&request).await?;
            return Ok(FetchOutcome {
                response,
                source: ResponseSource::Passthrough,
            });
        }

        let generation = &self.config.generation;
        match self.store.match_request(generation, &request).await {
            Ok(Some(response)) => {
                debug!("Cache hit: {}", request.url);
                return Ok(FetchOutcome {
                    response,
                    source: ResponseSource::Cache,
                });
            }
            Ok(None) => debug!("Cache miss: {}", request.url),
            Err(e) => warn!("Cache lookup for {} failed, treating as miss: {}", request.url, e),
        }

        match self.network.fetch(&request).await {
            Ok(response) if response.is_cacheable() => {
                if request.method == Method::Get {
                    self.store_in_background(request, response.clone(), event);
                }
                Ok(FetchOutcome {
                    response,
                    source: ResponseSource::Network,
                })
            }
            Ok(response) => {
                debug!(
                    "Not caching {} (status {}, type {})",
                    request.url, response.status, response.response_type
                );
                self.offline_fallback().await
            }
            Err(e) => {
                warn!("Fetch request failed: {}", e);
                self.offline_fallback().await
            }
        }
    }

    fn store_in_background(&self, request: Request, response: Response, event: &mut ExtendableEvent) {
        let store = Arc::clone(&self.store);
        let generation = self.config.generation.clone();
        event.wait_until(async move {
            let url = request.url.clone();
            if let Err(e) = store.put(&generation, request, response).await {
                warn!("Failed to cache {}: {}", url, e);
            }
            Ok(())
        });
    }

    async fn offline_fallback(&self) -> ShopResult<FetchOutcome> {
        let request = Request::resolve(&self.config.origin, &self.config.offline_fallback)?;
        match self.store.match_request(&self.config.generation, &request).await? {
            Some(response) => Ok(FetchOutcome {
                response,
                source: ResponseSource::OfflineFallback,
            }),
            None => Err(ShopError::OfflineFallbackMissing(request.url)),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::events::EventKind;
    use crate::worker::network::fake::FakeNetwork;
    use crate::worker::request::ResponseType;
    use crate::worker::disk::DiskResourceStore;
    use crate::worker::store::{CachedEntry, MemoryResourceStore};
    use async_trait::async_trait;
    use tempfile::TempDir;

    const ORIGIN: &str = "http://shop.test/";

    fn config(version: &str, manifest: &[&str]) -> CoordinatorConfig {
        CoordinatorConfig {
            origin: Url::parse(ORIGIN).unwrap(),
            cache_prefix: "coffee-shop-cache-".to_string(),
            generation: format!("coffee-shop-cache-{}", version),
            manifest: manifest.iter().map(|s| s.to_string()).collect(),
            offline_fallback: "offline.html".to_string(),
        }
    }

    fn url(path: &str) -> String {
        Url::parse(ORIGIN).unwrap().join(path).unwrap().to_string()
    }

    fn get(path: &str) -> Request {
        Request::resolve(&Url::parse(ORIGIN).unwrap(), path).unwrap()
    }

    fn coordinator(
        version: &str,
        manifest: &[&str],
        store: &Arc<MemoryResourceStore>,
        network: &Arc<FakeNetwork>,
    ) -> CacheCoordinator {
        CacheCoordinator::new(
            config(version, manifest),
            Arc::clone(store) as Arc<dyn ResourceStore>,
            Arc::clone(network) as Arc<dyn Network>,
        )
    }

    /// Store, network and an activated worker whose manifest holds `/` and the offline page
    async fn active_worker() -> (CacheCoordinator, Arc<MemoryResourceStore>, Arc<FakeNetwork>) {
        let store = Arc::new(MemoryResourceStore::new());
        let network = Arc::new(FakeNetwork::new());
        network.serve(&url("/"), "<h1>Coffee</h1>");
        network.serve(&url("offline.html"), "<h1>You are offline</h1>");

        let worker = coordinator("v1", &["/", "offline.html"], &store, &network);
        worker.install().await.unwrap();
        worker.activate().await.unwrap();
        (worker, store, network)
    }

    async fn fetch(worker: &CacheCoordinator, request: Request) -> ShopResult<FetchOutcome> {
        let mut event = ExtendableEvent::new(EventKind::Fetch);
        let outcome = worker.handle_fetch(request, &mut event).await;
        event.settle().await.unwrap();
        outcome
    }

    #[tokio::test]
    async fn install_stores_manifest_under_generation() {
        let store = Arc::new(MemoryResourceStore::new());
        let network = Arc::new(FakeNetwork::new());
        network.serve(&url("/"), "<html>");
        network.serve(&url("a.css"), "a{}");

        let worker = coordinator("v1", &["/", "a.css"], &store, &network);
        let report = worker.install().await.unwrap();

        assert_eq!(report.entries, 2);
        assert_eq!(report.bytes, 9);
        assert!(report.skip_waiting);
        assert_eq!(worker.phase(), WorkerPhase::Installed);

        let entries = store.entries("coffee-shop-cache-v1").await.unwrap();
        let urls: Vec<&str> = entries.iter().map(|e| e.request.url.as_str()).collect();
        assert_eq!(urls, vec!["http://shop.test/", "http://shop.test/a.css"]);
    }

    #[tokio::test]
    async fn install_is_all_or_nothing() {
        let store = Arc::new(MemoryResourceStore::new());
        let network = Arc::new(FakeNetwork::new());
        network.serve(&url("/"), "<html>");
        // a.css is not routed: the fake answers 404

        let worker = coordinator("v1", &["/", "a.css"], &store, &network);
        let err = worker.install().await.unwrap_err();

        assert!(matches!(err, ShopError::CachePopulation { ref url, .. } if url == "http://shop.test/a.css"));
        assert_eq!(worker.phase(), WorkerPhase::Redundant);
        assert!(store.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn install_fails_when_offline() {
        let store = Arc::new(MemoryResourceStore::new());
        let network = Arc::new(FakeNetwork::new());
        network.set_offline(true);

        let worker = coordinator("v1", &["/"], &store, &network);
        assert!(matches!(
            worker.install().await,
            Err(ShopError::CachePopulation { .. })
        ));
        assert!(store.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn install_rejects_duplicate_manifest_entries() {
        let store = Arc::new(MemoryResourceStore::new());
        let network = Arc::new(FakeNetwork::new());
        network.serve(&url("index.html"), "<html>");

        let worker = coordinator("v1", &["index.html", "/index.html"], &store, &network);
        let err = worker.install().await.unwrap_err();
        assert!(err.to_string().contains("duplicate manifest entry"));
        assert_eq!(network.calls(), 0);
    }

    #[tokio::test]
    async fn install_reports_progress_per_entry() {
        let store = Arc::new(MemoryResourceStore::new());
        let network = Arc::new(FakeNetwork::new());
        network.serve(&url("/"), "<html>");
        network.serve(&url("a.css"), "a{}");
        let seen = Mutex::new(Vec::new());

        let worker = coordinator("v1", &["/", "a.css"], &store, &network);
        worker
            .install_with_progress(&|u| seen.lock().unwrap().push(u.to_string()))
            .await
            .unwrap();

        let mut seen = seen.into_inner().unwrap();
        seen.sort();
        assert_eq!(seen, vec!["http://shop.test/", "http://shop.test/a.css"]);
    }

    #[tokio::test]
    async fn activate_before_install_is_rejected() {
        let store = Arc::new(MemoryResourceStore::new());
        let network = Arc::new(FakeNetwork::new());
        let worker = coordinator("v1", &[], &store, &network);

        let err = worker.activate().await.unwrap_err();
        assert!(matches!(err, ShopError::InvalidPhase { .. }));
        assert_eq!(worker.phase(), WorkerPhase::Parsed);
    }

    #[tokio::test]
    async fn activate_purges_only_prefixed_stale_generations() {
        let store = Arc::new(MemoryResourceStore::new());
        let network = Arc::new(FakeNetwork::new());
        network.serve(&url("/"), "<html>");
        store.open("coffee-shop-cache-v0").await.unwrap();
        store.open("coffee-shop-cache-0.42Tue Mar 05 2024").await.unwrap();
        store.open("menu-images").await.unwrap();

        let worker = coordinator("v1", &["/"], &store, &network);
        worker.install().await.unwrap();
        let report = worker.activate().await.unwrap();

        assert_eq!(report.deleted.len(), 2);
        assert!(report.failures.is_empty());
        assert_eq!(
            store.keys().await.unwrap(),
            vec!["coffee-shop-cache-v1", "menu-images"]
        );
        assert_eq!(worker.phase(), WorkerPhase::Activated);
    }

    #[tokio::test]
    async fn new_generation_replaces_old_after_activation() {
        let store = Arc::new(MemoryResourceStore::new());
        let network = Arc::new(FakeNetwork::new());
        network.serve(&url("/"), "<html>");
        network.serve(&url("a.css"), "a{}");

        let v1 = coordinator("v1", &["/", "a.css"], &store, &network);
        v1.install().await.unwrap();
        assert_eq!(store.entries("coffee-shop-cache-v1").await.unwrap().len(), 2);

        let v2 = coordinator("v2", &["/", "a.css"], &store, &network);
        v2.install().await.unwrap();
        v2.activate().await.unwrap();

        assert_eq!(store.keys().await.unwrap(), vec!["coffee-shop-cache-v2"]);
    }

    /// Store whose deletions always fail
    struct StickyStore(MemoryResourceStore);

    #[async_trait]
    impl ResourceStore for StickyStore {
        async fn open(&self, name: &str) -> ShopResult<()> {
            self.0.open(name).await
        }
        async fn has(&self, name: &str) -> ShopResult<bool> {
            self.0.has(name).await
        }
        async fn put_all(&self, name: &str, entries: Vec<(Request, Response)>) -> ShopResult<()> {
            self.0.put_all(name, entries).await
        }
        async fn put(&self, name: &str, request: Request, response: Response) -> ShopResult<()> {
            self.0.put(name, request, response).await
        }
        async fn match_request(&self, name: &str, request: &Request) -> ShopResult<Option<Response>> {
            self.0.match_request(name, request).await
        }
        async fn keys(&self) -> ShopResult<Vec<String>> {
            self.0.keys().await
        }
        async fn delete(&self, name: &str) -> ShopResult<bool> {
            Err(ShopError::ResourceStore(format!("{} is locked", name)))
        }
        async fn entries(&self, name: &str) -> ShopResult<Vec<CachedEntry>> {
            self.0.entries(name).await
        }
        fn backend_name(&self) -> &'static str {
            "sticky"
        }
    }

    #[tokio::test]
    async fn activation_survives_cleanup_failures() {
        let store = Arc::new(StickyStore(MemoryResourceStore::new()));
        store.open("coffee-shop-cache-v0").await.unwrap();
        let network = Arc::new(FakeNetwork::new());
        network.serve(&url("/"), "<html>");

        let worker = CacheCoordinator::new(
            config("v1", &["/"]),
            Arc::clone(&store) as Arc<dyn ResourceStore>,
            network as Arc<dyn Network>,
        );
        worker.install().await.unwrap();
        let report = worker.activate().await.unwrap();

        assert!(report.deleted.is_empty());
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].contains("coffee-shop-cache-v0"));
        assert!(worker.phase().is_active());
    }

    #[tokio::test]
    async fn cached_request_never_touches_network() {
        let (worker, _store, network) = active_worker().await;
        let calls_after_install = network.calls();

        let outcome = fetch(&worker, get("/")).await.unwrap();

        assert_eq!(outcome.source, ResponseSource::Cache);
        assert_eq!(outcome.response.text(), "<h1>Coffee</h1>");
        assert_eq!(network.calls(), calls_after_install);
    }

    #[tokio::test]
    async fn network_response_is_returned_and_cached() {
        let (worker, store, network) = active_worker().await;
        network.serve(&url("menu.html"), "<ul>latte</ul>");

        let outcome = fetch(&worker, get("menu.html")).await.unwrap();
        assert_eq!(outcome.source, ResponseSource::Network);
        assert_eq!(outcome.response.text(), "<ul>latte</ul>");

        let cached = store
            .match_request("coffee-shop-cache-v1", &get("menu.html"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cached.text(), "<ul>latte</ul>");

        network.set_offline(true);
        let again = fetch(&worker, get("menu.html")).await.unwrap();
        assert_eq!(again.source, ResponseSource::Cache);
    }

    #[tokio::test]
    async fn offline_request_gets_fallback_page() {
        let (worker, store, network) = active_worker().await;
        network.set_offline(true);

        let outcome = fetch(&worker, get("checkout.html")).await.unwrap();

        assert_eq!(outcome.source, ResponseSource::OfflineFallback);
        assert_eq!(outcome.response.text(), "<h1>You are offline</h1>");
        assert!(store
            .match_request("coffee-shop-cache-v1", &get("checkout.html"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn invalid_status_gets_fallback_page() {
        let (worker, store, _network) = active_worker().await;

        // unrouted path: the fake network answers 404
        let outcome = fetch(&worker, get("missing.html")).await.unwrap();

        assert_eq!(outcome.source, ResponseSource::OfflineFallback);
        assert_eq!(store.entries("coffee-shop-cache-v1").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn cross_origin_response_gets_fallback_page() {
        let (worker, store, network) = active_worker().await;
        let font = "https://cdnjs.cloudflare.com/ajax/libs/font-awesome/5.15.4/css/all.min.css";
        network.route(font, Response::new(200).with_type(ResponseType::Cors));

        let request = Request::get(&Url::parse(font).unwrap());
        let outcome = fetch(&worker, request).await.unwrap();

        assert_eq!(outcome.source, ResponseSource::OfflineFallback);
        assert_eq!(store.entries("coffee-shop-cache-v1").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn missing_fallback_is_an_error() {
        let store = Arc::new(MemoryResourceStore::new());
        let network = Arc::new(FakeNetwork::new());
        network.serve(&url("/"), "<html>");

        let worker = coordinator("v1", &["/"], &store, &network);
        worker.install().await.unwrap();
        worker.activate().await.unwrap();
        network.set_offline(true);

        let err = fetch(&worker, get("menu.html")).await.unwrap_err();
        assert!(matches!(err, ShopError::OfflineFallbackMissing(ref u) if u == "http://shop.test/offline.html"));
    }

    #[tokio::test]
    async fn non_get_responses_are_not_cached() {
        let (worker, store, network) = active_worker().await;
        network.serve(&url("subscribe"), "{}");

        let url = Url::parse(ORIGIN).unwrap().join("subscribe").unwrap();
        let outcome = fetch(&worker, Request::new(Method::Post, &url)).await.unwrap();

        assert_eq!(outcome.source, ResponseSource::Network);
        assert_eq!(store.entries("coffee-shop-cache-v1").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn inactive_worker_passes_requests_through() {
        let store = Arc::new(MemoryResourceStore::new());
        let network = Arc::new(FakeNetwork::new());
        network.serve(&url("/"), "<html>");

        let worker = coordinator("v1", &["/"], &store, &network);
        let outcome = fetch(&worker, get("/")).await.unwrap();

        assert_eq!(outcome.source, ResponseSource::Passthrough);
        assert!(store.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn concurrent_misses_leave_one_entry() {
        let (worker, store, network) = active_worker().await;
        network.serve(&url("menu.html"), "<ul>mocha</ul>");

        let mut first = ExtendableEvent::new(EventKind::Fetch);
        let mut second = ExtendableEvent::new(EventKind::Fetch);
        let (a, b) = tokio::join!(
            worker.handle_fetch(get("menu.html"), &mut first),
            worker.handle_fetch(get("menu.html"), &mut second),
        );
        first.settle().await.unwrap();
        second.settle().await.unwrap();

        assert_eq!(a.unwrap().response, b.unwrap().response);
        assert_eq!(store.entries("coffee-shop-cache-v1").await.unwrap().len(), 3);
    }

    #[test]
    fn resumed_transient_phase_restarts() {
        let store = Arc::new(MemoryResourceStore::new());
        let network = Arc::new(FakeNetwork::new());

        let worker = coordinator("v1", &[], &store, &network).with_phase(WorkerPhase::Installing);
        assert_eq!(worker.phase(), WorkerPhase::Parsed);

        let worker = coordinator("v1", &[], &store, &network).with_phase(WorkerPhase::Activated);
        assert!(worker.phase().is_active());
    }

    #[test]
    fn config_from_worker_section() {
        let section = WorkerConfig {
            origin: "not a url".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            CoordinatorConfig::from_worker_config(&section),
            Err(ShopError::InvalidOrigin { .. })
        ));

        let config = CoordinatorConfig::from_worker_config(&WorkerConfig::default()).unwrap();
        assert_eq!(config.generation, "coffee-shop-cache-v1");
        assert!(config.is_stale("coffee-shop-cache-v0"));
        assert!(!config.is_stale("coffee-shop-cache-v1"));
        assert!(!config.is_stale("other"));
    }

    #[test]
    fn config_rejects_blank_cache_prefix() {
        for prefix in ["", "   "] {
            let worker = WorkerConfig {
                cache_prefix: prefix.to_string(),
                ..WorkerConfig::default()
            };
            let err = CoordinatorConfig::from_worker_config(&worker).unwrap_err();
            assert!(matches!(err, ShopError::InvalidCachePrefix(_)));
        }
    }

    #[tokio::test]
    async fn lifecycle_on_disk_store() {
        let temp = TempDir::new().unwrap();
        let store = Arc::new(DiskResourceStore::new(temp.path().join("resources")));
        let network = Arc::new(FakeNetwork::new());
        network.serve(&url("/"), "<h1>Coffee</h1>");
        network.serve(&url("a.css"), "a{}");
        network.serve(&url("offline.html"), "<h1>You are offline</h1>");
        network.serve(&url("menu.html"), "<ul>latte</ul>");
        store.open("menu-images").await.unwrap();

        let on_disk = |version: &str| {
            CacheCoordinator::new(
                config(version, &["/", "a.css", "offline.html"]),
                Arc::clone(&store) as Arc<dyn ResourceStore>,
                Arc::clone(&network) as Arc<dyn Network>,
            )
        };

        let v1 = on_disk("v1");
        v1.install().await.unwrap();
        v1.activate().await.unwrap();

        let v2 = on_disk("v2");
        v2.install().await.unwrap();
        let report = v2.activate().await.unwrap();
        assert_eq!(report.deleted, vec!["coffee-shop-cache-v1"]);
        assert_eq!(
            store.keys().await.unwrap(),
            vec!["coffee-shop-cache-v2", "menu-images"]
        );

        // miss, then written back by the settled event
        let first = fetch(&v2, get("menu.html")).await.unwrap();
        assert_eq!(first.source, ResponseSource::Network);
        assert_eq!(store.entries("coffee-shop-cache-v2").await.unwrap().len(), 4);

        network.set_offline(true);
        let hit = fetch(&v2, get("menu.html")).await.unwrap();
        assert_eq!(hit.source, ResponseSource::Cache);
        assert_eq!(hit.response.text(), "<ul>latte</ul>");

        let fallback = fetch(&v2, get("checkout.html")).await.unwrap();
        assert_eq!(fallback.source, ResponseSource::OfflineFallback);
        assert_eq!(fallback.response.text(), "<h1>You are offline</h1>");
    }
}
