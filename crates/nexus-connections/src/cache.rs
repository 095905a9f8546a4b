//! Full-graph cache in front of the assembler.
//!
//! Entries are keyed by the root's hash and kind and live for a fixed TTL.
//! The backend is best-effort: any cache failure falls through to a fresh
//! assembly. Concurrent misses for the same key share one assembly.
//!
//! Keys of cached roots are also indexed by (kind, id), so a repeat request
//! or an invalidation can reach the entry without loading the root first.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use lru::LruCache;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use nexus_core::{CacheBackend, EntityProjection, EntityRef, GraphResult};

use crate::assembler::GraphAssembler;
use crate::error::Result;

type Gate = Arc<AsyncMutex<()>>;

pub struct GraphCache {
    backend: Arc<dyn CacheBackend>,
    assembler: Arc<GraphAssembler>,
    ttl: Duration,
    key_prefix: String,
    inflight: Mutex<HashMap<String, Gate>>,
    roots: Mutex<LruCache<EntityRef, String>>,
}

impl GraphCache {
    pub fn new(
        backend: Arc<dyn CacheBackend>,
        assembler: Arc<GraphAssembler>,
        ttl: Duration,
        key_prefix: impl Into<String>,
        index_capacity: usize,
    ) -> Self {
        let index_capacity = NonZeroUsize::new(index_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            backend,
            assembler,
            ttl,
            key_prefix: key_prefix.into(),
            inflight: Mutex::new(HashMap::new()),
            roots: Mutex::new(LruCache::new(index_capacity)),
        }
    }

    pub fn cache_key(&self, root: &EntityProjection) -> String {
        format!("{}:{}:{}", self.key_prefix, root.hash, root.kind)
    }

    /// The cached graph of a root seen before, without touching any store.
    pub async fn cached(&self, root: &EntityRef) -> Option<GraphResult> {
        let key = self.index().get(root).cloned()?;
        let graph = self.lookup(&key).await;
        if graph.is_none() {
            self.index().pop(root);
        }
        graph
    }

    /// Return the cached graph for `root`, assembling and storing it on a miss.
    pub async fn get_or_build(&self, root: &EntityProjection) -> Result<GraphResult> {
        let key = self.cache_key(root);
        if let Some(graph) = self.lookup(&key).await {
            self.remember(root, &key);
            return Ok(graph);
        }

        let _flight = self.join_flight(&key).await;
        // Another caller may have filled the entry while we waited.
        if let Some(graph) = self.lookup(&key).await {
            tracing::debug!(key = %key, "Graph cache filled by concurrent build");
            self.remember(root, &key);
            return Ok(graph);
        }

        let graph = self.assembler.assemble_full(root).await?;
        self.store(&key, &graph).await;
        self.remember(root, &key);
        Ok(graph)
    }

    /// Drop the cached graph for `root`, whatever its remaining TTL.
    pub async fn invalidate(&self, root: &EntityProjection) {
        let key = self.cache_key(root);
        let indexed = self.index().pop(&root.entity_ref());
        if let Some(indexed) = indexed.filter(|indexed| *indexed != key) {
            self.delete(&indexed).await;
        }
        self.delete(&key).await;
    }

    /// Drop the cached graph of a root seen before, without loading it.
    /// Returns false when the root is not indexed.
    pub async fn invalidate_known(&self, root: &EntityRef) -> bool {
        let Some(key) = self.index().pop(root) else {
            return false;
        };
        self.delete(&key).await;
        true
    }

    async fn delete(&self, key: &str) {
        match self.backend.delete(key).await {
            Ok(()) => tracing::info!(key = %key, "Invalidated cached graph"),
            Err(e) => tracing::warn!(key = %key, error = %e, "Cache invalidation failed"),
        }
    }

    fn remember(&self, root: &EntityProjection, key: &str) {
        self.index().put(root.entity_ref(), key.to_string());
    }

    fn index(&self) -> MutexGuard<'_, LruCache<EntityRef, String>> {
        self.roots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn lookup(&self, key: &str) -> Option<GraphResult> {
        let raw = match self.backend.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                tracing::debug!(key = %key, "Graph cache miss");
                return None;
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache read failed, rebuilding");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(graph) => {
                tracing::debug!(key = %key, "Graph cache hit");
                Some(graph)
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Discarding unreadable cache entry");
                None
            }
        }
    }

    async fn store(&self, key: &str, graph: &GraphResult) {
        let raw = match serde_json::to_string(graph) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Graph not cacheable");
                return;
            }
        };
        if let Err(e) = self.backend.set(key, raw, self.ttl).await {
            tracing::warn!(key = %key, error = %e, "Cache write failed");
        }
    }

    async fn join_flight(&self, key: &str) -> Flight<'_> {
        let gate = {
            let mut inflight = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
            inflight.entry(key.to_string()).or_default().clone()
        };
        let guard = gate.clone().lock_owned().await;
        Flight {
            cache: self,
            key: key.to_string(),
            gate,
            _guard: guard,
        }
    }
}

/// Holds a key's build lock. Dropping it releases the lock and retires the
/// gate, also when the build is cancelled.
struct Flight<'a> {
    cache: &'a GraphCache,
    key: String,
    gate: Gate,
    _guard: OwnedMutexGuard<()>,
}

impl Drop for Flight<'_> {
    fn drop(&mut self) {
        let mut inflight = self
            .cache
            .inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if inflight
            .get(&self.key)
            .is_some_and(|current| Arc::ptr_eq(current, &self.gate))
        {
            inflight.remove(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    use async_trait::async_trait;
    use nexus_core::{CacheError, EntityId, EntityKind};

    use crate::backend::MemoryCache;
    use crate::grouper::EdgeGrouper;
    use crate::memory::MemoryStore;
    use crate::resolver::EntityResolver;

    const TTL: Duration = Duration::from_secs(600);

    fn entity(kind: EntityKind, id: &str) -> EntityProjection {
        EntityProjection {
            id: EntityId::from(id),
            kind,
            name: id.to_string(),
            photo: None,
            hash: format!("h-{id}"),
        }
    }

    fn assembler(store: &Arc<MemoryStore>) -> Arc<GraphAssembler> {
        let timeout = Duration::from_secs(5);
        let kinds: BTreeSet<EntityKind> = EntityKind::ALL.into_iter().collect();
        Arc::new(GraphAssembler::new(
            EdgeGrouper::new(store.clone(), timeout),
            EntityResolver::new(store.clone(), kinds, timeout),
            4,
        ))
    }

    fn scenario_store(store: MemoryStore) -> (Arc<MemoryStore>, EntityProjection) {
        let store = Arc::new(store);
        let root = entity(EntityKind::Organization, "r");
        let p1 = entity(EntityKind::Person, "p1");
        let g1 = entity(EntityKind::Group, "g1");
        let c1 = entity(EntityKind::Community, "c1");
        for e in [&root, &p1, &g1, &c1] {
            store.insert(e.clone());
        }
        store.connect(&root.entity_ref(), &p1.entity_ref());
        store.connect(&root.entity_ref(), &g1.entity_ref());
        store.connect(&p1.entity_ref(), &c1.entity_ref());
        (store, root)
    }

    fn graph_cache(backend: Arc<dyn CacheBackend>, store: &Arc<MemoryStore>) -> GraphCache {
        GraphCache::new(backend, assembler(store), TTL, "connections:initial", 100)
    }

    fn name_of<'a>(graph: &'a GraphResult, id: &str) -> &'a str {
        graph
            .nodes
            .iter()
            .find(|n| n.id.as_str() == id)
            .map(|n| n.name.as_str())
            .unwrap()
    }

    struct BrokenCache;

    #[async_trait]
    impl CacheBackend for BrokenCache {
        async fn get(&self, _key: &str) -> std::result::Result<Option<String>, CacheError> {
            Err(CacheError::Unavailable("down".to_string()))
        }
        async fn set(
            &self,
            _key: &str,
            _value: String,
            _ttl: Duration,
        ) -> std::result::Result<(), CacheError> {
            Err(CacheError::Unavailable("down".to_string()))
        }
        async fn delete(&self, _key: &str) -> std::result::Result<(), CacheError> {
            Err(CacheError::Unavailable("down".to_string()))
        }
    }

    #[test]
    fn test_key_uses_hash_and_kind() {
        let (store, root) = scenario_store(MemoryStore::new());
        let cache = graph_cache(Arc::new(MemoryCache::new()), &store);
        assert_eq!(cache.cache_key(&root), "connections:initial:h-r:Organization");
    }

    #[tokio::test]
    async fn test_hit_does_no_assembly() {
        let (store, root) = scenario_store(MemoryStore::new());
        let cache = graph_cache(Arc::new(MemoryCache::new()), &store);

        let first = cache.get_or_build(&root).await.unwrap();
        store.reset_counters();
        let second = cache.get_or_build(&root).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.edge_queries(), 0);
        assert_eq!(store.entity_queries(), 0);
    }

    #[tokio::test]
    async fn test_invalidate_forces_fresh_build() {
        let (store, root) = scenario_store(MemoryStore::new());
        let cache = graph_cache(Arc::new(MemoryCache::new()), &store);

        let before = cache.get_or_build(&root).await.unwrap();
        assert_eq!(name_of(&before, "p1"), "p1");

        let mut renamed = entity(EntityKind::Person, "p1");
        renamed.name = "Renamed".to_string();
        store.insert(renamed);

        // Still cached.
        let cached = cache.get_or_build(&root).await.unwrap();
        assert_eq!(name_of(&cached, "p1"), "p1");

        cache.invalidate(&root).await;
        let after = cache.get_or_build(&root).await.unwrap();
        assert_eq!(name_of(&after, "p1"), "Renamed");
    }

    #[tokio::test]
    async fn test_broken_backend_falls_through() {
        let (store, root) = scenario_store(MemoryStore::new());
        let cache = graph_cache(Arc::new(BrokenCache), &store);

        let graph = cache.get_or_build(&root).await.unwrap();
        assert_eq!(graph.nodes.len(), 4);

        // Nothing was cached, so the next call assembles again.
        store.reset_counters();
        cache.get_or_build(&root).await.unwrap();
        assert!(store.edge_queries() > 0);

        cache.invalidate(&root).await;
    }

    #[tokio::test]
    async fn test_unreadable_entry_is_rebuilt() {
        let (store, root) = scenario_store(MemoryStore::new());
        let backend = Arc::new(MemoryCache::new());
        let cache = graph_cache(backend.clone(), &store);
        backend
            .set(&cache.cache_key(&root), "not json".to_string(), TTL)
            .await
            .unwrap();

        let graph = cache.get_or_build(&root).await.unwrap();
        assert_eq!(graph.nodes.len(), 4);
        assert!(store.edge_queries() > 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_misses_share_one_build() {
        let (store, root) =
            scenario_store(MemoryStore::new().with_latency(Duration::from_millis(50)));
        let cache = graph_cache(Arc::new(MemoryCache::new()), &store);

        let (a, b, c) = tokio::join!(
            cache.get_or_build(&root),
            cache.get_or_build(&root),
            cache.get_or_build(&root)
        );

        assert_eq!(a.unwrap(), b.unwrap());
        assert!(c.is_ok());
        // One assembly: root + p1 + g1.
        assert_eq!(store.edge_queries(), 3);
        assert!(cache
            .inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let (store, root) = scenario_store(MemoryStore::new());
        let cache = graph_cache(Arc::new(MemoryCache::new()), &store);

        cache.get_or_build(&root).await.unwrap();
        store.reset_counters();

        tokio::time::advance(TTL + Duration::from_secs(1)).await;
        cache.get_or_build(&root).await.unwrap();
        assert_eq!(store.edge_queries(), 3);
    }

    #[tokio::test]
    async fn test_failed_build_is_not_cached() {
        let (store, root) = scenario_store(MemoryStore::new());
        let backend = Arc::new(MemoryCache::new());
        let cache = graph_cache(backend.clone(), &store);

        store.set_failing(true);
        assert!(cache.get_or_build(&root).await.is_err());
        assert!(backend.is_empty());

        store.set_failing(false);
        assert_eq!(cache.get_or_build(&root).await.unwrap().nodes.len(), 4);
    }

    #[tokio::test]
    async fn test_known_root_is_served_without_store_calls() {
        let (store, root) = scenario_store(MemoryStore::new());
        let cache = graph_cache(Arc::new(MemoryCache::new()), &store);
        assert!(cache.cached(&root.entity_ref()).await.is_none());

        let built = cache.get_or_build(&root).await.unwrap();
        store.set_failing(true);
        store.reset_counters();

        assert_eq!(cache.cached(&root.entity_ref()).await, Some(built));
        assert_eq!(store.entity_queries(), 0);
        assert_eq!(store.edge_queries(), 0);
    }

    #[tokio::test]
    async fn test_invalidate_known_needs_no_projection() {
        let (store, root) = scenario_store(MemoryStore::new());
        let backend = Arc::new(MemoryCache::new());
        let cache = graph_cache(backend.clone(), &store);

        assert!(!cache.invalidate_known(&root.entity_ref()).await);
        cache.get_or_build(&root).await.unwrap();
        assert!(cache.invalidate_known(&root.entity_ref()).await);

        assert!(backend.is_empty());
        assert!(cache.cached(&root.entity_ref()).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_leaves_the_index() {
        let (store, root) = scenario_store(MemoryStore::new());
        let cache = graph_cache(Arc::new(MemoryCache::new()), &store);
        cache.get_or_build(&root).await.unwrap();

        tokio::time::advance(TTL + Duration::from_secs(1)).await;
        assert!(cache.cached(&root.entity_ref()).await.is_none());
        assert!(!cache.invalidate_known(&root.entity_ref()).await);
    }
}
