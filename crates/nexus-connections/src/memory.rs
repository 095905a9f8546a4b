//! In-process edge and entity store.
//!
//! Backs the CLI's `--fixture` mode and the test suite. Counts every call so
//! the batching guarantees of the traversal can be observed, and can be
//! switched into a failing or slow mode.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use nexus_core::{
    EdgeRecord, EdgeStore, EntityId, EntityKind, EntityProjection, EntityRef, EntityStore,
    StoreError,
};

use crate::error::Result;

/// On-disk fixture: `{"entities": [...], "edges": [{"from": ..., "to": ...}]}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub entities: Vec<FixtureEntity>,
    #[serde(default)]
    pub edges: Vec<EdgeRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FixtureEntity {
    #[serde(flatten)]
    pub projection: EntityProjection,
    #[serde(default)]
    pub hidden: bool,
}

#[derive(Debug, Clone)]
struct StoredEntity {
    projection: EntityProjection,
    hidden: bool,
}

#[derive(Default)]
pub struct MemoryStore {
    entities: RwLock<HashMap<EntityRef, StoredEntity>>,
    edges: RwLock<Vec<EdgeRecord>>,
    edge_queries: AtomicUsize,
    entity_fetches: Mutex<Vec<(EntityKind, Vec<EntityId>)>>,
    failing: AtomicBool,
    edges_failing: AtomicBool,
    latency: Option<Duration>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call by `latency` before answering.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn from_fixture(fixture: Fixture) -> Self {
        let store = Self::new();
        for entity in fixture.entities {
            let entity_ref = entity.projection.entity_ref();
            store.insert(entity.projection);
            if entity.hidden {
                store.hide(&entity_ref);
            }
        }
        for edge in fixture.edges {
            store.push_edge(edge);
        }
        store
    }

    /// Load a JSON fixture file.
    pub fn load_fixture(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let fixture: Fixture = serde_json::from_str(&raw)?;
        tracing::info!(
            path = %path.display(),
            entities = fixture.entities.len(),
            edges = fixture.edges.len(),
            "Loaded fixture"
        );
        Ok(Self::from_fixture(fixture))
    }

    // ── Data ─────────────────────────────────────────────────────

    /// Insert or replace an entity. Replacing clears its hidden flag.
    pub fn insert(&self, projection: EntityProjection) {
        let mut entities = self.entities.write().unwrap_or_else(PoisonError::into_inner);
        entities.insert(
            projection.entity_ref(),
            StoredEntity {
                projection,
                hidden: false,
            },
        );
    }

    /// Hide an entity; it keeps its edges but stops resolving.
    pub fn hide(&self, entity: &EntityRef) {
        let mut entities = self.entities.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(stored) = entities.get_mut(entity) {
            stored.hidden = true;
        }
    }

    /// Record a connection from `from` to `to`.
    pub fn connect(&self, from: &EntityRef, to: &EntityRef) {
        self.push_edge(EdgeRecord::new(from.clone(), to.clone()));
    }

    fn push_edge(&self, edge: EdgeRecord) {
        self.edges
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(edge);
    }

    // ── Observability ────────────────────────────────────────────

    /// Make every subsequent call fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Make only edge queries fail; entity fetches keep working.
    pub fn set_edges_failing(&self, failing: bool) {
        self.edges_failing.store(failing, Ordering::SeqCst);
    }

    /// Number of edge queries answered so far.
    pub fn edge_queries(&self) -> usize {
        self.edge_queries.load(Ordering::SeqCst)
    }

    /// Number of entity fetches answered so far.
    pub fn entity_queries(&self) -> usize {
        self.fetch_log().len()
    }

    /// Every entity fetch so far, with the ids it asked for.
    pub fn fetch_log(&self) -> Vec<(EntityKind, Vec<EntityId>)> {
        self.entity_fetches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn reset_counters(&self) {
        self.edge_queries.store(0, Ordering::SeqCst);
        self.entity_fetches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    async fn answer(&self) -> std::result::Result<(), StoreError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store set to fail".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl EdgeStore for MemoryStore {
    async fn find_edges_touching(
        &self,
        entity: &EntityRef,
    ) -> std::result::Result<Vec<EdgeRecord>, StoreError> {
        self.edge_queries.fetch_add(1, Ordering::SeqCst);
        self.answer().await?;
        if self.edges_failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("edge queries set to fail".to_string()));
        }

        let edges = self.edges.read().unwrap_or_else(PoisonError::into_inner);
        Ok(edges
            .iter()
            .filter(|e| e.other_end(entity).is_some())
            .cloned()
            .collect())
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn find_by_ids(
        &self,
        kind: EntityKind,
        ids: &[EntityId],
    ) -> std::result::Result<Vec<EntityProjection>, StoreError> {
        self.entity_fetches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((kind, ids.to_vec()));
        self.answer().await?;

        let entities = self.entities.read().unwrap_or_else(PoisonError::into_inner);
        Ok(ids
            .iter()
            .filter_map(|id| entities.get(&EntityRef::new(kind, id.clone())))
            .filter(|stored| !stored.hidden)
            .map(|stored| stored.projection.clone())
            .collect())
    }
}
