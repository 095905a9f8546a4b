//! nexus-connections: Two-hop connections graph around a root entity.
//!
//! Groups each entity's edges by the far endpoint's kind, resolves every kind
//! with one batched fetch, and assembles the root's direct and second-degree
//! neighbors into a deduplicated node/link graph. Full graphs are cached per
//! root; one-hop "show more" expansions are always computed fresh.

pub mod assembler;
pub mod backend;
pub mod cache;
pub mod config;
mod deadline;
pub mod error;
pub mod expand;
pub mod grouper;
pub mod memory;
pub mod resolver;
pub mod types;

pub use backend::MemoryCache;
pub use config::ConnectionsConfig;
pub use error::ConnectionsError;
pub use memory::MemoryStore;
pub use types::{Ack, ConnectionsRequest, ErrorLine};

use std::collections::HashSet;
use std::sync::Arc;

use nexus_core::{
    CacheBackend, EdgeStore, EntityId, EntityRef, EntityStore, GraphEvent, GraphResult,
};

use crate::assembler::GraphAssembler;
use crate::cache::GraphCache;
use crate::error::Result;
use crate::expand::{IncrementalExpander, EXPAND_FAILED};
use crate::grouper::EdgeGrouper;
use crate::resolver::EntityResolver;

/// Entry point used by the CLI and by embedding services.
pub struct ConnectionsEngine {
    assembler: Arc<GraphAssembler>,
    cache: GraphCache,
    expander: IncrementalExpander,
}

impl ConnectionsEngine {
    /// Wire the traversal, cache and expander over the given stores.
    pub fn new(
        edges: Arc<dyn EdgeStore>,
        entities: Arc<dyn EntityStore>,
        backend: Arc<dyn CacheBackend>,
        config: ConnectionsConfig,
    ) -> Result<Self> {
        config.validate()?;

        let timeout = config.store_timeout();
        let assembler = Arc::new(GraphAssembler::new(
            EdgeGrouper::new(edges, timeout),
            EntityResolver::new(entities, config.neighbor_kind_set(), timeout),
            config.hop2_concurrency,
        ));
        let cache = GraphCache::new(
            backend,
            assembler.clone(),
            config.cache_ttl(),
            config.cache_key_prefix.clone(),
            config.cache_capacity,
        );
        let expander = IncrementalExpander::new(assembler.clone());

        tracing::debug!(
            ttl_secs = config.cache_ttl_secs,
            timeout_ms = config.store_timeout_ms,
            hop2_concurrency = config.hop2_concurrency,
            "Connections engine ready"
        );

        Ok(Self {
            assembler,
            cache,
            expander,
        })
    }

    /// Full two-hop graph around `root`, from cache when fresh.
    ///
    /// A root already in the cache is served without any store call.
    pub async fn graph(&self, root: &EntityRef) -> Result<GraphResult> {
        if let Some(graph) = self.cache.cached(root).await {
            return Ok(graph);
        }
        let projection = self.assembler.resolve_root(root).await?;
        self.cache.get_or_build(&projection).await
    }

    /// One-hop delta around `root` without the ids in `exclude`.
    ///
    /// Only an unknown root is an error. Store failures, including while
    /// loading the root, come back as a degraded result.
    pub async fn expand(
        &self,
        root: &EntityRef,
        exclude: &HashSet<EntityId>,
    ) -> Result<GraphResult> {
        let projection = match self.assembler.resolve_root(root).await {
            Ok(projection) => projection,
            Err(ConnectionsError::StoreUnavailable(e)) => {
                tracing::warn!(root = %root, error = %e, "Expand degraded, root not loaded");
                return Ok(GraphResult::unresolved(root, EXPAND_FAILED));
            }
            Err(e) => return Err(e),
        };
        Ok(self.expander.expand_one_hop(&projection, exclude).await)
    }

    /// Drop the cached graph of `root`.
    ///
    /// A root cached by this engine is dropped without a store call, so this
    /// works during an outage and after the root was hidden. Otherwise the
    /// root is loaded to find its key.
    pub async fn invalidate(&self, root: &EntityRef) -> Result<()> {
        if self.cache.invalidate_known(root).await {
            return Ok(());
        }
        let projection = self.assembler.resolve_root(root).await?;
        self.cache.invalidate(&projection).await;
        Ok(())
    }

    /// Invalidate the cached graph of every root `event` touches.
    ///
    /// Roots that no longer resolve have nothing to drop and are skipped.
    /// Returns the number of roots invalidated.
    pub async fn handle_event(&self, event: &GraphEvent) -> Result<usize> {
        let mut invalidated = 0;
        for root in event.affected_roots() {
            match self.invalidate(root).await {
                Ok(()) => invalidated += 1,
                Err(ConnectionsError::RootNotFound { .. }) => {
                    tracing::debug!(root = %root, "Event names an unresolvable root");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(invalidated)
    }

    /// Serve one worker request. Failures become an `{"error": ...}` value.
    pub async fn handle_request(&self, request: ConnectionsRequest) -> serde_json::Value {
        let op = request.op();
        let root = request.root().as_ref().map(ToString::to_string);
        let outcome = match request {
            ConnectionsRequest::Graph { kind, id } => self
                .graph(&EntityRef::new(kind, id))
                .await
                .and_then(|graph| Ok(serde_json::to_value(graph)?)),
            ConnectionsRequest::Expand { kind, id, exclude } => self
                .expand(&EntityRef::new(kind, id), &exclude)
                .await
                .and_then(|delta| Ok(serde_json::to_value(delta)?)),
            ConnectionsRequest::Invalidate { kind, id } => self
                .invalidate(&EntityRef::new(kind, id))
                .await
                .and_then(|()| Ok(serde_json::to_value(Ack::ok())?)),
            ConnectionsRequest::Event { event } => self
                .handle_event(&event)
                .await
                .and_then(|_| Ok(serde_json::to_value(Ack::ok())?)),
        };

        outcome.unwrap_or_else(|e| {
            tracing::warn!(
                op,
                root = root.as_deref().unwrap_or("-"),
                error = %e,
                "Request failed"
            );
            serde_json::json!({ "error": e.to_string() })
        })
    }
}
