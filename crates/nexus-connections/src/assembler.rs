//! Two-hop graph assembly.
//!
//! Resolves a root's direct neighbors (hop 1) and each of their neighbors
//! (hop 2) with one edge query and one fetch per kind per entity, then
//! deduplicates nodes by id and edges by ordered (source, target) pair.
//!
//! Hop-2 branches are independent: they run as an ordered stream with bounded
//! concurrency, each returning its own partial result. Branches are merged in
//! hop-1 order after the join, so the output does not depend on timing.

use std::collections::HashSet;
use std::time::Instant;

use futures_util::stream::{self, StreamExt, TryStreamExt};

use nexus_core::{EntityId, EntityProjection, EntityRef, GraphLink, GraphResult, StoreError};

use crate::error::{ConnectionsError, Result};
use crate::grouper::EdgeGrouper;
use crate::resolver::EntityResolver;

pub struct GraphAssembler {
    grouper: EdgeGrouper,
    resolver: EntityResolver,
    hop2_concurrency: usize,
}

impl GraphAssembler {
    pub fn new(grouper: EdgeGrouper, resolver: EntityResolver, hop2_concurrency: usize) -> Self {
        Self {
            grouper,
            resolver,
            hop2_concurrency: hop2_concurrency.max(1),
        }
    }

    /// Look up the root's projection. Fails before any edge query is issued.
    pub async fn resolve_root(&self, root: &EntityRef) -> Result<EntityProjection> {
        self.resolver
            .resolve_one(root)
            .await?
            .ok_or_else(|| ConnectionsError::RootNotFound {
                kind: root.kind,
                id: root.id.clone(),
            })
    }

    /// Direct neighbors of `entity`: one edge query plus one fetch per kind.
    ///
    /// Neighbors are returned kind by kind, ordered by id within a kind.
    pub async fn neighbors(
        &self,
        entity: &EntityRef,
    ) -> std::result::Result<Vec<EntityProjection>, StoreError> {
        let groups = self.grouper.group_edges(entity).await?;
        if groups.is_empty() {
            return Ok(Vec::new());
        }
        let resolved = self.resolver.resolve_by_kind(&groups).await?;
        Ok(resolved.into_values().flatten().collect())
    }

    /// Build the full two-hop graph around `root`.
    ///
    /// Any store failure fails the whole call; a partial graph is never
    /// returned. A root without edges yields a single-node graph.
    pub async fn assemble_full(&self, root: &EntityProjection) -> Result<GraphResult> {
        let start = Instant::now();
        let root_ref = root.entity_ref();

        let mut acc = GraphAccumulator::seeded(root);
        let mut visited: HashSet<EntityId> = HashSet::from([root.id.clone()]);

        // Hop 1.
        let mut frontier = Vec::new();
        for entity in self.neighbors(&root_ref).await? {
            if !visited.insert(entity.id.clone()) {
                continue;
            }
            acc.push_edge(root, &entity);
            acc.push_node(entity.clone());
            frontier.push(entity);
        }
        if frontier.is_empty() {
            tracing::info!(root = %root_ref, "Root has no visible neighbors");
            return Ok(GraphResult::single(root));
        }

        // Hop 2. Not gated on `visited`: anything reachable from a hop-1 entity
        // is added and the final dedup collapses repeats. The root itself is
        // skipped, its edge to the hop-1 entity is already recorded.
        let branches: Vec<Vec<EntityProjection>> = stream::iter(frontier.iter())
            .map(|entity| self.hop2_branch(entity, &root.id))
            .buffered(self.hop2_concurrency)
            .try_collect()
            .await?;

        for (entity, neighbors) in frontier.iter().zip(branches) {
            for neighbor in neighbors {
                acc.push_edge(entity, &neighbor);
                acc.push_node(neighbor);
            }
        }

        let graph = acc.finish(root);
        tracing::info!(
            root = %root_ref,
            hop1 = frontier.len(),
            nodes = graph.nodes.len(),
            edges = graph.edges.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Assembled connections graph"
        );
        Ok(graph)
    }

    async fn hop2_branch(
        &self,
        entity: &EntityProjection,
        root_id: &EntityId,
    ) -> std::result::Result<Vec<EntityProjection>, StoreError> {
        let mut neighbors = self.neighbors(&entity.entity_ref()).await?;
        neighbors.retain(|n| &n.id != root_id);
        tracing::debug!(entity = %entity.entity_ref(), neighbors = neighbors.len(), "Resolved hop 2");
        Ok(neighbors)
    }
}

/// Node and edge lists of a graph under construction.
///
/// Accepts duplicates; `finish` removes them.
pub(crate) struct GraphAccumulator {
    nodes: Vec<EntityProjection>,
    edges: Vec<GraphLink>,
}

impl GraphAccumulator {
    pub(crate) fn new() -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    pub(crate) fn seeded(root: &EntityProjection) -> Self {
        let mut acc = Self::new();
        acc.push_node(root.clone());
        acc
    }

    pub(crate) fn push_node(&mut self, node: EntityProjection) {
        self.nodes.push(node);
    }

    pub(crate) fn push_edge(&mut self, source: &EntityProjection, target: &EntityProjection) {
        self.edges.push(GraphLink::new(source, target));
    }

    /// Deduplicate and wrap into a result for `root`. First occurrence wins.
    pub(crate) fn finish(self, root: &EntityProjection) -> GraphResult {
        let mut seen_nodes = HashSet::new();
        let nodes = self
            .nodes
            .into_iter()
            .filter(|n| seen_nodes.insert(n.id.clone()))
            .collect();

        let mut seen_edges = HashSet::new();
        let edges = self
            .edges
            .into_iter()
            .filter(|e| seen_edges.insert(e.clone()))
            .collect();

        GraphResult {
            nodes,
            edges,
            ..GraphResult::empty(root)
        }
    }
}
