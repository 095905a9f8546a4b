//! Incremental one-hop expansion for "show more" interactions.
//!
//! Never reads or writes the full-graph cache. Failures degrade to an empty
//! delta with an error marker instead of propagating, so an exploratory UI
//! keeps working while a store is struggling.

use std::collections::HashSet;
use std::sync::Arc;

use nexus_core::{EntityId, EntityProjection, GraphResult};

use crate::assembler::{GraphAccumulator, GraphAssembler};

/// Error marker set on a degraded expand result.
pub const EXPAND_FAILED: &str = "Failed to load connections";

pub struct IncrementalExpander {
    assembler: Arc<GraphAssembler>,
}

impl IncrementalExpander {
    pub fn new(assembler: Arc<GraphAssembler>) -> Self {
        Self { assembler }
    }

    /// Neighbors of `root` whose ids are not in `exclude`, as a delta graph.
    ///
    /// The root is treated as already shown and never appears in the delta.
    pub async fn expand_one_hop(
        &self,
        root: &EntityProjection,
        exclude: &HashSet<EntityId>,
    ) -> GraphResult {
        let root_ref = root.entity_ref();
        let neighbors = match self.assembler.neighbors(&root_ref).await {
            Ok(neighbors) => neighbors,
            Err(e) => {
                tracing::warn!(root = %root_ref, error = %e, "Expand degraded");
                return GraphResult::degraded(root, EXPAND_FAILED);
            }
        };

        let mut acc = GraphAccumulator::new();
        for neighbor in neighbors {
            if neighbor.id == root.id || exclude.contains(&neighbor.id) {
                continue;
            }
            acc.push_edge(root, &neighbor);
            acc.push_node(neighbor);
        }

        let delta = acc.finish(root);
        tracing::debug!(
            root = %root_ref,
            excluded = exclude.len(),
            nodes = delta.nodes.len(),
            "Expanded one hop"
        );
        delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::time::Duration;

    use nexus_core::{EntityKind, EntityRef};

    use crate::grouper::EdgeGrouper;
    use crate::memory::MemoryStore;
    use crate::resolver::EntityResolver;

    fn entity(kind: EntityKind, id: &str) -> EntityProjection {
        EntityProjection {
            id: EntityId::from(id),
            kind,
            name: id.to_string(),
            photo: None,
            hash: format!("h-{id}"),
        }
    }

    fn expander(store: &Arc<MemoryStore>) -> IncrementalExpander {
        let timeout = Duration::from_secs(1);
        let kinds: BTreeSet<EntityKind> = EntityKind::ALL.into_iter().collect();
        let assembler = GraphAssembler::new(
            EdgeGrouper::new(store.clone(), timeout),
            EntityResolver::new(store.clone(), kinds, timeout),
            2,
        );
        IncrementalExpander::new(Arc::new(assembler))
    }

    /// R -- P1, R -- G1, P1 -- C1.
    fn scenario_store() -> (Arc<MemoryStore>, EntityProjection) {
        let store = Arc::new(MemoryStore::new());
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

    #[tokio::test]
    async fn test_excluded_ids_are_filtered() {
        let (store, root) = scenario_store();
        let exclude = HashSet::from([EntityId::from("p1")]);

        let delta = expander(&store).expand_one_hop(&root, &exclude).await;

        let ids: Vec<&str> = delta.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["g1"]);
        assert_eq!(delta.edges.len(), 1);
        assert_eq!(delta.edges[0].source.as_str(), "r");
        assert_eq!(delta.edges[0].target.as_str(), "g1");
        assert!(delta.error.is_none());
    }

    #[tokio::test]
    async fn test_only_one_hop_is_resolved() {
        let (store, root) = scenario_store();

        let delta = expander(&store).expand_one_hop(&root, &HashSet::new()).await;

        assert!(!delta.contains_node(&EntityId::from("c1")));
        assert!(!delta.contains_node(&root.id));
        assert_eq!(delta.nodes.len(), 2);
        assert_eq!(store.edge_queries(), 1);
    }

    #[tokio::test]
    async fn test_failure_degrades_instead_of_erroring() {
        let (store, root) = scenario_store();
        store.set_failing(true);

        let delta = expander(&store).expand_one_hop(&root, &HashSet::new()).await;

        assert!(delta.nodes.is_empty());
        assert!(delta.edges.is_empty());
        assert_eq!(delta.error.as_deref(), Some(EXPAND_FAILED));
        assert_eq!(delta.root_node_id, root.id);
    }

    #[tokio::test]
    async fn test_everything_excluded_is_empty_not_error() {
        let (store, root) = scenario_store();
        let exclude = HashSet::from([EntityId::from("p1"), EntityId::from("g1")]);

        let delta = expander(&store).expand_one_hop(&root, &exclude).await;

        assert!(delta.nodes.is_empty());
        assert!(delta.error.is_none());
    }

    #[tokio::test]
    async fn test_self_loop_does_not_return_root() {
        let store = Arc::new(MemoryStore::new());
        let root = entity(EntityKind::Person, "p1");
        store.insert(root.clone());
        store.connect(&root.entity_ref(), &EntityRef::new(EntityKind::Person, "p1"));

        let delta = expander(&store).expand_one_hop(&root, &HashSet::new()).await;
        assert!(delta.nodes.is_empty());
        assert!(delta.edges.is_empty());
    }
}
