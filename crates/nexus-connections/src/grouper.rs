//! Edge grouping: one edge query per entity, far endpoints grouped by kind.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use nexus_core::{EdgeStore, EntityId, EntityKind, EntityRef, StoreError};

use crate::deadline::with_deadline;

/// Far-endpoint ids of an entity's edges, deduplicated and grouped by kind.
pub type KindGroups = BTreeMap<EntityKind, BTreeSet<EntityId>>;

pub struct EdgeGrouper {
    edges: Arc<dyn EdgeStore>,
    timeout: Duration,
}

impl EdgeGrouper {
    pub fn new(edges: Arc<dyn EdgeStore>, timeout: Duration) -> Self {
        Self { edges, timeout }
    }

    /// Group the far endpoints of every edge touching `entity`.
    ///
    /// Issues exactly one store query covering both stored directions. An
    /// entity without edges yields an empty map.
    pub async fn group_edges(&self, entity: &EntityRef) -> Result<KindGroups, StoreError> {
        let edges = with_deadline(
            "find_edges_touching",
            self.timeout,
            self.edges.find_edges_touching(entity),
        )
        .await?;

        let mut groups = KindGroups::new();
        for edge in &edges {
            if let Some(other) = edge.other_end(entity) {
                groups.entry(other.kind).or_default().insert(other.id.clone());
            }
        }

        tracing::debug!(
            entity = %entity,
            edges = edges.len(),
            kinds = groups.len(),
            "Grouped edges"
        );
        Ok(groups)
    }
}
