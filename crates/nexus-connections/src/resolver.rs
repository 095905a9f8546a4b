//! Batched entity resolution: one fetch per kind, never one per id.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::try_join_all;

use nexus_core::{EntityId, EntityKind, EntityProjection, EntityRef, EntityStore, StoreError};

use crate::deadline::with_deadline;
use crate::grouper::KindGroups;

/// Resolved projections grouped by kind.
pub type ResolvedGroups = BTreeMap<EntityKind, Vec<EntityProjection>>;

pub struct EntityResolver {
    entities: Arc<dyn EntityStore>,
    neighbor_kinds: BTreeSet<EntityKind>,
    timeout: Duration,
}

impl EntityResolver {
    pub fn new(
        entities: Arc<dyn EntityStore>,
        neighbor_kinds: BTreeSet<EntityKind>,
        timeout: Duration,
    ) -> Self {
        Self {
            entities,
            neighbor_kinds,
            timeout,
        }
    }

    /// Resolve grouped ids into projections.
    ///
    /// Kinds with no ids, and kinds that are not neighbor kinds, are skipped
    /// without a query. Each remaining kind costs exactly one fetch; the
    /// fetches run concurrently. Ids the store does not return are dropped.
    /// Within a kind, projections come back ordered by id.
    pub async fn resolve_by_kind(&self, groups: &KindGroups) -> Result<ResolvedGroups, StoreError> {
        let batches: Vec<(EntityKind, Vec<EntityId>)> = groups
            .iter()
            .filter(|(kind, ids)| !ids.is_empty() && self.neighbor_kinds.contains(*kind))
            .map(|(kind, ids)| (*kind, ids.iter().cloned().collect()))
            .collect();

        let fetched = try_join_all(batches.iter().map(|(kind, ids)| self.fetch(*kind, ids))).await?;

        let mut resolved = ResolvedGroups::new();
        for ((kind, requested), mut found) in batches.into_iter().zip(fetched) {
            found.retain(|p| p.kind == kind);
            found.sort_by(|a, b| a.id.cmp(&b.id));
            found.dedup_by(|a, b| a.id == b.id);
            if found.len() < requested.len() {
                tracing::debug!(
                    kind = %kind,
                    requested = requested.len(),
                    found = found.len(),
                    "Some ids did not resolve"
                );
            }
            resolved.insert(kind, found);
        }
        Ok(resolved)
    }

    /// Resolve a single entity of any kind, neighbor kind or not.
    pub async fn resolve_one(
        &self,
        entity: &EntityRef,
    ) -> Result<Option<EntityProjection>, StoreError> {
        let found = self
            .fetch(entity.kind, std::slice::from_ref(&entity.id))
            .await?;
        Ok(found.into_iter().find(|p| p.id == entity.id))
    }

    async fn fetch(
        &self,
        kind: EntityKind,
        ids: &[EntityId],
    ) -> Result<Vec<EntityProjection>, StoreError> {
        with_deadline("find_by_ids", self.timeout, self.entities.find_by_ids(kind, ids)).await
    }
}
