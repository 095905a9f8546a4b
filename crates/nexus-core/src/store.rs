//! Seams between the graph engine and its collaborators.
//!
//! The engine is handed `Arc<dyn ...>` implementations of these traits at
//! construction time. Nothing in the engine reaches a store or cache any
//! other way.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{CacheError, StoreError};
use crate::types::{EdgeRecord, EntityId, EntityKind, EntityProjection, EntityRef};

/// Read access to the generic bidirectional edge list.
#[async_trait]
pub trait EdgeStore: Send + Sync {
    /// All edges with `entity` on either side, in a single round trip.
    async fn find_edges_touching(&self, entity: &EntityRef) -> Result<Vec<EdgeRecord>, StoreError>;
}

/// Batched lookup of entity projections.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Projections for `ids` of one `kind`, in one fetch.
    ///
    /// Ids that do not exist, are soft-deleted or hidden are omitted silently.
    async fn find_by_ids(
        &self,
        kind: EntityKind,
        ids: &[EntityId],
    ) -> Result<Vec<EntityProjection>, StoreError>;
}

/// Generic string-keyed cache with per-entry time-to-live.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}
