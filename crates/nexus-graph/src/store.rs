//! `EdgeStore` / `EntityStore` implementations for the Neo4j client.

use async_trait::async_trait;

use nexus_core::{
    EdgeRecord, EdgeStore, EntityId, EntityKind, EntityProjection, EntityRef, EntityStore,
    StoreError,
};

use crate::client::GraphClient;

#[async_trait]
impl EdgeStore for GraphClient {
    async fn find_edges_touching(&self, entity: &EntityRef) -> Result<Vec<EdgeRecord>, StoreError> {
        Ok(GraphClient::find_edges_touching(self, entity).await?)
    }
}

#[async_trait]
impl EntityStore for GraphClient {
    async fn find_by_ids(
        &self,
        kind: EntityKind,
        ids: &[EntityId],
    ) -> Result<Vec<EntityProjection>, StoreError> {
        Ok(GraphClient::find_by_ids(self, kind, ids).await?)
    }
}
