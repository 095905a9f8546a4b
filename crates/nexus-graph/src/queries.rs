//! Read operations for the connections graph.

use chrono::{DateTime, Utc};
use neo4rs::query;

use nexus_core::{EdgeRecord, EntityId, EntityKind, EntityProjection, EntityRef};

use crate::client::{GraphClient, GraphError};
use crate::kinds::{kind_for_labels, project_node, projection_spec};

/// Relationship type used for every connection.
pub const CONNECTION_TYPE: &str = "CONNECTED_TO";

impl GraphClient {
    // ── Edge Queries ─────────────────────────────────────────────

    /// All connections with `entity` on either side.
    ///
    /// One undirected match covers both stored directions, so this is always a
    /// single round trip. Endpoints with labels outside the known kinds are
    /// dropped.
    pub async fn find_edges_touching(
        &self,
        entity: &EntityRef,
    ) -> Result<Vec<EdgeRecord>, GraphError> {
        let label = projection_spec(entity.kind).label;
        let cypher = format!(
            "MATCH (a:{label} {{id: $id}})-[r:{CONNECTION_TYPE}]-(b)
             RETURN startNode(r).id AS from_id, labels(startNode(r)) AS from_labels,
                    endNode(r).id AS to_id, labels(endNode(r)) AS to_labels,
                    r.created_at AS created_at"
        );

        let q = query(&cypher).param("id", entity.id.0.clone());

        let rows = self.query_rows(q).await?;
        let mut edges = Vec::with_capacity(rows.len());
        for row in rows {
            let from_labels: Vec<String> = row.get("from_labels").unwrap_or_default();
            let to_labels: Vec<String> = row.get("to_labels").unwrap_or_default();

            let (from_kind, to_kind) =
                match (kind_for_labels(&from_labels), kind_for_labels(&to_labels)) {
                    (Ok(f), Ok(t)) => (f, t),
                    (Err(e), _) | (_, Err(e)) => {
                        tracing::debug!(entity = %entity, error = %e, "Skipping edge");
                        continue;
                    }
                };

            let from_id: String = row
                .get("from_id")
                .map_err(|e| GraphError::Serialization(format!("Failed to get from_id: {e}")))?;
            let to_id: String = row
                .get("to_id")
                .map_err(|e| GraphError::Serialization(format!("Failed to get to_id: {e}")))?;
            let created_at = row
                .get::<String>("created_at")
                .ok()
                .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
                .map(|dt| dt.with_timezone(&Utc));

            edges.push(EdgeRecord {
                from: EntityRef::new(from_kind, from_id),
                to: EntityRef::new(to_kind, to_id),
                created_at,
            });
        }

        Ok(edges)
    }

    // ── Entity Queries ───────────────────────────────────────────

    /// Projections for a batch of ids of one kind.
    ///
    /// Soft-deleted and hidden nodes are filtered out in the query; missing ids
    /// simply produce no row.
    pub async fn find_by_ids(
        &self,
        kind: EntityKind,
        ids: &[EntityId],
    ) -> Result<Vec<EntityProjection>, GraphError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let label = projection_spec(kind).label;
        let cypher = format!(
            "MATCH (n:{label})
             WHERE n.id IN $ids
               AND n.deleted_at IS NULL
               AND coalesce(n.hidden, false) = false
             RETURN n"
        );

        let ids: Vec<String> = ids.iter().map(|id| id.0.clone()).collect();
        let q = query(&cypher).param("ids", ids);

        let rows = self.query_rows(q).await?;
        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            let node: neo4rs::Node = row.get("n").map_err(|e| {
                GraphError::Serialization(format!("Failed to deserialize node: {e}"))
            })?;
            results.push(project_node(&node, kind));
        }
        Ok(results)
    }

    /// Single-entity lookup, `None` when the entity is missing or hidden.
    pub async fn find_entity(
        &self,
        entity: &EntityRef,
    ) -> Result<Option<EntityProjection>, GraphError> {
        let mut found = self
            .find_by_ids(entity.kind, std::slice::from_ref(&entity.id))
            .await?;
        Ok(found.pop())
    }
}
