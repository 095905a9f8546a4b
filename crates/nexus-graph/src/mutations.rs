//! Write operations for the connections graph.
//!
//! The graph engine itself never writes. These helpers are used by the owning
//! domain to mirror entities and record connections, and by tests to seed
//! data. Entities use MERGE (upsert) semantics keyed by (label, id);
//! connections are created once and never updated.

use chrono::{DateTime, Utc};
use neo4rs::query;
use uuid::Uuid;

use nexus_core::{EntityProjection, EntityRef};

use crate::client::{GraphClient, GraphError};
use crate::kinds::projection_spec;
use crate::queries::CONNECTION_TYPE;

impl GraphClient {
    // ── Entity Upserts ───────────────────────────────────────────

    /// Upsert the projected fields of an entity.
    pub async fn upsert_entity(&self, entity: &EntityProjection) -> Result<(), GraphError> {
        let spec = projection_spec(entity.kind);
        let photo_set = match spec.photo_property {
            Some(prop) => format!(", n.{prop} = $photo"),
            None => String::new(),
        };
        let cypher = format!(
            "MERGE (n:{label} {{id: $id}})
             ON CREATE SET n.{name} = $name, n.hash = $hash, n.created_at = $now{photo_set}
             ON MATCH SET n.{name} = $name, n.hash = $hash{photo_set}",
            label = spec.label,
            name = spec.name_property,
        );

        let q = query(&cypher)
            .param("id", entity.id.0.clone())
            .param("name", entity.name.clone())
            .param("hash", entity.hash.clone())
            .param("photo", entity.photo.clone().unwrap_or_default())
            .param("now", Utc::now().to_rfc3339());

        self.run(q).await
    }

    /// Mark an entity hidden so it stops resolving.
    pub async fn hide_entity(&self, entity: &EntityRef) -> Result<(), GraphError> {
        let label = projection_spec(entity.kind).label;
        let q = query(&format!("MATCH (n:{label} {{id: $id}}) SET n.hidden = true"))
            .param("id", entity.id.0.clone());
        self.run(q).await
    }

    // ── Connections ──────────────────────────────────────────────

    /// Record a connection from `previous` to `next`.
    ///
    /// Both endpoints must already exist. A second call for the same ordered
    /// pair is a no-op. Returns the connection's creation time.
    pub async fn record_connection(
        &self,
        previous: &EntityRef,
        next: &EntityRef,
    ) -> Result<DateTime<Utc>, GraphError> {
        let now = Utc::now();
        let cypher = format!(
            "MATCH (a:{from_label} {{id: $from_id}}), (b:{to_label} {{id: $to_id}})
             MERGE (a)-[r:{CONNECTION_TYPE}]->(b)
             ON CREATE SET r.id = $edge_id, r.created_at = $now",
            from_label = projection_spec(previous.kind).label,
            to_label = projection_spec(next.kind).label,
        );

        let q = query(&cypher)
            .param("from_id", previous.id.0.clone())
            .param("to_id", next.id.0.clone())
            .param("edge_id", Uuid::new_v4().to_string())
            .param("now", now.to_rfc3339());

        self.run(q).await?;
        tracing::debug!(from = %previous, to = %next, "Connection recorded");
        Ok(now)
    }
}
