//! Per-kind projection table.
//!
//! Each entity kind maps to a Neo4j label and to the node properties that
//! hold its display name and image. Projections are built from this static
//! table; node labels are never interpreted any other way.

use nexus_core::{EntityId, EntityKind, EntityProjection};

use crate::client::GraphError;

/// How nodes of one kind are projected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectionSpec {
    pub kind: EntityKind,
    pub label: &'static str,
    pub name_property: &'static str,
    pub photo_property: Option<&'static str>,
}

const SPECS: [ProjectionSpec; 5] = [
    ProjectionSpec {
        kind: EntityKind::Person,
        label: "Person",
        name_property: "name",
        photo_property: Some("hero_img_url"),
    },
    ProjectionSpec {
        kind: EntityKind::Group,
        label: "Group",
        name_property: "name",
        photo_property: Some("hero_img_url"),
    },
    ProjectionSpec {
        kind: EntityKind::Organization,
        label: "Organization",
        name_property: "name",
        photo_property: Some("hero_img_url"),
    },
    ProjectionSpec {
        kind: EntityKind::Community,
        label: "Community",
        name_property: "title",
        photo_property: Some("hero_img_url"),
    },
    ProjectionSpec {
        kind: EntityKind::Proposal,
        label: "Proposal",
        name_property: "title",
        photo_property: None,
    },
];

/// Projection spec for a kind.
pub fn projection_spec(kind: EntityKind) -> &'static ProjectionSpec {
    // SPECS is ordered like EntityKind::ALL.
    let idx = EntityKind::ALL
        .iter()
        .position(|k| *k == kind)
        .unwrap_or_default();
    &SPECS[idx]
}

/// Resolve a node's kind from its labels. The first known label wins.
pub fn kind_for_labels(labels: &[String]) -> Result<EntityKind, GraphError> {
    labels
        .iter()
        .find_map(|l| SPECS.iter().find(|s| s.label == l.as_str()).map(|s| s.kind))
        .ok_or_else(|| GraphError::UnknownLabel(labels.join(":")))
}

/// Project a Neo4j node of the given kind.
pub fn project_node(node: &neo4rs::Node, kind: EntityKind) -> EntityProjection {
    let spec = projection_spec(kind);
    let id: String = node.get("id").unwrap_or_default();
    let name: String = node.get(spec.name_property).unwrap_or_default();
    let photo = spec
        .photo_property
        .and_then(|p| node.get::<String>(p).ok())
        .filter(|s| !s.is_empty());
    let hash: String = node.get("hash").unwrap_or_default();

    EntityProjection {
        id: EntityId(id),
        kind,
        name,
        photo,
        hash,
    }
}
