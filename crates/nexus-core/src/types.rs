//! Core domain types for the connections graph.
//!
//! Entities are opaque to the graph engine: it only ever sees a reference
//! (kind + id) or the small public projection needed to draw a node.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Entity Kinds ──────────────────────────────────────────────────

/// The closed set of entity kinds that can take part in the graph.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    #[serde(alias = "person")]
    Person,
    #[serde(alias = "group")]
    Group,
    #[serde(alias = "organization")]
    Organization,
    #[serde(alias = "community")]
    Community,
    #[serde(alias = "proposal")]
    Proposal,
}

impl EntityKind {
    pub const ALL: [EntityKind; 5] = [
        EntityKind::Person,
        EntityKind::Group,
        EntityKind::Organization,
        EntityKind::Community,
        EntityKind::Proposal,
    ];

    /// Stable label: Neo4j node label and the `type` value on the wire.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Person => "Person",
            Self::Group => "Group",
            Self::Organization => "Organization",
            Self::Community => "Community",
            Self::Proposal => "Proposal",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Error returned when a string names no known entity kind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown entity kind: {0}")]
pub struct UnknownKind(pub String);

impl FromStr for EntityKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}

// ── References & Projections ──────────────────────────────────────

/// Identifier of an entity within its kind. Compared as a plain string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A (kind, id) pair identifying any graph participant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: EntityId,
}

impl EntityRef {
    pub fn new(kind: EntityKind, id: impl Into<EntityId>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// The minimal public view of an entity, serialized as a graph node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntityProjection {
    pub id: EntityId,
    #[serde(rename = "type")]
    pub kind: EntityKind,
    pub name: String,
    pub photo: Option<String>,
    /// Stable opaque hash, used for cache keys and external links.
    pub hash: String,
}

impl EntityProjection {
    pub fn entity_ref(&self) -> EntityRef {
        EntityRef {
            kind: self.kind,
            id: self.id.clone(),
        }
    }
}

// ── Edges ─────────────────────────────────────────────────────────

/// A stored connection between two entities. Immutable once created.
///
/// Stored direction is kept for provenance only; traversal treats the edge
/// as undirected.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EdgeRecord {
    pub from: EntityRef,
    pub to: EntityRef,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl EdgeRecord {
    pub fn new(from: EntityRef, to: EntityRef) -> Self {
        Self {
            from,
            to,
            created_at: None,
        }
    }

    /// The endpoint that is not `entity`, or `None` if the edge does not touch it.
    /// A self-loop returns the entity itself.
    pub fn other_end(&self, entity: &EntityRef) -> Option<&EntityRef> {
        if &self.from == entity {
            Some(&self.to)
        } else if &self.to == entity {
            Some(&self.from)
        } else {
            None
        }
    }
}

// ── Graph Result ──────────────────────────────────────────────────

/// A drawn edge between two nodes of a graph result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct GraphLink {
    pub source: EntityId,
    pub target: EntityId,
}

impl GraphLink {
    pub fn new(source: &EntityProjection, target: &EntityProjection) -> Self {
        Self {
            source: source.id.clone(),
            target: target.id.clone(),
        }
    }
}

/// Graph returned to callers, either the full two-hop graph or an expand delta.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GraphResult {
    pub nodes: Vec<EntityProjection>,
    #[serde(rename = "links")]
    pub edges: Vec<GraphLink>,
    pub root_node_id: EntityId,
    pub root_node_hash: String,
    pub root_node_type: EntityKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GraphResult {
    /// An empty graph around `root`, with no nodes at all.
    pub fn empty(root: &EntityProjection) -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            root_node_id: root.id.clone(),
            root_node_hash: root.hash.clone(),
            root_node_type: root.kind,
            error: None,
        }
    }

    /// A graph holding only the root node.
    pub fn single(root: &EntityProjection) -> Self {
        Self {
            nodes: vec![root.clone()],
            ..Self::empty(root)
        }
    }

    /// The soft-failure shape: no nodes, no edges, an error marker.
    pub fn degraded(root: &EntityProjection, message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::empty(root)
        }
    }

    /// Degraded result for a root whose projection could not be loaded.
    /// The hash is unknown and left empty.
    pub fn unresolved(root: &EntityRef, message: impl Into<String>) -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            root_node_id: root.id.clone(),
            root_node_hash: String::new(),
            root_node_type: root.kind,
            error: Some(message.into()),
        }
    }

    pub fn contains_node(&self, id: &EntityId) -> bool {
        self.nodes.iter().any(|n| &n.id == id)
    }
}
