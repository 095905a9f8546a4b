//! Request and response types for the JSON-lines worker protocol.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use nexus_core::{EntityId, EntityKind, EntityRef, GraphEvent};

/// One request line read by the worker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ConnectionsRequest {
    /// Full two-hop graph, served from cache when possible.
    Graph { kind: EntityKind, id: EntityId },
    /// One-hop delta around the root, skipping ids already shown.
    Expand {
        kind: EntityKind,
        id: EntityId,
        #[serde(default)]
        exclude: HashSet<EntityId>,
    },
    /// Drop the root's cached graph.
    Invalidate { kind: EntityKind, id: EntityId },
    /// A mutation-path event; drops the cached graphs it touches.
    Event { event: GraphEvent },
}

impl ConnectionsRequest {
    pub fn op(&self) -> &'static str {
        match self {
            Self::Graph { .. } => "graph",
            Self::Expand { .. } => "expand",
            Self::Invalidate { .. } => "invalidate",
            Self::Event { .. } => "event",
        }
    }

    /// The root the request is about, if it names one.
    pub fn root(&self) -> Option<EntityRef> {
        match self {
            Self::Graph { kind, id }
            | Self::Expand { kind, id, .. }
            | Self::Invalidate { kind, id } => Some(EntityRef::new(*kind, id.clone())),
            Self::Event { .. } => None,
        }
    }
}

/// Response line for requests that return no graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Ack {
    pub ok: bool,
}

impl Ack {
    pub fn ok() -> Self {
        Self { ok: true }
    }
}

/// Response line for a failed request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorLine {
    pub error: String,
}

impl ErrorLine {
    pub fn new(error: impl ToString) -> Self {
        Self {
            error: error.to_string(),
        }
    }
}
