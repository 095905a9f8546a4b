//! Graph change events emitted by the owning domain's mutation paths.
//!
//! The graph engine never mutates entities or edges itself. Domain code that
//! does publishes one of these so cached graphs around the touched entities
//! can be dropped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::EntityRef;

/// A change to an entity or to the edge list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event_type")]
pub enum GraphEvent {
    /// An entity's own data changed (name, image, visibility, ...).
    EntityUpdated {
        entity: EntityRef,
        #[serde(default = "Utc::now")]
        at: DateTime<Utc>,
    },
    /// A new connection was recorded between two entities.
    EdgeCreated {
        from: EntityRef,
        to: EntityRef,
        #[serde(default = "Utc::now")]
        at: DateTime<Utc>,
    },
}

impl GraphEvent {
    pub fn entity_updated(entity: EntityRef) -> Self {
        Self::EntityUpdated {
            entity,
            at: Utc::now(),
        }
    }

    pub fn edge_created(from: EntityRef, to: EntityRef) -> Self {
        Self::EdgeCreated {
            from,
            to,
            at: Utc::now(),
        }
    }

    /// Roots whose cached graph is stale after this event.
    pub fn affected_roots(&self) -> Vec<&EntityRef> {
        match self {
            Self::EntityUpdated { entity, .. } => vec![entity],
            Self::EdgeCreated { from, to, .. } if from == to => vec![from],
            Self::EdgeCreated { from, to, .. } => vec![from, to],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EntityKind;

    #[test]
    fn event_tags_by_type() {
        let event = GraphEvent::entity_updated(EntityRef::new(EntityKind::Group, "g1"));
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event_type\":\"EntityUpdated\""));
    }

    #[test]
    fn timestamp_defaults_when_missing() {
        let json = r#"{"event_type":"EdgeCreated",
            "from":{"kind":"Person","id":"p1"},
            "to":{"kind":"Group","id":"g1"}}"#;
        let event: GraphEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.affected_roots().len(), 2);
    }

    #[test]
    fn self_loop_affects_one_root() {
        let p = EntityRef::new(EntityKind::Person, "p1");
        let event = GraphEvent::edge_created(p.clone(), p);
        assert_eq!(event.affected_roots().len(), 1);
    }
}
