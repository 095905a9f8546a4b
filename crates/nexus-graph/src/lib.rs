//! nexus-graph: Neo4j-backed stores for the connections graph.
//!
//! Entities are Neo4j nodes labelled by kind and keyed by `id`; connections are
//! `CONNECTED_TO` relationships from the previous entity to the next. This crate
//! implements the `EdgeStore` and `EntityStore` seams on top of one pooled client
//! and provides the write helpers the owning domain uses to record connections.

pub mod client;
pub mod kinds;
pub mod mutations;
pub mod queries;
mod store;

pub use client::{GraphClient, GraphConfig, GraphError};
