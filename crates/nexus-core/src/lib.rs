//! nexus-core: Shared types, store seams, configuration, and error handling
//! for the Nexus connections graph.
//!
//! This crate provides the foundational pieces used across all Nexus components:
//! - Entity kinds, references and projections (the graph's nodes)
//! - Edge records and the assembled graph result
//! - Async traits for the edge store, entity store and cache backend
//! - Graph change events used to drive cache invalidation
//! - Layered configuration loading
//! - Common error types

pub mod config;
pub mod error;
pub mod events;
pub mod store;
pub mod types;

pub use error::{CacheError, StoreError};
pub use events::GraphEvent;
pub use store::{CacheBackend, EdgeStore, EntityStore};
pub use types::{
    EdgeRecord, EntityId, EntityKind, EntityProjection, EntityRef, GraphLink, GraphResult,
};
