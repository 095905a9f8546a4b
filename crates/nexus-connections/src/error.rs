//! Error types for the nexus-connections crate.

use thiserror::Error;

use nexus_core::{EntityId, EntityKind, StoreError};

#[derive(Error, Debug)]
pub enum ConnectionsError {
    /// An edge or entity store call failed or timed out.
    #[error("Graph unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    #[error("Root not found: {kind} with id {id}")]
    RootNotFound { kind: EntityKind, id: EntityId },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ConnectionsError>;
