//! Configuration for the connections graph service.

use std::collections::BTreeSet;
use std::time::Duration;

use serde::Deserialize;

use nexus_core::EntityKind;

use crate::error::{ConnectionsError, Result};

/// Top-level connections configuration.
///
/// Loaded from the `nexus.toml` `[connections]` section or
/// `NEXUS__CONNECTIONS__*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionsConfig {
    /// Lifetime of a cached full graph, in seconds (default: 600).
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Maximum number of entries in the in-process cache (default: 10000).
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// Deadline for every single edge or entity store call.
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,

    /// Maximum hop-2 branches resolved at the same time.
    #[serde(default = "default_hop2_concurrency")]
    pub hop2_concurrency: usize,

    /// Kinds that are resolved and drawn as neighbors.
    #[serde(default = "default_neighbor_kinds")]
    pub neighbor_kinds: Vec<EntityKind>,

    /// Prefix for full-graph cache keys.
    #[serde(default = "default_cache_key_prefix")]
    pub cache_key_prefix: String,
}

impl ConnectionsConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn neighbor_kind_set(&self) -> BTreeSet<EntityKind> {
        self.neighbor_kinds.iter().copied().collect()
    }

    /// Reject values that would make every request fail or hang.
    pub fn validate(&self) -> Result<()> {
        if self.cache_capacity == 0 {
            return Err(ConnectionsError::Config(
                "cache_capacity must be greater than zero".to_string(),
            ));
        }
        if self.store_timeout_ms == 0 {
            return Err(ConnectionsError::Config(
                "store_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.hop2_concurrency == 0 {
            return Err(ConnectionsError::Config(
                "hop2_concurrency must be greater than zero".to_string(),
            ));
        }
        if self.neighbor_kinds.is_empty() {
            return Err(ConnectionsError::Config(
                "neighbor_kinds must name at least one kind".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_cache_ttl_secs() -> u64 {
    600
}

fn default_cache_capacity() -> usize {
    crate::backend::DEFAULT_CAPACITY
}

fn default_store_timeout_ms() -> u64 {
    5_000
}

fn default_hop2_concurrency() -> usize {
    8
}

fn default_neighbor_kinds() -> Vec<EntityKind> {
    vec![
        EntityKind::Person,
        EntityKind::Group,
        EntityKind::Organization,
        EntityKind::Community,
    ]
}

fn default_cache_key_prefix() -> String {
    "connections:initial".to_string()
}

impl Default for ConnectionsConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl_secs(),
            cache_capacity: default_cache_capacity(),
            store_timeout_ms: default_store_timeout_ms(),
            hop2_concurrency: default_hop2_concurrency(),
            neighbor_kinds: default_neighbor_kinds(),
            cache_key_prefix: default_cache_key_prefix(),
        }
    }
}
