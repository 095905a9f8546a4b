use thiserror::Error;

/// Failure of an edge or entity store call.
///
/// Store implementations collapse their backend-specific errors into this type
/// at the trait boundary so the traversal code never depends on a driver.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store call {operation} exceeded {timeout_ms}ms deadline")]
    Timeout { operation: String, timeout_ms: u64 },
}

/// Failure of the cache backend. Never fatal to a graph request.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache unavailable: {0}")]
    Unavailable(String),
}
