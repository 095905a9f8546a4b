//! Request-scoped deadlines for store calls.

use std::future::Future;
use std::time::Duration;

use nexus_core::StoreError;

/// Run a store call, turning an elapsed deadline into `StoreError::Timeout`.
pub(crate) async fn with_deadline<T, F>(
    operation: &'static str,
    timeout: Duration,
    call: F,
) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(operation, timeout_ms = timeout.as_millis() as u64, "Store call timed out");
            Err(StoreError::Timeout {
                operation: operation.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            })
        }
    }
}
