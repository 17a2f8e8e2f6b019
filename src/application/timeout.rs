//! Timeout guard for client operations.
//!
//! Every public operation races against its deadline and the caller's
//! cancellation token. Deadline expiry becomes [`ClientError::Timeout`];
//! caller cancellation stays [`ClientError::Cancelled`].

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::correlator::Correlator;
use crate::domain::messages::Correlated;
use crate::shared::error::ClientError;

/// Run `operation` bounded by `deadline` and `cancel`.
///
/// The operation future is dropped as soon as either fires.
pub async fn execute_with_timeout<T, F>(
    deadline: Duration,
    cancel: &CancellationToken,
    operation: F,
) -> Result<T, ClientError>
where
    F: Future<Output = Result<T, ClientError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ClientError::Cancelled),
        result = tokio::time::timeout(deadline, operation) => match result {
            Ok(result) => result,
            Err(_) => Err(ClientError::Timeout),
        },
    }
}

/// Wait for the response correlated with `id` and map it with `on_success`.
///
/// Must run inside [`execute_with_timeout`], which supplies the timeout path.
pub async fn wait_for_correlated<T, R>(
    table: &Correlator<T>,
    id: &str,
    on_success: impl FnOnce(T) -> R,
) -> R
where
    T: Correlated,
{
    on_success(table.wait_for(id).await)
}

/// Sleep for `delay` unless `cancel` fires first. Returns `false` when cancelled.
pub async fn sleep_unless_cancelled(delay: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}
