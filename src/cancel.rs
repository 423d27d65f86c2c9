//! Cancellation of in-flight remote calls.

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::error::ProviderError;

/// Run `fut` unless `token` is cancelled first.
///
/// An already cancelled token wins without polling `fut`, so no remote call
/// is started.
pub async fn cancellable<T, F>(
    token: &CancellationToken,
    operation: &str,
    fut: F,
) -> Result<T, ProviderError>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(ProviderError::Cancelled(operation.to_string())),
        result = fut => result,
    }
}
