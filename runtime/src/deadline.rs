//! Timeouts for calls into dependent services.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// A dependency did not answer within its deadline.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("{dependency} did not respond within {timeout:?}")]
pub struct DeadlineExceeded {
    /// Name of the dependency that timed out.
    pub dependency: &'static str,
    /// The deadline that elapsed.
    pub timeout: Duration,
}

/// Await `future`, giving up after `timeout`.
///
/// # Errors
///
/// Returns [`DeadlineExceeded`] if the timeout elapses first. The inner future
/// is dropped at that point.
pub async fn with_deadline<F>(
    dependency: &'static str,
    timeout: Duration,
    future: F,
) -> Result<F::Output, DeadlineExceeded>
where
    F: Future,
{
    tokio::time::timeout(timeout, future).await.map_err(|_| {
        tracing::warn!(dependency, timeout_ms = timeout.as_millis(), "Dependency call timed out");
        DeadlineExceeded {
            dependency,
            timeout,
        }
    })
}
