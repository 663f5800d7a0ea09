//! Deadline wrapper for fallible remote calls
//!
//! The wrapped future is dropped when the deadline wins the race. For
//! reqwest-backed calls that aborts the in-flight request, so a timed-out
//! call never keeps running in the background.

use crate::error::{CommsightError, Result};
use std::future::Future;
use std::time::Duration;

/// Await `future`, failing with [`CommsightError::Timeout`] after `after`
pub async fn with_deadline<T, F>(operation: &str, after: Duration, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(after, future).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!("{} exceeded deadline of {:?}", operation, after);
            Err(CommsightError::Timeout {
                operation: operation.to_string(),
                after,
            })
        }
    }
}
