//! Named concurrency buckets for outbound LLM calls

use crate::error::{CommsightError, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Bounds concurrent calls per bucket name
pub struct RateLimiter {
    limits: HashMap<String, usize>,
    default_limit: usize,
    buckets: Mutex<HashMap<String, Arc<Semaphore>>>,
}

impl RateLimiter {
    pub fn new(limits: HashMap<String, usize>, default_limit: usize) -> Self {
        Self {
            limits,
            default_limit: default_limit.max(1),
            buckets: Mutex::new(HashMap::new()),
        }
    }

    fn bucket(&self, key: &str) -> Result<Arc<Semaphore>> {
        let mut buckets = self
            .buckets
            .lock()
            .map_err(|_| CommsightError::RateLimited(key.to_string()))?;

        let semaphore = buckets.entry(key.to_string()).or_insert_with(|| {
            let permits = self.limits.get(key).copied().unwrap_or(self.default_limit);
            Arc::new(Semaphore::new(permits.max(1)))
        });

        Ok(Arc::clone(semaphore))
    }

    /// Wait for a slot in `key`; the slot frees when the permit drops
    pub async fn acquire(&self, key: &str) -> Result<OwnedSemaphorePermit> {
        let semaphore = self.bucket(key)?;
        semaphore
            .acquire_owned()
            .await
            .map_err(|_| CommsightError::RateLimited(key.to_string()))
    }

    /// Free slots in `key` right now
    pub fn available(&self, key: &str) -> usize {
        self.bucket(key).map(|s| s.available_permits()).unwrap_or(0)
    }
}
