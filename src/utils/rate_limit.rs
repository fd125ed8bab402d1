use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Caps how many requests are in flight at once.
#[derive(Debug)]
pub struct RateLimiter {
    semaphore: Arc<Semaphore>,
}

impl RateLimiter {
    pub fn new(max_concurrent: usize) -> Self {
        RateLimiter {
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// Waits for a slot. `None` only if the limiter was closed.
    pub async fn acquire(&self) -> Option<OwnedSemaphorePermit> {
        Arc::clone(&self.semaphore).acquire_owned().await.ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_permits_are_returned_on_drop() {
        let limiter = RateLimiter::new(2);
        let first = limiter.acquire().await;
        let _second = limiter.acquire().await;
        assert!(first.is_some());

        let blocked = tokio::time::timeout(Duration::from_millis(10), limiter.acquire()).await;
        assert!(blocked.is_err());

        drop(first);
        let third = tokio::time::timeout(Duration::from_millis(10), limiter.acquire()).await;
        assert!(matches!(third, Ok(Some(_))));
    }
}
