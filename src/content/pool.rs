use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Process-wide bound on concurrent fan-out fetches
///
/// Clones share the same slots. Every chapter fetched through services built from
/// the same pool competes for those slots; the underlying semaphore hands them out
/// in request order.
#[derive(Debug, Clone)]
pub struct FetchPool {
    semaphore: Arc<Semaphore>,
    size: usize,
}

impl FetchPool {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    /// Total number of slots
    pub fn size(&self) -> usize {
        self.size
    }

    /// Slots not currently held
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Wait for a free slot; the slot is released when the permit drops
    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit, tokio::sync::AcquireError> {
        self.semaphore.clone().acquire_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pool_slots_are_shared_between_clones() {
        let pool = FetchPool::new(2);
        let other = pool.clone();

        let first = pool.acquire().await.unwrap();
        let _second = other.acquire().await.unwrap();
        assert_eq!(pool.available(), 0);

        drop(first);
        assert_eq!(other.available(), 1);
        assert_eq!(FetchPool::new(0).size(), 1);
    }
}
