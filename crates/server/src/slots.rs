//! Transcription slot pool
//!
//! Bounds how many jobs may occupy the backend at once. A slot is held
//! through an RAII guard, so it is returned on every exit path: normal
//! completion, backend failure, or a deadline firing while the job future
//! is dropped mid-transcription.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use hark_common::{HarkError, Result};

/// Fixed-capacity pool of transcription slots.
#[derive(Clone)]
pub struct SlotPool {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl SlotPool {
    /// Create a pool with at least one slot.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Total number of slots.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots not currently held.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Wait for a free slot.
    ///
    /// Waiters are served in arrival order. Callers that must not wait
    /// forever wrap this in their own deadline.
    pub async fn acquire(&self) -> Result<SlotGuard> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| HarkError::internal("slot pool closed"))?;
        Ok(SlotGuard { _permit: permit })
    }
}

/// Holds one slot until dropped.
pub struct SlotGuard {
    _permit: OwnedSemaphorePermit,
}
