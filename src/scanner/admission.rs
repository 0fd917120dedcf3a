//! Admission control for concurrent probes.
//!
//! A fixed pool of tokens; holding one authorises one in-flight probe.

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

/// A counting pool of admission tokens.
///
/// Clones share the same tokens.
#[derive(Debug, Clone)]
pub struct AdmissionPool {
    permits: Arc<Semaphore>,
    capacity: usize,
}

/// One admission slot. Released when dropped.
#[derive(Debug)]
pub struct AdmissionToken {
    _permit: OwnedSemaphorePermit,
}

impl AdmissionToken {
    /// Return the slot to its pool.
    pub fn release(self) {}
}

impl AdmissionPool {
    /// Create a pool with `capacity` tokens (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Wait for a free token.
    ///
    /// Returns `None` once `cancel` fires, even if a token is free.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Option<AdmissionToken> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            permit = Arc::clone(&self.permits).acquire_owned() => {
                permit.ok().map(|permit| AdmissionToken { _permit: permit })
            }
        }
    }

    /// Total number of tokens.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Tokens not currently held.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}
