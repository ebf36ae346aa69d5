//! Concurrency limiter for outbound fetches
//!
//! A counting semaphore that caps how many fetch attempts are on the wire at
//! once. Slots are held only around a single request and its body read, never
//! across backoff sleeps or parsing.

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Maximum number of simultaneous outbound fetches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConcurrencyLimit {
    /// At most this many fetches in flight
    Bounded(usize),
    /// No cap; the limiter is a pass-through
    Unbounded,
}

impl ConcurrencyLimit {
    pub fn bounded(max: usize) -> Self {
        Self::Bounded(max)
    }
}

/// A held fetch slot; dropping it releases the slot
#[derive(Debug)]
pub struct FetchSlot {
    _permit: Option<OwnedSemaphorePermit>,
}

/// Counting semaphore bounding in-flight fetches
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    semaphore: Option<Arc<Semaphore>>,
    capacity: Option<usize>,
}

impl ConcurrencyLimiter {
    /// Creates a limiter for the given limit
    ///
    /// A bounded limit of zero is treated as one, since it could never be
    /// acquired.
    pub fn new(limit: ConcurrencyLimit) -> Self {
        match limit {
            ConcurrencyLimit::Bounded(max) => {
                let max = max.max(1);
                Self {
                    semaphore: Some(Arc::new(Semaphore::new(max))),
                    capacity: Some(max),
                }
            }
            ConcurrencyLimit::Unbounded => Self {
                semaphore: None,
                capacity: None,
            },
        }
    }

    /// Waits until a slot is free and takes it
    ///
    /// Waiters are not served in any guaranteed order.
    pub async fn acquire(&self) -> FetchSlot {
        let permit = match &self.semaphore {
            // Only fails on a closed semaphore; this one is never closed.
            Some(semaphore) => semaphore.clone().acquire_owned().await.ok(),
            None => None,
        };

        FetchSlot { _permit: permit }
    }

    /// Number of slots currently held (always 0 when unbounded)
    pub fn in_flight(&self) -> usize {
        match (&self.semaphore, self.capacity) {
            (Some(semaphore), Some(capacity)) => capacity - semaphore.available_permits(),
            _ => 0,
        }
    }

    /// Configured capacity, or `None` when unbounded
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }
}
