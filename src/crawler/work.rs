//! Outstanding-work counter for termination detection
//!
//! Every unresolved fetch or parse task owns a [`WorkPermit`]. The counter is
//! the number of live permits; the crawl is done the first time it drops to
//! zero.
//!
//! Permits can only be created in two ways: the single root permit returned
//! by [`WorkTracker::new`], and [`WorkPermit::child`], which needs a live
//! permit to call. A child is therefore always counted before its parent can
//! be dropped, and once the count reaches zero no permit exists from which a
//! new one could be minted.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Debug)]
struct Inner {
    outstanding: AtomicUsize,
    done: Notify,
}

/// Observer side of the counter, held by the orchestrator
#[derive(Debug, Clone)]
pub struct WorkTracker {
    inner: Arc<Inner>,
}

/// One unit of outstanding work; dropping it resolves the unit
#[derive(Debug)]
pub struct WorkPermit {
    inner: Arc<Inner>,
}

impl WorkTracker {
    /// Creates a tracker and its root permit (counter = 1)
    pub fn new() -> (Self, WorkPermit) {
        let inner = Arc::new(Inner {
            outstanding: AtomicUsize::new(1),
            done: Notify::new(),
        });

        (
            Self {
                inner: inner.clone(),
            },
            WorkPermit { inner },
        )
    }

    /// Current number of unresolved units
    pub fn outstanding(&self) -> usize {
        self.inner.outstanding.load(Ordering::SeqCst)
    }

    /// Returns true once every permit has been dropped
    pub fn is_done(&self) -> bool {
        self.outstanding() == 0
    }

    /// Waits until the counter reaches zero
    ///
    /// Cancel-safe: dropping the future and calling again loses nothing.
    pub async fn finished(&self) {
        loop {
            let notified = self.inner.done.notified();
            if self.is_done() {
                return;
            }
            notified.await;
        }
    }
}

impl WorkPermit {
    /// Registers a new unit of work derived from this one
    ///
    /// The increment happens here, synchronously, before the caller can hand
    /// the child to another task.
    pub fn child(&self) -> WorkPermit {
        self.inner.outstanding.fetch_add(1, Ordering::SeqCst);
        WorkPermit {
            inner: self.inner.clone(),
        }
    }
}

impl Drop for WorkPermit {
    fn drop(&mut self) {
        if self.inner.outstanding.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.inner.done.notify_one();
        }
    }
}
