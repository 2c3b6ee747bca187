use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use serde::Serialize;
use tokio::sync::{Semaphore, SemaphorePermit};

/// Binary lock standing for "the execution unit is free".
///
/// Backed by a one-permit tokio [`Semaphore`], which hands the permit to
/// waiters in FIFO order. Acquiring has no timeout. Releasing is tied to
/// dropping the [`GatePermit`], so every path out of a turn frees the gate.
#[derive(Debug)]
pub struct AdmissionGate {
    permits: Semaphore,
    held: AtomicBool,
    acquires: AtomicU64,
    releases: AtomicU64,
    overlaps: AtomicU64,
    waiting: AtomicUsize,
}

/// Point-in-time counters for a gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GateStats {
    pub acquires: u64,
    pub releases: u64,
    /// Times the gate was granted while already marked held. Always 0 unless
    /// mutual exclusion is broken.
    pub overlaps: u64,
}

impl Default for AdmissionGate {
    fn default() -> Self {
        Self::new()
    }
}

impl AdmissionGate {
    /// Create a gate in the available state.
    pub fn new() -> Self {
        Self {
            permits: Semaphore::new(1),
            held: AtomicBool::new(false),
            acquires: AtomicU64::new(0),
            releases: AtomicU64::new(0),
            overlaps: AtomicU64::new(0),
            waiting: AtomicUsize::new(0),
        }
    }

    /// Wait until the gate is free and take it.
    ///
    /// Cancel-safe: dropping the future while it waits leaves the gate and its
    /// counters untouched.
    pub async fn acquire(&self) -> GatePermit<'_> {
        let waiter = Waiter::enter(&self.waiting);
        // The semaphore is owned here and never closed, so acquire cannot fail
        let permit = self
            .permits
            .acquire()
            .await
            .expect("admission gate semaphore is never closed");
        drop(waiter);

        if self.held.swap(true, Ordering::SeqCst) {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
            tracing::error!("Admission gate granted while already held");
        }
        self.acquires.fetch_add(1, Ordering::SeqCst);

        GatePermit {
            gate: self,
            _permit: permit,
        }
    }

    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::SeqCst)
    }

    /// Number of tasks currently blocked in [`acquire`](Self::acquire).
    pub fn waiting(&self) -> usize {
        self.waiting.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> GateStats {
        GateStats {
            acquires: self.acquires.load(Ordering::SeqCst),
            releases: self.releases.load(Ordering::SeqCst),
            overlaps: self.overlaps.load(Ordering::SeqCst),
        }
    }
}

/// One task blocked in [`AdmissionGate::acquire`].
struct Waiter<'a>(&'a AtomicUsize);

impl<'a> Waiter<'a> {
    fn enter(waiting: &'a AtomicUsize) -> Self {
        waiting.fetch_add(1, Ordering::SeqCst);
        Self(waiting)
    }
}

impl Drop for Waiter<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Proof of holding the gate. Dropping it releases the gate.
#[derive(Debug)]
#[must_use = "dropping the permit releases the gate immediately"]
pub struct GatePermit<'a> {
    gate: &'a AdmissionGate,
    _permit: SemaphorePermit<'a>,
}

impl GatePermit<'_> {
    /// Hand the gate to the next waiter.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for GatePermit<'_> {
    fn drop(&mut self) {
        // Bookkeeping runs before the semaphore permit field is dropped, so
        // the next holder never sees the gate still marked held.
        self.gate.held.store(false, Ordering::SeqCst);
        self.gate.releases.fetch_add(1, Ordering::SeqCst);
    }
}
