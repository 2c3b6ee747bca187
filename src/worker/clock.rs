use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

/// Stand-in for real computation and for the kernel's delay primitive.
///
/// A scheduling loop "executes" a turn by calling [`run_for`](Self::run_for)
/// and waits between turns with [`pause`](Self::pause). Neither call touches
/// shared state, so other tasks keep running while one is suspended.
pub trait WorkSimulator: Clone + Send + Sync + 'static {
    /// Milliseconds on this clock. Only differences are meaningful.
    fn now_ms(&self) -> u64;

    /// Simulate `ms` of work by the job holding the gate.
    fn run_for(&self, ms: u64) -> impl Future<Output = ()> + Send;

    /// Wait `ms` without holding the gate.
    fn pause(&self, ms: u64) -> impl Future<Output = ()> + Send;
}

/// Clock backed by `tokio::time`.
///
/// Real wall-clock delays in production; a deterministic virtual clock when
/// the runtime is started paused (`#[tokio::test(start_paused = true)]`).
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    origin: Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkSimulator for TokioClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    fn run_for(&self, ms: u64) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(Duration::from_millis(ms))
    }

    fn pause(&self, ms: u64) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(Duration::from_millis(ms))
    }
}

/// Clock that never sleeps.
///
/// Work advances a shared virtual counter by the simulated amount; pauses
/// only yield to the runtime. Since only the gate holder calls `run_for`, the
/// counter reads as "total work done so far" and strictly increases across
/// turns.
#[derive(Debug, Clone, Default)]
pub struct InstantClock {
    now: Arc<AtomicU64>,
}

impl InstantClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WorkSimulator for InstantClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }

    fn run_for(&self, ms: u64) -> impl Future<Output = ()> + Send {
        let now = self.now.clone();
        async move {
            now.fetch_add(ms, Ordering::SeqCst);
            tokio::task::yield_now().await;
        }
    }

    fn pause(&self, _ms: u64) -> impl Future<Output = ()> + Send {
        tokio::task::yield_now()
    }
}
