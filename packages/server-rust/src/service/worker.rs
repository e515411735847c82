//! Periodic workers: fixed-rate ticking of producer callbacks.
//!
//! A `PeriodicWorker` drives one `PeriodicTask` from a tokio interval. Each
//! tick runs on the blocking pool, so a slow delivery chain never delays the
//! next tick of the same producer; ticks may overlap.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::shutdown::ShutdownController;

// ---------------------------------------------------------------------------
// PeriodicTask trait
// ---------------------------------------------------------------------------

/// A callback invoked on a fixed period.
///
/// `tick` takes `&self` and may run concurrently with itself; implementors
/// keep any mutable state behind atomics or locks.
pub trait PeriodicTask: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    fn period(&self) -> Duration;

    fn tick(&self);
}

fn millis(period: Duration) -> u64 {
    u64::try_from(period.as_millis()).unwrap_or(u64::MAX)
}

// ---------------------------------------------------------------------------
// PeriodicWorker
// ---------------------------------------------------------------------------

/// Handle to a running periodic task.
///
/// The worker stops when the shutdown controller fires, when `stop()` is
/// called, or when the handle is dropped.
pub struct PeriodicWorker {
    name: &'static str,
    ticks: Arc<AtomicU64>,
    stop_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl PeriodicWorker {
    /// Start ticking `task` at its period. The first tick fires immediately.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(task: Arc<dyn PeriodicTask>, shutdown: Arc<ShutdownController>) -> Self {
        let name = task.name();
        let period = task.period();
        let ticks = Arc::new(AtomicU64::new(0));
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let mut shutdown_rx = shutdown.shutdown_receiver();
        let tick_count = Arc::clone(&ticks);

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // Fixed rate: catch up on missed ticks instead of drifting.
            interval.set_missed_tick_behavior(MissedTickBehavior::Burst);
            tracing::debug!(task = name, period_ms = millis(period), "periodic worker started");

            loop {
                tokio::select! {
                    biased;
                    _ = &mut stop_rx => break,
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                    _ = interval.tick() => {
                        if shutdown.is_shutting_down() {
                            break;
                        }
                        let guard = shutdown.tick_guard();
                        tick_count.fetch_add(1, Ordering::Relaxed);
                        let task = Arc::clone(&task);
                        tokio::task::spawn_blocking(move || {
                            let _guard = guard;
                            task.tick();
                        });
                    }
                }
            }

            tracing::debug!(task = name, "periodic worker stopped");
        });

        Self {
            name,
            ticks,
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Number of ticks dispatched so far.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Stop ticking and wait for the worker loop to exit.
    ///
    /// Ticks already dispatched keep running; use
    /// `ShutdownController::wait_for_drain` to wait for them.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Owns the periodic workers of a running topology.
pub struct Scheduler {
    shutdown: Arc<ShutdownController>,
    workers: Vec<PeriodicWorker>,
}

impl Scheduler {
    #[must_use]
    pub fn new(shutdown: Arc<ShutdownController>) -> Self {
        Self {
            shutdown,
            workers: Vec::new(),
        }
    }

    /// Start a worker for `task`.
    pub fn schedule(&mut self, task: Arc<dyn PeriodicTask>) {
        tracing::info!(
            task = task.name(),
            period_ms = millis(task.period()),
            "scheduling periodic task"
        );
        self.workers
            .push(PeriodicWorker::start(task, Arc::clone(&self.shutdown)));
    }

    /// Ticks dispatched per task, in scheduling order.
    #[must_use]
    pub fn ticks(&self) -> Vec<(&'static str, u64)> {
        self.workers.iter().map(|w| (w.name(), w.ticks())).collect()
    }

    /// Stop every worker. In-flight ticks are not awaited.
    pub async fn stop_all(&mut self) {
        for worker in &mut self.workers {
            worker.stop().await;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
