//! Stop signal and tick accounting for the scheduled producers.
//!
//! The flag is a `watch` channel so worker loops can `select!` on it. Ticks
//! already handed to the blocking pool keep running after the flag flips;
//! each holds a [`TickGuard`] so the caller can wait for them to finish.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use tokio::sync::{watch, Notify};

/// Where the flow is in its life.
///
/// `Starting` -> `Running` -> `Draining` -> `Stopped`. `Stopped` is only
/// reached once no tick is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Starting,
    Running,
    Draining,
    Stopped,
}

#[derive(Debug, Default)]
struct InFlight {
    count: AtomicU64,
    idle: Notify,
}

/// Shared between the binary, the scheduler and every worker loop.
#[derive(Debug)]
pub struct ShutdownController {
    stop: watch::Sender<bool>,
    in_flight: Arc<InFlight>,
    state: ArcSwap<LifecycleState>,
}

impl ShutdownController {
    #[must_use]
    pub fn new() -> Self {
        Self {
            stop: watch::Sender::new(false),
            in_flight: Arc::new(InFlight::default()),
            state: ArcSwap::from_pointee(LifecycleState::Starting),
        }
    }

    pub fn set_running(&self) {
        self.state.store(Arc::new(LifecycleState::Running));
    }

    /// A receiver whose value becomes `true` on `trigger_shutdown`.
    #[must_use]
    pub fn shutdown_receiver(&self) -> watch::Receiver<bool> {
        self.stop.subscribe()
    }

    /// Flips the stop flag and moves to `Draining`.
    ///
    /// The flag is stored whether or not any receiver exists, so workers
    /// started later still see it.
    pub fn trigger_shutdown(&self) {
        self.state.store(Arc::new(LifecycleState::Draining));
        self.stop.send_replace(true);
    }

    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        *self.stop.borrow()
    }

    #[must_use]
    pub fn state(&self) -> LifecycleState {
        **self.state.load()
    }

    /// Counts one tick as in flight until the guard drops, panics included.
    #[must_use]
    pub fn tick_guard(&self) -> TickGuard {
        self.in_flight.count.fetch_add(1, Ordering::AcqRel);
        TickGuard {
            in_flight: Arc::clone(&self.in_flight),
        }
    }

    #[must_use]
    pub fn in_flight_count(&self) -> u64 {
        self.in_flight.count.load(Ordering::Acquire)
    }

    /// Waits up to `timeout` for the in-flight count to reach zero.
    ///
    /// On success the state becomes `Stopped`. On timeout it is left as is
    /// and `false` is returned.
    pub async fn wait_for_drain(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            // Register before reading the count so a release in between
            // still wakes us.
            let idle = self.in_flight.idle.notified();
            if self.in_flight_count() == 0 {
                self.state.store(Arc::new(LifecycleState::Stopped));
                return true;
            }
            if tokio::time::timeout_at(deadline, idle).await.is_err() {
                return false;
            }
        }
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

/// Held by one running tick. See [`ShutdownController::tick_guard`].
#[derive(Debug)]
pub struct TickGuard {
    in_flight: Arc<InFlight>,
}

impl Drop for TickGuard {
    fn drop(&mut self) {
        if self.in_flight.count.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.in_flight.idle.notify_waiters();
        }
    }
}
