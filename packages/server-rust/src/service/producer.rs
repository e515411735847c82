//! Scheduled producers feeding the topology.
//!
//! - [`SequentialProducer`] emits `0, 1, 2, ...` into its target channel.
//! - [`GatewayProducer`] emits negative random values through a
//!   [`NumberGateway`], without knowing about the registry.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use oddeven_core::{ChannelRegistry, NumberGateway, Payload};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::config::ConfigError;
use super::observer::{Stage, StageEvent, StageObserver, StageOutput};
use super::worker::PeriodicTask;

// ---------------------------------------------------------------------------
// SequentialProducer
// ---------------------------------------------------------------------------

/// Emits a strictly increasing sequence starting at 0, one value per tick.
///
/// The counter is the producer's only mutable state and only this producer
/// touches it; `fetch_add` makes overlapping ticks take distinct values.
pub struct SequentialProducer {
    counter: AtomicI64,
    target: String,
    period: Duration,
    bus: Arc<dyn ChannelRegistry>,
    observer: Arc<dyn StageObserver>,
}

impl SequentialProducer {
    #[must_use]
    pub fn new(
        bus: Arc<dyn ChannelRegistry>,
        target: impl Into<String>,
        period: Duration,
        observer: Arc<dyn StageObserver>,
    ) -> Self {
        Self {
            counter: AtomicI64::new(0),
            target: target.into(),
            period,
            bus,
            observer,
        }
    }

    /// Atomically takes the next value of the sequence.
    pub fn next_value(&self) -> i64 {
        self.counter.fetch_add(1, Ordering::SeqCst)
    }

    /// The value the next tick will emit.
    #[must_use]
    pub fn current(&self) -> i64 {
        self.counter.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }
}

impl PeriodicTask for SequentialProducer {
    fn name(&self) -> &'static str {
        "sequential-producer"
    }

    fn period(&self) -> Duration {
        self.period
    }

    fn tick(&self) {
        let value = self.next_value();
        self.observer.on_stage(&StageEvent::new(
            Stage::Source,
            &self.target,
            Payload::Int(value),
            StageOutput::Emitted,
        ));
        let _ = self.bus.publish(&self.target, Payload::Int(value));
    }
}

// ---------------------------------------------------------------------------
// GatewayProducer
// ---------------------------------------------------------------------------

/// Emits `-random(0..bound)` through a gateway on each tick.
///
/// Values fall in `[-(bound - 1), 0]`; with the default bound of 100 that is
/// `[-99, 0]`.
pub struct GatewayProducer<R = StdRng> {
    gateway: Arc<dyn NumberGateway>,
    bound: i64,
    period: Duration,
    rng: Mutex<R>,
}

impl GatewayProducer<StdRng> {
    /// Creates a producer seeded from the operating system.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidGatewayBound` if `bound` is not positive.
    pub fn new(
        gateway: Arc<dyn NumberGateway>,
        bound: i64,
        period: Duration,
    ) -> Result<Self, ConfigError> {
        Self::with_rng(gateway, bound, period, StdRng::from_os_rng())
    }
}

impl<R: Rng + Send + 'static> GatewayProducer<R> {
    /// Creates a producer drawing from the given generator.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidGatewayBound` if `bound` is not positive.
    pub fn with_rng(
        gateway: Arc<dyn NumberGateway>,
        bound: i64,
        period: Duration,
        rng: R,
    ) -> Result<Self, ConfigError> {
        if bound <= 0 {
            return Err(ConfigError::InvalidGatewayBound(bound));
        }
        Ok(Self {
            gateway,
            bound,
            period,
            rng: Mutex::new(rng),
        })
    }

    /// Draws the next value without sending it.
    pub fn next_value(&self) -> i64 {
        -self.rng.lock().random_range(0..self.bound)
    }
}

impl<R: Rng + Send + 'static> PeriodicTask for GatewayProducer<R> {
    fn name(&self) -> &'static str {
        "gateway-producer"
    }

    fn period(&self) -> Duration {
        self.period
    }

    fn tick(&self) {
        let value = self.next_value();
        tracing::debug!(value, "gateway producer tick");
        self.gateway.send_number(value);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
