use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::{DashMap, DashSet};
use oddeven_core::{ChannelRegistry, Message, Payload, PublishOutcome, Subscriber, SubscriptionId};

// ---------------------------------------------------------------------------
// RegistryStats
// ---------------------------------------------------------------------------

/// Cumulative delivery counters of an `InMemoryChannelRegistry`.
#[derive(Debug, Default)]
pub struct RegistryStats {
    published: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

/// Point-in-time copy of `RegistryStats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Total `publish` calls.
    pub published: u64,
    /// Successful subscriber invocations.
    pub delivered: u64,
    /// Subscriber invocations that returned an error.
    pub failed: u64,
    /// Publishes to channels without subscribers.
    pub dropped: u64,
}

impl RegistryStats {
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            published: self.published.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

// ---------------------------------------------------------------------------
// InMemoryChannelRegistry
// ---------------------------------------------------------------------------

#[derive(Clone)]
struct Binding {
    id: SubscriptionId,
    subscriber: Arc<dyn Subscriber>,
}

/// In-process publish/subscribe registry.
///
/// Each channel maps to a copy-on-write list of bindings. `publish` clones the
/// list's `Arc` and releases the map shard before invoking subscribers, so a
/// subscriber may publish onward (even to the same channel) without holding
/// any registry lock. Subscriber errors are logged and counted, never returned
/// to the publisher.
pub struct InMemoryChannelRegistry {
    channels: DashMap<Arc<str>, Arc<Vec<Binding>>>,
    next_id: AtomicU64,
    stats: RegistryStats,
    /// Channels already reported as having no subscribers.
    warned_empty: DashSet<Arc<str>>,
}

impl InMemoryChannelRegistry {
    /// Creates an empty registry.
    ///
    /// Subscription IDs start at 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
            next_id: AtomicU64::new(1),
            stats: RegistryStats::default(),
            warned_empty: DashSet::new(),
        }
    }

    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Names of all channels with at least one subscriber, sorted.
    #[must_use]
    pub fn channel_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .channels
            .iter()
            .map(|entry| entry.key().to_string())
            .collect();
        names.sort();
        names
    }

    /// Names of the subscribers bound to `channel`, in registration order.
    #[must_use]
    pub fn subscriber_names(&self, channel: &str) -> Vec<&'static str> {
        self.bindings(channel)
            .map(|bindings| bindings.iter().map(|b| b.subscriber.name()).collect())
            .unwrap_or_default()
    }

    fn bindings(&self, channel: &str) -> Option<Arc<Vec<Binding>>> {
        self.channels.get(channel).map(|entry| Arc::clone(entry.value()))
    }

    fn record_dropped(&self, channel: &str, payload: &Payload) {
        self.stats.dropped.fetch_add(1, Ordering::Relaxed);
        if self.warned_empty.insert(Arc::from(channel)) {
            tracing::warn!(
                channel,
                payload = %payload,
                "channel has no subscribers; message dropped"
            );
        } else {
            tracing::debug!(channel, payload = %payload, "message dropped");
        }
    }
}

impl Default for InMemoryChannelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelRegistry for InMemoryChannelRegistry {
    fn publish(&self, channel: &str, payload: Payload) -> PublishOutcome {
        self.stats.published.fetch_add(1, Ordering::Relaxed);

        let bindings = match self.bindings(channel) {
            Some(bindings) if !bindings.is_empty() => bindings,
            _ => {
                self.record_dropped(channel, &payload);
                return PublishOutcome::default();
            }
        };

        let msg = Message::new(channel, payload);
        let mut outcome = PublishOutcome::default();

        for binding in bindings.iter() {
            match binding.subscriber.on_message(&msg, self) {
                Ok(()) => outcome.delivered += 1,
                Err(err) => {
                    outcome.failed += 1;
                    tracing::error!(
                        channel,
                        subscriber = binding.subscriber.name(),
                        subscription = binding.id.0,
                        error = %err,
                        "delivery failed"
                    );
                }
            }
        }

        self.stats
            .delivered
            .fetch_add(outcome.delivered as u64, Ordering::Relaxed);
        self.stats
            .failed
            .fetch_add(outcome.failed as u64, Ordering::Relaxed);
        outcome
    }

    fn subscribe(&self, channel: &str, subscriber: Arc<dyn Subscriber>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(
            channel,
            subscriber = subscriber.name(),
            subscription = id.0,
            "subscribed"
        );

        let mut entry = self.channels.entry(Arc::from(channel)).or_default();
        Arc::make_mut(entry.value_mut()).push(Binding { id, subscriber });
        id
    }

    fn subscriber_count(&self, channel: &str) -> usize {
        self.bindings(channel).map_or(0, |bindings| bindings.len())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
