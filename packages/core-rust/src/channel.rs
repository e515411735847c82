//! Channel addressing primitives shared by registries and subscribers.

/// Default channel names of the odd/even topology.
///
/// These are defaults only; every component receives the names it uses at
/// construction time.
pub mod channel_names {
    /// Channel consumed by the parity router.
    pub const INGRESS: &str = "NumberChannel";
    /// Channel receiving even numbers.
    pub const EVEN: &str = "evenChannel";
    /// Channel receiving odd numbers.
    pub const ODD: &str = "oddChannel";
}

/// Handle returned by `ChannelRegistry::subscribe`.
///
/// Bindings live for the lifetime of the registry; the handle identifies a
/// binding in logs but cannot remove it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

/// Result of one `publish` call.
///
/// A publish to a channel without subscribers yields the default
/// (zero) outcome rather than an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[must_use = "a publish outcome reports dropped and failed deliveries"]
pub struct PublishOutcome {
    /// Subscribers that processed the message successfully.
    pub delivered: usize,
    /// Subscribers that returned a `DeliveryError`.
    pub failed: usize,
}

impl PublishOutcome {
    /// Total number of subscribers the message was handed to.
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.delivered + self.failed
    }

    /// True when no subscriber was registered on the channel.
    #[must_use]
    pub fn is_dropped(&self) -> bool {
        self.attempted() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_outcome_is_dropped() {
        let outcome = PublishOutcome::default();
        assert_eq!(outcome.attempted(), 0);
        assert!(outcome.is_dropped());
    }

    #[test]
    fn failed_deliveries_count_as_attempted() {
        let outcome = PublishOutcome {
            delivered: 1,
            failed: 1,
        };
        assert_eq!(outcome.attempted(), 2);
        assert!(!outcome.is_dropped());
    }

    #[test]
    fn default_names_are_distinct() {
        assert_ne!(channel_names::INGRESS, channel_names::EVEN);
        assert_ne!(channel_names::EVEN, channel_names::ODD);
        assert_ne!(channel_names::INGRESS, channel_names::ODD);
    }
}
