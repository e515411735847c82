//! Parity routing: forwards each integer to the even or odd channel.

use std::sync::Arc;

use oddeven_core::{ChannelRegistry, DeliveryError, Message, Parity, PayloadKind, Subscriber};

use super::observer::{Stage, StageEvent, StageObserver, StageOutput};

// ---------------------------------------------------------------------------
// ParityRouter
// ---------------------------------------------------------------------------

/// Subscriber on the ingress channel that republishes each integer, unchanged,
/// to the channel matching its parity.
///
/// Classification is `Parity::of`, i.e. `n % 2 == 0` with truncating
/// remainder, so zero and negative evens go to the even channel.
pub struct ParityRouter {
    even_channel: String,
    odd_channel: String,
    observer: Arc<dyn StageObserver>,
}

impl ParityRouter {
    #[must_use]
    pub fn new(
        even_channel: impl Into<String>,
        odd_channel: impl Into<String>,
        observer: Arc<dyn StageObserver>,
    ) -> Self {
        Self {
            even_channel: even_channel.into(),
            odd_channel: odd_channel.into(),
            observer,
        }
    }

    /// The channel `n` is routed to. Pure: no publish, no logging.
    #[must_use]
    pub fn route(&self, n: i64) -> &str {
        match Parity::of(n) {
            Parity::Even => &self.even_channel,
            Parity::Odd => &self.odd_channel,
        }
    }
}

impl Subscriber for ParityRouter {
    fn name(&self) -> &'static str {
        Stage::Router.as_str()
    }

    fn on_message(&self, msg: &Message, bus: &dyn ChannelRegistry) -> Result<(), DeliveryError> {
        let n = msg
            .payload()
            .as_int()
            .ok_or_else(|| DeliveryError::UnexpectedPayload {
                stage: Stage::Router.as_str(),
                expected: PayloadKind::Integer,
                found: msg.payload().kind(),
            })?;

        let target = self.route(n);
        self.observer.on_stage(&StageEvent::new(
            Stage::Router,
            msg.channel(),
            msg.payload().clone(),
            StageOutput::Routed {
                to: target.to_string(),
            },
        ));

        let _ = bus.publish(target, msg.payload().clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use oddeven_core::{channel_names, Payload};
    use parking_lot::Mutex;
    use proptest::prelude::*;

    use super::*;
    use crate::service::observer::RecordingObserver;
    use crate::service::registry::InMemoryChannelRegistry;

    struct Collector(Mutex<Vec<Payload>>);

    impl Subscriber for Collector {
        fn name(&self) -> &'static str {
            "collector"
        }

        fn on_message(&self, msg: &Message, _bus: &dyn ChannelRegistry) -> Result<(), DeliveryError> {
            self.0.lock().push(msg.payload().clone());
            Ok(())
        }
    }

    struct Fixture {
        registry: InMemoryChannelRegistry,
        recorder: Arc<RecordingObserver>,
        even: Arc<Collector>,
        odd: Arc<Collector>,
    }

    fn fixture() -> Fixture {
        let registry = InMemoryChannelRegistry::new();
        let recorder = Arc::new(RecordingObserver::new());
        let router = ParityRouter::new(channel_names::EVEN, channel_names::ODD, recorder.clone());
        let even = Arc::new(Collector(Mutex::new(Vec::new())));
        let odd = Arc::new(Collector(Mutex::new(Vec::new())));

        registry.subscribe(channel_names::INGRESS, Arc::new(router));
        registry.subscribe(channel_names::EVEN, even.clone());
        registry.subscribe(channel_names::ODD, odd.clone());

        Fixture {
            registry,
            recorder,
            even,
            odd,
        }
    }

    fn router() -> ParityRouter {
        ParityRouter::new("even", "odd", Arc::new(RecordingObserver::new()))
    }

    #[test]
    fn even_value_goes_to_even_channel_only() {
        let f = fixture();
        let _ = f.registry.publish(channel_names::INGRESS, Payload::Int(4));

        assert_eq!(*f.even.0.lock(), vec![Payload::Int(4)]);
        assert!(f.odd.0.lock().is_empty());
    }

    #[test]
    fn odd_value_goes_to_odd_channel_only() {
        let f = fixture();
        let _ = f.registry.publish(channel_names::INGRESS, Payload::Int(7));

        assert_eq!(*f.odd.0.lock(), vec![Payload::Int(7)]);
        assert!(f.even.0.lock().is_empty());
    }

    #[test]
    fn zero_is_routed_even() {
        assert_eq!(router().route(0), "even");
    }

    #[test]
    fn negative_values_use_truncating_remainder() {
        let r = router();
        assert_eq!(r.route(-7), "odd");
        assert_eq!(r.route(-3), "odd");
        assert_eq!(r.route(-4), "even");
        assert_eq!(r.route(-98), "even");
    }

    #[test]
    fn router_records_decision() {
        let f = fixture();
        let _ = f.registry.publish(channel_names::INGRESS, Payload::Int(-3));

        let events = f.recorder.for_stage(Stage::Router);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].channel, channel_names::INGRESS);
        assert_eq!(events[0].input, Payload::Int(-3));
        assert_eq!(
            events[0].output,
            StageOutput::Routed {
                to: channel_names::ODD.to_string()
            }
        );
    }

    #[test]
    fn text_payload_is_rejected() {
        let f = fixture();
        let outcome = f
            .registry
            .publish(channel_names::INGRESS, Payload::Text("Number 1".into()));

        assert_eq!(outcome.failed, 1);
        assert!(f.even.0.lock().is_empty());
        assert!(f.odd.0.lock().is_empty());
        assert_eq!(f.recorder.count(Stage::Router), 0);
    }

    proptest! {
        #[test]
        fn exactly_one_channel_receives(n in any::<i64>()) {
            let f = fixture();
            let _ = f.registry.publish(channel_names::INGRESS, Payload::Int(n));

            let even = f.even.0.lock().len();
            let odd = f.odd.0.lock().len();
            prop_assert_eq!(even + odd, 1);
            prop_assert_eq!(even == 1, n % 2 == 0);
        }

        #[test]
        fn routing_is_idempotent(n in any::<i64>()) {
            let r = router();
            let first = r.route(n).to_string();
            prop_assert_eq!(first.as_str(), r.route(n));
        }
    }
}
