//! Gateway entry point: publish one integer to a fixed channel.

use std::sync::Arc;

use oddeven_core::{ChannelRegistry, NumberGateway, Payload};

use super::observer::{Stage, StageEvent, StageObserver, StageOutput};

/// `NumberGateway` bound to one target channel of a registry.
///
/// Callers see only `send_number`; the registry and channel name stay
/// behind this type.
pub struct ChannelGateway {
    bus: Arc<dyn ChannelRegistry>,
    target: String,
    observer: Arc<dyn StageObserver>,
}

impl ChannelGateway {
    #[must_use]
    pub fn new(
        bus: Arc<dyn ChannelRegistry>,
        target: impl Into<String>,
        observer: Arc<dyn StageObserver>,
    ) -> Self {
        Self {
            bus,
            target: target.into(),
            observer,
        }
    }

    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }
}

impl NumberGateway for ChannelGateway {
    fn send_number(&self, number: i64) {
        self.observer.on_stage(&StageEvent::new(
            Stage::Gateway,
            &self.target,
            Payload::Int(number),
            StageOutput::Emitted,
        ));
        let _ = self.bus.publish(&self.target, Payload::Int(number));
    }
}
