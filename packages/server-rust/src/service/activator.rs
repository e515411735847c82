//! Service activator: an independent subscriber on the odd channel.

use std::sync::Arc;

use oddeven_core::{ChannelRegistry, DeliveryError, Message, Subscriber};

use super::observer::{Stage, StageEvent, StageObserver, StageOutput};

/// Receives the raw payload of every message on its channel, alongside any
/// other subscriber, and records the value with its runtime kind.
///
/// Accepts every payload kind.
pub struct ServiceActivator {
    observer: Arc<dyn StageObserver>,
}

impl ServiceActivator {
    #[must_use]
    pub fn new(observer: Arc<dyn StageObserver>) -> Self {
        Self { observer }
    }
}

impl Subscriber for ServiceActivator {
    fn name(&self) -> &'static str {
        Stage::ServiceActivator.as_str()
    }

    fn on_message(&self, msg: &Message, _bus: &dyn ChannelRegistry) -> Result<(), DeliveryError> {
        self.observer.on_stage(&StageEvent::new(
            Stage::ServiceActivator,
            msg.channel(),
            msg.payload().clone(),
            StageOutput::Consumed,
        ));
        Ok(())
    }
}
