use std::sync::Arc;

use crate::channel::{PublishOutcome, SubscriptionId};
use crate::error::DeliveryError;
use crate::message::{Message, Payload};

/// Callback bound to exactly one channel at registration time.
///
/// A subscriber either chains by publishing onward through `bus`, or is
/// terminal and only performs a side effect. Used as `Arc<dyn Subscriber>`.
pub trait Subscriber: Send + Sync {
    /// Stable name of this subscriber, used in logs.
    fn name(&self) -> &'static str;

    /// Process one delivered message.
    ///
    /// `bus` is the registry that delivered the message; onward publishes go
    /// through it so no subscriber needs ambient access to a registry.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError` when the message cannot be processed, e.g. the
    /// payload is of an unexpected kind.
    fn on_message(&self, msg: &Message, bus: &dyn ChannelRegistry) -> Result<(), DeliveryError>;
}

/// Named publish/subscribe channels.
///
/// Every subscriber registered on a channel receives each message published
/// to it; subscribers do not compete. Delivery is synchronous: `publish`
/// returns once every subscriber (and anything they publish onward) has run.
pub trait ChannelRegistry: Send + Sync {
    /// Deliver `payload` to every subscriber of `channel`.
    ///
    /// Publishing to a channel without subscribers is a no-op.
    fn publish(&self, channel: &str, payload: Payload) -> PublishOutcome;

    /// Bind `subscriber` to `channel` for the lifetime of the registry.
    fn subscribe(&self, channel: &str, subscriber: Arc<dyn Subscriber>) -> SubscriptionId;

    /// Number of subscribers currently bound to `channel`.
    fn subscriber_count(&self, channel: &str) -> usize;
}

/// Narrow entry point that accepts one integer and publishes it to a fixed
/// channel, hiding the registry from the caller.
pub trait NumberGateway: Send + Sync {
    fn send_number(&self, number: i64);
}
