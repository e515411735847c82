//! `oddeven` Core — messages, parity classification, and channel capability traits.

pub mod channel;
pub mod error;
pub mod message;
pub mod parity;
pub mod traits;

pub use channel::{channel_names, PublishOutcome, SubscriptionId};
pub use error::DeliveryError;
pub use message::{Message, Payload, PayloadKind};
pub use parity::Parity;
pub use traits::{ChannelRegistry, NumberGateway, Subscriber};
