use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Runtime payload carried by a `Message`.
///
/// Sources emit `Int`; transformers turn it into `Text`. Handlers and the
/// router inspect the variant and reject kinds they cannot process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Payload {
    /// Signed integer produced by a source or the gateway.
    Int(i64),
    /// Descriptive string produced by a transformer.
    Text(String),
}

impl Payload {
    /// Returns the runtime kind of this payload.
    #[must_use]
    pub fn kind(&self) -> PayloadKind {
        match self {
            Self::Int(_) => PayloadKind::Integer,
            Self::Text(_) => PayloadKind::String,
        }
    }

    /// Returns the integer value, if this is an `Int` payload.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            Self::Text(_) => None,
        }
    }

    /// Returns the text value, if this is a `Text` payload.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s.as_str()),
            Self::Int(_) => None,
        }
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Payload {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<String> for Payload {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

/// Discriminant of a `Payload`, used in logs and payload-kind errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PayloadKind {
    Integer,
    String,
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Integer => "Integer",
            Self::String => "String",
        })
    }
}

/// An immutable payload addressed to a named channel.
///
/// Messages carry no identity beyond their payload. Every subscriber on a
/// channel sees the same value; nothing can mutate it in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    channel: Arc<str>,
    payload: Payload,
}

impl Message {
    #[must_use]
    pub fn new(channel: impl Into<Arc<str>>, payload: Payload) -> Self {
        Self {
            channel: channel.into(),
            payload,
        }
    }

    /// The channel this message was published to.
    #[must_use]
    pub fn channel(&self) -> &str {
        &self.channel
    }

    #[must_use]
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Consumes the message and returns its payload.
    #[must_use]
    pub fn into_payload(self) -> Payload {
        self.payload
    }

    /// Builds a copy of this message addressed to another channel.
    #[must_use]
    pub fn readdress(&self, channel: impl Into<Arc<str>>) -> Self {
        Self {
            channel: channel.into(),
            payload: self.payload.clone(),
        }
    }
}
