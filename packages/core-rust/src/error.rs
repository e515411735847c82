use crate::message::PayloadKind;

/// Errors raised by a subscriber while processing a delivered message.
///
/// These are never returned to the publisher: the registry records and logs
/// them per delivery so a mis-routed or malformed message is visible without
/// interrupting the other subscribers of the channel.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    #[error("{stage} expected a {expected} payload, got {found}")]
    UnexpectedPayload {
        stage: &'static str,
        expected: PayloadKind,
        found: PayloadKind,
    },
}

impl DeliveryError {
    /// Name of the stage that raised the error.
    #[must_use]
    pub fn stage(&self) -> &'static str {
        match self {
            Self::UnexpectedPayload { stage, .. } => stage,
        }
    }
}
