//! Consumer error types.

use broker::{BrokerError, TopicName};
use thiserror::Error;

/// A message could not be turned into a typed record.
///
/// Carries the offending payload for diagnostics. Decode failures are
/// per message: the consumer logs them and moves on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Failed to decode message at {topic}@{offset}: {reason}")]
pub struct DecodeError {
    pub topic: TopicName,
    pub offset: u64,
    /// The raw payload, with invalid UTF-8 replaced.
    pub payload: String,
    pub reason: String,
}

/// Errors that stop a poll as a whole.
#[derive(Debug, Error)]
pub enum ConsumerError {
    /// Messages could not be fetched from the broker.
    #[error("Broker error: {0}")]
    Broker(#[from] BrokerError),
}

/// Result type for consumer operations.
pub type Result<T> = std::result::Result<T, ConsumerError>;
