use std::time::Duration;

use thiserror::Error;

use crate::TopicName;

/// Errors returned by broker admin, transport and source operations.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// A topic specification violated one of its invariants.
    #[error("Invalid topic spec: {0}")]
    InvalidTopicSpec(String),

    /// A remote call did not complete within its timeout.
    #[error("Broker request timed out after {0:?}")]
    Timeout(Duration),

    /// The broker could not be reached or rejected the request.
    #[error("Broker unavailable: {0}")]
    Unavailable(String),

    /// The requested topic does not exist on the broker.
    #[error("Unknown topic: {0}")]
    UnknownTopic(TopicName),

    /// The transport refused to enqueue a message.
    #[error("Failed to enqueue message for {topic}: {reason}")]
    Enqueue { topic: TopicName, reason: String },

    /// An error reported by the Kafka client.
    #[cfg(feature = "kafka")]
    #[error("Kafka error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),
}

/// A single record failed to reach the broker.
///
/// Delivered through the per-record delivery callback; it never stops the
/// transport from accepting further records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Delivery to {topic} failed: {reason}")]
pub struct DeliveryError {
    pub topic: TopicName,
    pub reason: String,
}

/// Result type for broker operations.
pub type Result<T> = std::result::Result<T, BrokerError>;
