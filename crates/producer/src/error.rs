//! Producer error types.

use broker::{BrokerError, TopicName};
use thiserror::Error;

/// Errors that can occur while provisioning topics or publishing records.
#[derive(Debug, Error)]
pub enum ProducerError {
    /// The broker rejected creation of a topic.
    ///
    /// Fatal to producer construction: a producer is never handed out for a
    /// topic that could not be provisioned.
    #[error("Failed to create topic {topic}: {cause}")]
    TopicCreation { topic: TopicName, cause: String },

    /// A broker call failed or timed out.
    #[error("Broker error: {0}")]
    Broker(#[from] BrokerError),

    /// A record key or value could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The publisher was closed before the record was submitted.
    #[error("Publisher for topic {0} is closed")]
    Closed(TopicName),
}

/// Result type for producer operations.
pub type Result<T> = std::result::Result<T, ProducerError>;
