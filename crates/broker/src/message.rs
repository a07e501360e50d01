//! Messages as they travel to and from the broker.

use crate::TopicName;

/// A serialized record waiting to be handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub topic: TopicName,
    pub key: Vec<u8>,
    /// `None` marks a tombstone.
    pub payload: Option<Vec<u8>>,
}

impl OutboundMessage {
    pub fn new(topic: TopicName, key: Vec<u8>, payload: Option<Vec<u8>>) -> Self {
        Self {
            topic,
            key,
            payload,
        }
    }
}

/// Acknowledgement for a delivered record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    pub topic: TopicName,
    pub partition: i32,
    pub offset: u64,
}

/// A message read back from a topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    pub topic: TopicName,
    pub partition: i32,
    pub offset: u64,
    pub key: Option<Vec<u8>>,
    pub payload: Option<Vec<u8>>,
}

impl RawMessage {
    /// Returns the payload as text, replacing invalid UTF-8.
    ///
    /// Used for diagnostics when a payload cannot be decoded.
    pub fn payload_lossy(&self) -> String {
        self.payload
            .as_deref()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
            .unwrap_or_default()
    }
}
