//! Key/value records and their wire encoding.

use broker::{OutboundMessage, TopicName};
use serde::{Deserialize, Serialize};

use crate::Result;

/// Key schema shared by every event producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventKey {
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl EventKey {
    /// Creates a key stamped with the current time.
    pub fn now() -> Self {
        Self {
            timestamp: common::now_millis(),
        }
    }
}

/// A record published as one unit.
///
/// A `None` value is a tombstone.
#[derive(Debug, Clone, PartialEq)]
pub struct Record<K, V> {
    pub key: K,
    pub value: Option<V>,
}

impl<K, V> Record<K, V> {
    pub fn new(key: K, value: V) -> Self {
        Self {
            key,
            value: Some(value),
        }
    }

    pub fn tombstone(key: K) -> Self {
        Self { key, value: None }
    }
}

impl<K: Serialize, V: Serialize> Record<K, V> {
    /// Serializes key and value as JSON for the given topic.
    pub fn encode(&self, topic: &TopicName) -> Result<OutboundMessage> {
        let key = serde_json::to_vec(&self.key)?;
        let payload = self
            .value
            .as_ref()
            .map(serde_json::to_vec)
            .transpose()?;
        Ok(OutboundMessage::new(topic.clone(), key, payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Reading {
        temperature: f64,
    }

    #[test]
    fn encode_writes_json_key_and_value() {
        let record = Record::new(EventKey { timestamp: 42 }, Reading { temperature: 71.5 });
        let message = record.encode(&TopicName::new("weather")).unwrap();

        assert_eq!(message.topic.as_str(), "weather");
        assert_eq!(message.key, br#"{"timestamp":42}"#.to_vec());
        assert_eq!(
            message.payload,
            Some(br#"{"temperature":71.5}"#.to_vec())
        );
    }

    #[test]
    fn tombstone_has_no_payload() {
        let record: Record<EventKey, Reading> = Record::tombstone(EventKey { timestamp: 1 });
        let message = record.encode(&TopicName::new("weather")).unwrap();
        assert!(message.payload.is_none());
    }
}
