use std::marker::PhantomData;

use broker::RawMessage;
use serde::de::DeserializeOwned;

use crate::DecodeError;

/// Turns one raw message into a typed record.
pub trait MessageDecoder: Send + Sync {
    type Record: Send;

    fn decode(&self, message: &RawMessage) -> Result<Self::Record, DecodeError>;
}

/// Decodes JSON message values into `T`.
///
/// Tombstones (messages without a value) are decode failures.
pub struct JsonDecoder<T> {
    _record: PhantomData<fn() -> T>,
}

impl<T> JsonDecoder<T> {
    pub fn new() -> Self {
        Self {
            _record: PhantomData,
        }
    }
}

impl<T> Default for JsonDecoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: DeserializeOwned + Send> MessageDecoder for JsonDecoder<T> {
    type Record = T;

    fn decode(&self, message: &RawMessage) -> Result<T, DecodeError> {
        let failure = |reason: String| DecodeError {
            topic: message.topic.clone(),
            offset: message.offset,
            payload: message.payload_lossy(),
            reason,
        };

        let payload = message
            .payload
            .as_deref()
            .ok_or_else(|| failure("message has no value".to_string()))?;

        serde_json::from_slice(payload).map_err(|e| failure(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use broker::TopicName;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Reading {
        temperature: f64,
    }

    fn message(payload: Option<&[u8]>) -> RawMessage {
        RawMessage {
            topic: TopicName::new("weather"),
            partition: 0,
            offset: 7,
            key: None,
            payload: payload.map(<[u8]>::to_vec),
        }
    }

    #[test]
    fn decodes_valid_json() {
        let decoder = JsonDecoder::<Reading>::new();
        let record = decoder
            .decode(&message(Some(br#"{"temperature": 65.5}"#)))
            .unwrap();
        assert_eq!(record, Reading { temperature: 65.5 });
    }

    #[test]
    fn invalid_json_reports_payload() {
        let decoder = JsonDecoder::<Reading>::new();
        let err = decoder.decode(&message(Some(b"not json"))).unwrap_err();
        assert_eq!(err.payload, "not json");
        assert_eq!(err.offset, 7);
        assert_eq!(err.topic.as_str(), "weather");
    }

    #[test]
    fn tombstone_is_a_decode_failure() {
        let decoder = JsonDecoder::<Reading>::new();
        let err = decoder.decode(&message(None)).unwrap_err();
        assert_eq!(err.reason, "message has no value");
    }
}
