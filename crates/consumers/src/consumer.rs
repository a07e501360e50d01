//! Polling consumer that feeds one topic into one model.

use std::sync::Arc;

use broker::{MessageSource, TopicName};

use crate::{ConsumerModel, MessageDecoder, Result};

/// Default number of messages fetched per poll.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Outcome of a single poll.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumeStats {
    pub applied: usize,
    pub skipped: usize,
}

impl ConsumeStats {
    pub fn total(&self) -> usize {
        self.applied + self.skipped
    }
}

/// Reads a topic from a tracked offset, decodes each message and applies
/// it to a model.
///
/// A message that fails to decode is logged and skipped; the offset still
/// advances past it so later messages are applied.
pub struct TopicConsumer<D, M> {
    topic: TopicName,
    source: Arc<dyn MessageSource>,
    decoder: D,
    model: M,
    offset: u64,
    batch_size: usize,
}

impl<D, M> TopicConsumer<D, M>
where
    D: MessageDecoder,
    M: ConsumerModel<Record = D::Record>,
{
    pub fn new(
        topic: impl Into<TopicName>,
        source: Arc<dyn MessageSource>,
        decoder: D,
        model: M,
    ) -> Self {
        Self {
            topic: topic.into(),
            source,
            decoder,
            model,
            offset: 0,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Starts reading from `offset` instead of the beginning of the topic.
    pub fn from_offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    pub fn topic(&self) -> &TopicName {
        &self.topic
    }

    /// Next offset to be fetched.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Fetches and applies the next batch.
    ///
    /// Only a fetch failure is an error; decode failures are counted in
    /// the returned stats.
    #[tracing::instrument(skip(self), fields(topic = %self.topic, model = self.model.name(), offset = self.offset))]
    pub async fn poll(&mut self) -> Result<ConsumeStats> {
        let messages = self
            .source
            .fetch(&self.topic, self.offset, self.batch_size)
            .await?;

        let mut stats = ConsumeStats::default();
        for message in messages {
            self.offset = self.offset.max(message.offset + 1);

            match self.decoder.decode(&message) {
                Ok(record) => {
                    self.model.apply(record).await;
                    stats.applied += 1;
                }
                Err(e) => {
                    metrics::counter!("consumer_messages_skipped_total").increment(1);
                    tracing::error!(
                        offset = e.offset,
                        payload = %e.payload,
                        error = %e,
                        "Skipping undecodable message"
                    );
                    stats.skipped += 1;
                }
            }
        }

        if stats.total() > 0 {
            tracing::debug!(applied = stats.applied, skipped = stats.skipped, "Poll complete");
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{JsonDecoder, WeatherModel, WeatherReading};
    use broker::{InMemoryBroker, OutboundMessage, TopicSpec, Transport};

    fn broker_with_topic(name: &str) -> InMemoryBroker {
        InMemoryBroker::new().with_topic(TopicSpec::new(name, 1, 1).unwrap())
    }

    fn send(broker: &InMemoryBroker, topic: &str, payload: &[u8]) {
        broker
            .produce(
                OutboundMessage::new(TopicName::new(topic), b"k".to_vec(), Some(payload.to_vec())),
                None,
            )
            .unwrap();
    }

    #[tokio::test]
    async fn poll_applies_and_advances_offset() {
        let broker = broker_with_topic("weather");
        send(&broker, "weather", br#"{"temperature": 40.0}"#);
        send(&broker, "weather", br#"{"status": "cloudy"}"#);

        let mut consumer = TopicConsumer::new(
            "weather",
            Arc::new(broker.clone()),
            JsonDecoder::<WeatherReading>::new(),
            WeatherModel::new(),
        );

        let stats = consumer.poll().await.unwrap();
        assert_eq!(stats, ConsumeStats { applied: 2, skipped: 0 });
        assert_eq!(consumer.offset(), 2);

        let snapshot = consumer.model().snapshot().await;
        assert_eq!(snapshot.temperature, 40.0);
        assert_eq!(snapshot.status, "cloudy");

        // Nothing new to read.
        let stats = consumer.poll().await.unwrap();
        assert_eq!(stats.total(), 0);
        assert_eq!(consumer.offset(), 2);
    }

    #[tokio::test]
    async fn batch_size_limits_each_poll() {
        let broker = broker_with_topic("weather");
        for temperature in [10, 20, 30] {
            send(
                &broker,
                "weather",
                format!(r#"{{"temperature": {temperature}}}"#).as_bytes(),
            );
        }

        let mut consumer = TopicConsumer::new(
            "weather",
            Arc::new(broker.clone()),
            JsonDecoder::<WeatherReading>::new(),
            WeatherModel::new(),
        )
        .with_batch_size(2);

        assert_eq!(consumer.poll().await.unwrap().applied, 2);
        assert_eq!(consumer.poll().await.unwrap().applied, 1);
        assert_eq!(consumer.model().snapshot().await.temperature, 30.0);
    }

    #[tokio::test]
    async fn unknown_topic_is_an_error() {
        let mut consumer = TopicConsumer::new(
            "missing",
            Arc::new(InMemoryBroker::new()),
            JsonDecoder::<WeatherReading>::new(),
            WeatherModel::new(),
        );

        assert!(consumer.poll().await.is_err());
        assert_eq!(consumer.offset(), 0);
    }
}
