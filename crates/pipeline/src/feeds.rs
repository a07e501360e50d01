//! Consumers that keep the status models current.

use std::sync::Arc;

use broker::{BrokerError, MessageSource, TopicName};
use consumers::{
    ConsumeStats, ConsumerError, JsonDecoder, TopicConsumer, TurnstileSummaryModel,
    TurnstileSummaryRow, WeatherModel, WeatherReading,
};

type WeatherConsumer = TopicConsumer<JsonDecoder<WeatherReading>, WeatherModel>;
type SummaryConsumer = TopicConsumer<JsonDecoder<TurnstileSummaryRow>, TurnstileSummaryModel>;

/// Reads the weather topic and the turnstile summary topic into their models.
pub struct ModelFeeds {
    weather: WeatherConsumer,
    summary: SummaryConsumer,
}

impl ModelFeeds {
    pub fn new(
        source: Arc<dyn MessageSource>,
        weather_topic: TopicName,
        weather: WeatherModel,
        summary_topic: TopicName,
        summary: TurnstileSummaryModel,
    ) -> Self {
        Self {
            weather: TopicConsumer::new(
                weather_topic,
                source.clone(),
                JsonDecoder::new(),
                weather,
            ),
            summary: TopicConsumer::new(summary_topic, source, JsonDecoder::new(), summary),
        }
    }

    /// Polls both consumers once.
    ///
    /// The summary topic only exists once the query engine has materialized
    /// the view, so a missing summary topic is not an error.
    pub async fn poll(&mut self) -> Result<ConsumeStats, ConsumerError> {
        let weather = self.weather.poll().await?;

        let summary = match self.summary.poll().await {
            Ok(stats) => stats,
            Err(ConsumerError::Broker(BrokerError::UnknownTopic(topic))) => {
                tracing::debug!(%topic, "summary topic not materialized yet");
                ConsumeStats::default()
            }
            Err(e) => return Err(e),
        };

        Ok(ConsumeStats {
            applied: weather.applied + summary.applied,
            skipped: weather.skipped + summary.skipped,
        })
    }
}
