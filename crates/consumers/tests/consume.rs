use std::sync::Arc;

use broker::{InMemoryBroker, OutboundMessage, TopicName, Transport};
use consumers::{
    ConsumeStats, JsonDecoder, TopicConsumer, TurnstileSummaryModel, TurnstileSummaryRow,
    WeatherModel, WeatherReading,
};
use producer::events::weather_topic_spec;
use producer::{Producer, TopicProvisioner, TopicRegistry, WeatherEvent, WeatherStatus};

#[tokio::test]
async fn decode_failure_does_not_block_later_messages() {
    let broker = InMemoryBroker::new();
    let provisioner =
        TopicProvisioner::new(Arc::new(broker.clone()), Arc::new(TopicRegistry::new()));

    let spec = weather_topic_spec().unwrap();
    let topic = spec.name().clone();
    let weather: Producer<producer::EventKey, WeatherEvent> =
        Producer::create(spec, &provisioner, Arc::new(broker.clone()))
            .await
            .unwrap();

    weather
        .publish_event(WeatherEvent {
            temperature: 20.0,
            status: WeatherStatus::Precipitation,
        })
        .unwrap();
    broker
        .produce(
            OutboundMessage::new(topic.clone(), b"k".to_vec(), Some(b"{garbage".to_vec())),
            None,
        )
        .unwrap();
    weather
        .publish_event(WeatherEvent {
            temperature: 35.5,
            status: WeatherStatus::Cloudy,
        })
        .unwrap();
    weather.close().await.unwrap();

    let mut consumer = TopicConsumer::new(
        topic,
        Arc::new(broker.clone()),
        JsonDecoder::<WeatherReading>::new(),
        WeatherModel::new(),
    );

    let stats = consumer.poll().await.unwrap();
    assert_eq!(stats, ConsumeStats { applied: 2, skipped: 1 });
    assert_eq!(consumer.offset(), 3);

    let snapshot = consumer.model().snapshot().await;
    assert_eq!(snapshot.temperature, 35.5);
    assert_eq!(snapshot.status, "cloudy");
}

#[tokio::test]
async fn tombstones_are_skipped() {
    let topic = TopicName::new("TURNSTILE_SUMMARY");
    let broker = InMemoryBroker::new()
        .with_topic(broker::TopicSpec::new(topic.clone(), 1, 1).unwrap());

    for payload in [
        Some(br#"{"STATION_ID": 40380, "COUNT": 2}"#.to_vec()),
        None,
        Some(br#"{"STATION_ID": 40380, "COUNT": 3}"#.to_vec()),
    ] {
        broker
            .produce(OutboundMessage::new(topic.clone(), b"40380".to_vec(), payload), None)
            .unwrap();
    }

    let model = TurnstileSummaryModel::new();
    let mut consumer = TopicConsumer::new(
        topic,
        Arc::new(broker),
        JsonDecoder::<TurnstileSummaryRow>::new(),
        model.clone(),
    );

    let stats = consumer.poll().await.unwrap();
    assert_eq!(stats, ConsumeStats { applied: 2, skipped: 1 });
    assert_eq!(model.count(40380).await, Some(3));
}
