//! Integration tests: producers sharing one registry against one broker.

use std::sync::Arc;

use broker::{InMemoryBroker, TopicSpec, Transport};
use producer::events::{self, TURNSTILE_TOPIC, WEATHER_TOPIC};
use producer::{
    EventKey, Line, Producer, ProducerError, TopicProvisioner, TopicRegistry, TurnstileEvent,
    WeatherEvent, WeatherStatus,
};

fn setup() -> (InMemoryBroker, TopicProvisioner, Arc<dyn Transport>) {
    let broker = InMemoryBroker::new();
    let provisioner =
        TopicProvisioner::new(Arc::new(broker.clone()), Arc::new(TopicRegistry::new()));
    let transport: Arc<dyn Transport> = Arc::new(broker.clone());
    (broker, provisioner, transport)
}

#[tokio::test]
async fn test_stations_scenario_creates_once() {
    let (broker, provisioner, transport) = setup();
    let spec = TopicSpec::new("stations", 1, 1).unwrap();

    let first: Producer<EventKey, TurnstileEvent> =
        Producer::create(spec.clone(), &provisioner, Arc::clone(&transport))
            .await
            .unwrap();
    assert!(provisioner.registry().contains("stations"));
    let calls_after_first = (broker.list_calls(), broker.create_calls());
    assert_eq!(calls_after_first, (1, 1));

    let second: Producer<EventKey, TurnstileEvent> =
        Producer::create(spec, &provisioner, transport).await.unwrap();
    assert_eq!((broker.list_calls(), broker.create_calls()), calls_after_first);

    first.close().await.unwrap();
    second.close().await.unwrap();
}

#[tokio::test]
async fn test_producers_for_different_topics_share_registry() {
    let (broker, provisioner, transport) = setup();

    let turnstile: Producer<EventKey, TurnstileEvent> = Producer::create(
        events::turnstile_topic_spec().unwrap(),
        &provisioner,
        Arc::clone(&transport),
    )
    .await
    .unwrap();
    let weather: Producer<EventKey, WeatherEvent> = Producer::create(
        events::weather_topic_spec().unwrap(),
        &provisioner,
        transport,
    )
    .await
    .unwrap();

    assert_eq!(broker.create_calls(), 2);
    assert_eq!(provisioner.registry().len(), 2);

    turnstile
        .publish_event(TurnstileEvent {
            station_id: 40380,
            station_name: "Clark/Lake".to_string(),
            line: Line::Blue,
        })
        .unwrap();
    weather
        .publish_event(WeatherEvent {
            temperature: 68.0,
            status: WeatherStatus::Windy,
        })
        .unwrap();

    assert_eq!(broker.messages(TURNSTILE_TOPIC).len(), 1);
    assert_eq!(broker.messages(WEATHER_TOPIC).len(), 1);
}

#[tokio::test]
async fn test_restarted_process_finds_topic_on_broker() {
    let (broker, provisioner, transport) = setup();
    let spec = TopicSpec::new("stations", 1, 1).unwrap();
    let _first: Producer<EventKey, TurnstileEvent> =
        Producer::create(spec.clone(), &provisioner, Arc::clone(&transport))
            .await
            .unwrap();

    // A new process starts with an empty registry.
    let restarted =
        TopicProvisioner::new(Arc::new(broker.clone()), Arc::new(TopicRegistry::new()));
    let _second: Producer<EventKey, TurnstileEvent> =
        Producer::create(spec, &restarted, transport).await.unwrap();

    assert_eq!(broker.list_calls(), 2);
    assert_eq!(broker.create_calls(), 1);
    assert!(restarted.registry().contains("stations"));
}

#[tokio::test]
async fn test_failed_provisioning_aborts_producer_creation() {
    let (broker, provisioner, transport) = setup();
    broker.fail_topic_creation(WEATHER_TOPIC, "Broker: Policy violation");

    let result: Result<Producer<EventKey, WeatherEvent>, _> =
        Producer::create(events::weather_topic_spec().unwrap(), &provisioner, transport).await;

    match result {
        Err(ProducerError::TopicCreation { topic, cause }) => {
            assert_eq!(topic.as_str(), WEATHER_TOPIC);
            assert_eq!(cause, "Broker: Policy violation");
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("producer should not be created"),
    }
    assert!(provisioner.registry().is_empty());
}

#[tokio::test]
async fn test_close_flushes_everything_published() {
    let (broker, provisioner, transport) = setup();
    broker.set_hold_deliveries(true);

    let weather: Producer<EventKey, WeatherEvent> = Producer::create(
        events::weather_topic_spec().unwrap(),
        &provisioner,
        transport,
    )
    .await
    .unwrap();

    for temperature in [60.0, 61.5, 63.0] {
        weather
            .publish_event(WeatherEvent {
                temperature,
                status: WeatherStatus::Sunny,
            })
            .unwrap();
    }
    assert_eq!(broker.pending_count(), 3);

    weather.close().await.unwrap();
    weather.close().await.unwrap();

    assert_eq!(broker.messages(WEATHER_TOPIC).len(), 3);
    assert_eq!(broker.flush_calls(), 1);
}
