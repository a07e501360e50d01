//! Kafka-backed admin, transport and source, enabled by the `kafka` feature.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use rdkafka::ClientContext;
use rdkafka::admin::{AdminClient, AdminOptions, NewTopic, TopicReplication};
use rdkafka::client::DefaultClientContext;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{BaseConsumer, Consumer};
use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use rdkafka::message::Message;
use rdkafka::producer::{BaseRecord, DeliveryResult, Producer, ProducerContext, ThreadedProducer};
use rdkafka::{Offset, TopicPartitionList};

use crate::{
    BrokerAdmin, BrokerError, CreateTopicResult, DeliveryCallback, DeliveryError, DeliveryReport,
    MessageSource, OutboundMessage, RawMessage, Result, TopicName, TopicSpec, Transport,
};

fn is_timeout(err: &KafkaError) -> bool {
    err.rdkafka_error_code() == Some(RDKafkaErrorCode::OperationTimedOut)
}

fn join_error(err: tokio::task::JoinError) -> BrokerError {
    BrokerError::Unavailable(format!("blocking broker call aborted: {err}"))
}

/// Converts a partition or replica count to the signed width Kafka expects.
fn kafka_count(topic: &TopicName, what: &str, value: u32) -> Result<i32> {
    i32::try_from(value).map_err(|_| {
        BrokerError::InvalidTopicSpec(format!("{topic}: {what} {value} exceeds {}", i32::MAX))
    })
}

/// Topic administration through the Kafka admin API.
pub struct KafkaAdmin {
    client: Arc<AdminClient<DefaultClientContext>>,
}

impl KafkaAdmin {
    /// Connects an admin client to the given bootstrap servers.
    pub fn new(bootstrap_servers: &str) -> Result<Self> {
        let client: AdminClient<DefaultClientContext> = ClientConfig::new()
            .set("bootstrap.servers", bootstrap_servers)
            .create()?;
        Ok(Self {
            client: Arc::new(client),
        })
    }
}

#[async_trait]
impl BrokerAdmin for KafkaAdmin {
    async fn list_topics(&self, timeout: Duration) -> Result<HashSet<TopicName>> {
        let client = Arc::clone(&self.client);
        let metadata = tokio::task::spawn_blocking(move || {
            client.inner().fetch_metadata(None, timeout)
        })
        .await
        .map_err(join_error)?
        .map_err(|err| {
            if is_timeout(&err) {
                BrokerError::Timeout(timeout)
            } else {
                BrokerError::Kafka(err)
            }
        })?;

        Ok(metadata
            .topics()
            .iter()
            .map(|topic| TopicName::new(topic.name()))
            .collect())
    }

    async fn create_topics(
        &self,
        specs: &[TopicSpec],
        timeout: Duration,
    ) -> Result<HashMap<TopicName, CreateTopicResult>> {
        let configs: Vec<_> = specs
            .iter()
            .map(|spec| spec.config().to_config_map())
            .collect();

        let new_topics = specs
            .iter()
            .zip(&configs)
            .map(|(spec, config)| {
                let partitions = kafka_count(spec.name(), "partitions", spec.partitions())?;
                let replication =
                    kafka_count(spec.name(), "replication factor", spec.replication_factor())?;
                Ok(config.iter().fold(
                    NewTopic::new(
                        spec.name().as_str(),
                        partitions,
                        TopicReplication::Fixed(replication),
                    ),
                    |topic, (key, value)| topic.set(key, value),
                ))
            })
            .collect::<Result<Vec<NewTopic<'_>>>>()?;

        let options = AdminOptions::new()
            .operation_timeout(Some(timeout))
            .request_timeout(Some(timeout));

        let results = self.client.create_topics(new_topics.iter(), &options).await?;

        Ok(results
            .into_iter()
            .map(|result| match result {
                Ok(name) => (TopicName::new(name), Ok(())),
                Err((name, code)) => (TopicName::new(name), Err(code.to_string())),
            })
            .collect())
    }
}

/// Delivery opaque carrying the caller's callback through librdkafka.
pub struct PendingCallback(Option<DeliveryCallback>);

/// Producer context that routes delivery reports to per-record callbacks.
pub struct DeliveryContext;

impl ClientContext for DeliveryContext {}

impl ProducerContext for DeliveryContext {
    type DeliveryOpaque = Box<PendingCallback>;

    fn delivery(&self, result: &DeliveryResult<'_>, opaque: Self::DeliveryOpaque) {
        let outcome = match result {
            Ok(message) => Ok(DeliveryReport {
                topic: TopicName::new(message.topic()),
                partition: message.partition(),
                offset: message.offset().max(0) as u64,
            }),
            Err((err, message)) => {
                tracing::warn!(topic = message.topic(), error = %err, "record delivery failed");
                Err(DeliveryError {
                    topic: TopicName::new(message.topic()),
                    reason: err.to_string(),
                })
            }
        };

        if let Some(callback) = opaque.0 {
            callback(outcome);
        }
    }
}

/// Record transport over a threaded Kafka producer.
///
/// librdkafka polls for delivery reports on its own thread, so callbacks run
/// there rather than on the caller's task.
pub struct KafkaTransport {
    producer: Arc<ThreadedProducer<DeliveryContext>>,
}

impl KafkaTransport {
    /// Creates a producer connected to the given bootstrap servers.
    pub fn new(bootstrap_servers: &str) -> Result<Self> {
        let producer: ThreadedProducer<DeliveryContext> = ClientConfig::new()
            .set("bootstrap.servers", bootstrap_servers)
            .set("compression.type", "lz4")
            .create_with_context(DeliveryContext)?;
        Ok(Self {
            producer: Arc::new(producer),
        })
    }
}

#[async_trait]
impl Transport for KafkaTransport {
    fn produce(
        &self,
        message: OutboundMessage,
        on_delivery: Option<DeliveryCallback>,
    ) -> Result<()> {
        let mut record: BaseRecord<'_, Vec<u8>, Vec<u8>, Box<PendingCallback>> =
            BaseRecord::with_opaque_to(
                message.topic.as_str(),
                Box::new(PendingCallback(on_delivery)),
            );
        record.key = Some(&message.key);
        record.payload = message.payload.as_ref();

        self.producer
            .send(record)
            .map_err(|(err, _record)| BrokerError::Enqueue {
                topic: message.topic.clone(),
                reason: err.to_string(),
            })
    }

    async fn flush(&self, timeout: Duration) -> Result<()> {
        let producer = Arc::clone(&self.producer);
        tokio::task::spawn_blocking(move || producer.flush(timeout))
            .await
            .map_err(join_error)?
            .map_err(|err| {
                if is_timeout(&err) {
                    BrokerError::Timeout(timeout)
                } else {
                    BrokerError::Kafka(err)
                }
            })
    }
}

/// Reads topics by offset through a consumer with manual partition
/// assignment. No consumer group coordination or offset commits happen.
///
/// Topics are read from partition 0, which holds every record of the
/// single-partition topics this pipeline provisions.
pub struct KafkaSource {
    consumer: Arc<Mutex<BaseConsumer>>,
    poll_timeout: Duration,
}

impl KafkaSource {
    pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(500);

    /// Creates a consumer connected to the given bootstrap servers.
    pub fn new(bootstrap_servers: &str) -> Result<Self> {
        let consumer: BaseConsumer = ClientConfig::new()
            .set("bootstrap.servers", bootstrap_servers)
            .set("group.id", "transit-pipeline-readers")
            .set("enable.auto.commit", "false")
            .set("enable.auto.offset.store", "false")
            .set("enable.partition.eof", "true")
            .create()?;
        Ok(Self {
            consumer: Arc::new(Mutex::new(consumer)),
            poll_timeout: Self::DEFAULT_POLL_TIMEOUT,
        })
    }

    /// Overrides how long a fetch waits for the next message.
    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }
}

fn read_partition(
    consumer: &Mutex<BaseConsumer>,
    topic: &TopicName,
    offset: u64,
    max: usize,
    poll_timeout: Duration,
) -> Result<Vec<RawMessage>> {
    let consumer = consumer.lock().unwrap_or_else(PoisonError::into_inner);

    let start = i64::try_from(offset).map_err(|_| {
        BrokerError::Unavailable(format!("offset {offset} on {topic} is out of range"))
    })?;
    let mut assignment = TopicPartitionList::new();
    assignment.add_partition_offset(topic.as_str(), 0, Offset::Offset(start))?;
    consumer.assign(&assignment)?;

    let mut messages = Vec::new();
    while messages.len() < max {
        match consumer.poll(poll_timeout) {
            None | Some(Err(KafkaError::PartitionEOF(_))) => break,
            Some(Err(err))
                if matches!(
                    err.rdkafka_error_code(),
                    Some(RDKafkaErrorCode::UnknownTopicOrPartition | RDKafkaErrorCode::UnknownTopic)
                ) =>
            {
                return Err(BrokerError::UnknownTopic(topic.clone()));
            }
            Some(Err(err)) => return Err(err.into()),
            Some(Ok(message)) => messages.push(RawMessage {
                topic: TopicName::new(message.topic()),
                partition: message.partition(),
                offset: message.offset().max(0) as u64,
                key: message.key().map(<[u8]>::to_vec),
                payload: message.payload().map(<[u8]>::to_vec),
            }),
        }
    }
    Ok(messages)
}

#[async_trait]
impl MessageSource for KafkaSource {
    async fn fetch(&self, topic: &TopicName, offset: u64, max: usize) -> Result<Vec<RawMessage>> {
        let consumer = Arc::clone(&self.consumer);
        let topic = topic.clone();
        let poll_timeout = self.poll_timeout;
        tokio::task::spawn_blocking(move || {
            read_partition(&consumer, &topic, offset, max, poll_timeout)
        })
        .await
        .map_err(join_error)?
    }
}
