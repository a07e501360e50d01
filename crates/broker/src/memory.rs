use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::{
    BrokerAdmin, BrokerError, CreateTopicResult, DeliveryCallback, DeliveryError, DeliveryOutcome,
    DeliveryReport, MessageSource, OutboundMessage, RawMessage, Result, TopicName, TopicSpec,
    Transport,
};

struct TopicLog {
    spec: TopicSpec,
    messages: Vec<RawMessage>,
}

struct PendingDelivery {
    message: OutboundMessage,
    callback: Option<DeliveryCallback>,
}

#[derive(Default)]
struct BrokerState {
    topics: BTreeMap<TopicName, TopicLog>,
    pending: Vec<PendingDelivery>,
    hold_deliveries: bool,
    fail_deliveries: bool,
    list_timeout: bool,
    list_failure: Option<String>,
    create_failures: HashMap<TopicName, String>,
    list_calls: usize,
    create_calls: usize,
    flush_calls: usize,
}

impl BrokerState {
    fn deliver(&mut self, message: OutboundMessage) -> DeliveryOutcome {
        if self.fail_deliveries {
            return Err(DeliveryError {
                topic: message.topic,
                reason: "Broker: Request timed out".to_string(),
            });
        }

        let Some(log) = self.topics.get_mut(&message.topic) else {
            return Err(DeliveryError {
                topic: message.topic,
                reason: "Broker: Unknown topic or partition".to_string(),
            });
        };

        let partition = partition_for(&message.key, log.spec.partitions());
        let offset = log.messages.len() as u64;
        log.messages.push(RawMessage {
            topic: message.topic.clone(),
            partition,
            offset,
            key: Some(message.key),
            payload: message.payload,
        });

        Ok(DeliveryReport {
            topic: message.topic,
            partition,
            offset,
        })
    }
}

fn partition_for(key: &[u8], partitions: u32) -> i32 {
    let hash = key
        .iter()
        .fold(0u32, |h, b| h.wrapping_mul(31).wrapping_add(u32::from(*b)));
    (hash % partitions.max(1)) as i32
}

/// In-memory broker for tests and local runs.
///
/// Implements [`BrokerAdmin`], [`Transport`] and [`MessageSource`] over one
/// shared state, so a clone handed to a producer and a clone handed to a
/// consumer see the same topics. Every topic is stored as a single ordered
/// log; the partition is recorded on each message but offsets are per topic.
///
/// Records are delivered as soon as they are produced unless
/// [`set_hold_deliveries`](Self::set_hold_deliveries) is enabled, in which
/// case they wait for the next flush.
#[derive(Clone, Default)]
pub struct InMemoryBroker {
    state: Arc<Mutex<BrokerState>>,
}

impl InMemoryBroker {
    /// Creates a broker with no topics.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BrokerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds a topic directly, as if another process had created it.
    ///
    /// Does not count as a create call.
    pub fn with_topic(self, spec: TopicSpec) -> Self {
        self.lock().topics.insert(
            spec.name().clone(),
            TopicLog {
                spec,
                messages: Vec::new(),
            },
        );
        self
    }

    /// Makes `list_topics` time out.
    pub fn set_list_timeout(&self, timeout: bool) {
        self.lock().list_timeout = timeout;
    }

    /// Makes `list_topics` fail with the given reason, or succeed again with `None`.
    pub fn set_list_failure(&self, reason: Option<String>) {
        self.lock().list_failure = reason;
    }

    /// Makes creation of the named topic fail with the given reason.
    pub fn fail_topic_creation(&self, name: impl Into<TopicName>, reason: impl Into<String>) {
        self.lock()
            .create_failures
            .insert(name.into(), reason.into());
    }

    /// Queues produced records until the next flush instead of delivering them.
    pub fn set_hold_deliveries(&self, hold: bool) {
        self.lock().hold_deliveries = hold;
    }

    /// Makes every delivery fail.
    pub fn set_fail_deliveries(&self, fail: bool) {
        self.lock().fail_deliveries = fail;
    }

    /// Number of `list_topics` calls received.
    pub fn list_calls(&self) -> usize {
        self.lock().list_calls
    }

    /// Number of `create_topics` calls received.
    pub fn create_calls(&self) -> usize {
        self.lock().create_calls
    }

    /// Number of `flush` calls received.
    pub fn flush_calls(&self) -> usize {
        self.lock().flush_calls
    }

    /// Number of records waiting for a flush.
    pub fn pending_count(&self) -> usize {
        self.lock().pending.len()
    }

    /// Returns true if the topic exists.
    pub fn has_topic(&self, name: &str) -> bool {
        self.lock().topics.contains_key(name)
    }

    /// Returns the spec a topic was created with.
    pub fn topic_spec(&self, name: &str) -> Option<TopicSpec> {
        self.lock().topics.get(name).map(|log| log.spec.clone())
    }

    /// Returns every message delivered to a topic.
    pub fn messages(&self, name: &str) -> Vec<RawMessage> {
        self.lock()
            .topics
            .get(name)
            .map(|log| log.messages.clone())
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for InMemoryBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("InMemoryBroker")
            .field("topics", &state.topics.keys().collect::<Vec<_>>())
            .field("pending", &state.pending.len())
            .finish()
    }
}

#[async_trait]
impl BrokerAdmin for InMemoryBroker {
    async fn list_topics(&self, timeout: Duration) -> Result<HashSet<TopicName>> {
        let mut state = self.lock();
        state.list_calls += 1;

        if state.list_timeout {
            return Err(BrokerError::Timeout(timeout));
        }
        if let Some(reason) = &state.list_failure {
            return Err(BrokerError::Unavailable(reason.clone()));
        }

        Ok(state.topics.keys().cloned().collect())
    }

    async fn create_topics(
        &self,
        specs: &[TopicSpec],
        _timeout: Duration,
    ) -> Result<HashMap<TopicName, CreateTopicResult>> {
        let mut state = self.lock();
        state.create_calls += 1;

        let mut results = HashMap::with_capacity(specs.len());
        for spec in specs {
            let name = spec.name().clone();
            let result = if let Some(reason) = state.create_failures.get(&name) {
                Err(reason.clone())
            } else if state.topics.contains_key(&name) {
                Err(format!("Topic '{name}' already exists."))
            } else {
                state.topics.insert(
                    name.clone(),
                    TopicLog {
                        spec: spec.clone(),
                        messages: Vec::new(),
                    },
                );
                Ok(())
            };
            results.insert(name, result);
        }

        Ok(results)
    }
}

#[async_trait]
impl Transport for InMemoryBroker {
    fn produce(
        &self,
        message: OutboundMessage,
        on_delivery: Option<DeliveryCallback>,
    ) -> Result<()> {
        let outcome = {
            let mut state = self.lock();
            if state.hold_deliveries {
                state.pending.push(PendingDelivery {
                    message,
                    callback: on_delivery,
                });
                return Ok(());
            }
            state.deliver(message)
        };

        // Callbacks run outside the lock so they may call back into the broker.
        if let Some(callback) = on_delivery {
            callback(outcome);
        }
        Ok(())
    }

    async fn flush(&self, _timeout: Duration) -> Result<()> {
        let settled: Vec<(Option<DeliveryCallback>, DeliveryOutcome)> = {
            let mut state = self.lock();
            state.flush_calls += 1;
            let pending = std::mem::take(&mut state.pending);
            pending
                .into_iter()
                .map(|p| {
                    let outcome = state.deliver(p.message);
                    (p.callback, outcome)
                })
                .collect()
        };

        for (callback, outcome) in settled {
            if let Some(callback) = callback {
                callback(outcome);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl MessageSource for InMemoryBroker {
    async fn fetch(&self, topic: &TopicName, offset: u64, max: usize) -> Result<Vec<RawMessage>> {
        let state = self.lock();
        let log = state
            .topics
            .get(topic)
            .ok_or_else(|| BrokerError::UnknownTopic(topic.clone()))?;

        Ok(log
            .messages
            .iter()
            .skip(offset as usize)
            .take(max)
            .cloned()
            .collect())
    }
}
