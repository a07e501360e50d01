//! Producer construction: provision first, then publish.

use std::sync::Arc;
use std::time::Duration;

use broker::{DeliveryCallback, TopicName, TopicSpec, Transport};
use serde::Serialize;

use crate::Result;
use crate::provisioner::TopicProvisioner;
use crate::publisher::RecordPublisher;
use crate::record::{EventKey, Record};

/// A publisher bound to a topic that is guaranteed to exist.
///
/// [`create`](Self::create) provisions the topic before anything else; if
/// that fails no producer is returned.
pub struct Producer<K, V> {
    spec: TopicSpec,
    publisher: RecordPublisher<K, V>,
}

impl<K: Serialize, V: Serialize> Producer<K, V> {
    /// Provisions the topic and returns a producer for it.
    #[tracing::instrument(skip_all, fields(topic = %spec.name()))]
    pub async fn create(
        spec: TopicSpec,
        provisioner: &TopicProvisioner,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        let outcome = provisioner.ensure(&spec).await?;
        tracing::debug!(?outcome, "producer topic ready");

        let publisher = RecordPublisher::new(spec.name().clone(), transport);
        Ok(Self { spec, publisher })
    }

    /// Publishes one record.
    pub fn publish(&self, record: &Record<K, V>) -> Result<()> {
        self.publisher.publish(record)
    }

    /// Publishes one record and observes its delivery outcome.
    pub fn publish_with_callback(
        &self,
        record: &Record<K, V>,
        on_delivery: DeliveryCallback,
    ) -> Result<()> {
        self.publisher.publish_with_callback(record, Some(on_delivery))
    }
}

impl<K, V> Producer<K, V> {
    /// Overrides the flush timeout used on close.
    pub fn with_flush_timeout(mut self, timeout: Duration) -> Self {
        self.publisher = self.publisher.with_flush_timeout(timeout);
        self
    }

    pub fn spec(&self) -> &TopicSpec {
        &self.spec
    }

    pub fn topic(&self) -> &TopicName {
        self.spec.name()
    }

    pub fn publisher(&self) -> &RecordPublisher<K, V> {
        &self.publisher
    }

    /// Flushes outstanding records. Idempotent.
    pub async fn close(&self) -> Result<()> {
        self.publisher.close().await
    }
}

impl<V: Serialize> Producer<EventKey, V> {
    /// Publishes an event keyed by the current time.
    pub fn publish_event(&self, event: V) -> Result<()> {
        self.publish(&Record::new(EventKey::now(), event))
    }
}
