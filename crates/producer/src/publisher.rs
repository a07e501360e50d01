//! Record publishing with flush-on-close.

use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use broker::{DeliveryCallback, TopicName, Transport};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::error::{ProducerError, Result};
use crate::record::Record;

/// Flush timeout used by [`RecordPublisher::close`] unless overridden.
pub const DEFAULT_FLUSH_TIMEOUT: Duration = Duration::from_secs(10);

/// Publishes records with key type `K` and value type `V` to one topic.
///
/// The topic must already be provisioned; [`Producer`](crate::Producer)
/// takes care of that. Publishing is fire-and-forget: delivery happens in the
/// transport and failures are reported through callbacks and counted, never
/// returned from [`publish`](Self::publish).
pub struct RecordPublisher<K, V> {
    topic: TopicName,
    transport: Arc<dyn Transport>,
    flush_timeout: Duration,
    closed: AtomicBool,
    flushed: Mutex<bool>,
    delivery_failures: Arc<AtomicU64>,
    _schema: PhantomData<fn(K, V)>,
}

impl<K, V> RecordPublisher<K, V> {
    /// Creates a publisher for an already provisioned topic.
    pub fn new(topic: TopicName, transport: Arc<dyn Transport>) -> Self {
        Self {
            topic,
            transport,
            flush_timeout: DEFAULT_FLUSH_TIMEOUT,
            closed: AtomicBool::new(false),
            flushed: Mutex::new(false),
            delivery_failures: Arc::new(AtomicU64::new(0)),
            _schema: PhantomData,
        }
    }

    /// Overrides the flush timeout used on close.
    pub fn with_flush_timeout(mut self, timeout: Duration) -> Self {
        self.flush_timeout = timeout;
        self
    }

    pub fn topic(&self) -> &TopicName {
        &self.topic
    }

    /// Number of records the broker reported as failed.
    pub fn delivery_failures(&self) -> u64 {
        self.delivery_failures.load(Ordering::Relaxed)
    }

    /// Returns true once [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Flushes outstanding records and stops accepting new ones.
    ///
    /// Waits until every record is acknowledged or failed, bounded by the
    /// flush timeout. Safe to call repeatedly: once a flush has succeeded,
    /// later calls return immediately. A failed flush may be retried.
    #[tracing::instrument(skip(self), fields(topic = %self.topic))]
    pub async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);

        let mut flushed = self.flushed.lock().await;
        if *flushed {
            return Ok(());
        }

        self.transport.flush(self.flush_timeout).await?;
        *flushed = true;
        tracing::info!(
            delivery_failures = self.delivery_failures(),
            "publisher flushed and closed"
        );
        Ok(())
    }
}

impl<K: Serialize, V: Serialize> RecordPublisher<K, V> {
    /// Serializes the record and hands it to the transport.
    pub fn publish(&self, record: &Record<K, V>) -> Result<()> {
        self.publish_with_callback(record, None)
    }

    /// Like [`publish`](Self::publish), with a callback observing the
    /// delivery outcome of this record.
    pub fn publish_with_callback(
        &self,
        record: &Record<K, V>,
        on_delivery: Option<DeliveryCallback>,
    ) -> Result<()> {
        if self.is_closed() {
            return Err(ProducerError::Closed(self.topic.clone()));
        }

        let message = record.encode(&self.topic)?;
        let failures = Arc::clone(&self.delivery_failures);
        let callback: DeliveryCallback = Box::new(move |outcome| {
            if let Err(err) = &outcome {
                failures.fetch_add(1, Ordering::Relaxed);
                metrics::counter!("record_delivery_failures_total").increment(1);
                tracing::warn!(topic = %err.topic, reason = %err.reason, "record delivery failed");
            }
            if let Some(on_delivery) = on_delivery {
                on_delivery(outcome);
            }
        });

        self.transport.produce(message, Some(callback))?;
        metrics::counter!("records_published_total").increment(1);
        Ok(())
    }
}
