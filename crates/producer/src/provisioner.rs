//! Check-then-create topic provisioning.

use std::sync::Arc;
use std::time::Duration;

use broker::{BrokerAdmin, TopicSpec};

use crate::error::{ProducerError, Result};
use crate::registry::TopicRegistry;

/// How [`TopicProvisioner::ensure`] satisfied a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionOutcome {
    /// The topic was already confirmed in this process; no remote call was made.
    AlreadyRegistered,
    /// The broker already had the topic, typically created by another process.
    FoundOnBroker,
    /// The topic was created by this call.
    Created,
}

/// Makes sure a topic exists before anything is produced to it.
///
/// Creating a topic is not idempotent on most brokers, so the broker catalog
/// is always consulted before a create request is sent. The shared
/// [`TopicRegistry`] short-circuits both calls for topics already confirmed
/// during this run.
pub struct TopicProvisioner {
    admin: Arc<dyn BrokerAdmin>,
    registry: Arc<TopicRegistry>,
    timeout: Duration,
}

impl TopicProvisioner {
    /// Timeout applied to catalog and create calls unless overridden.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    /// Creates a provisioner sharing the given registry.
    pub fn new(admin: Arc<dyn BrokerAdmin>, registry: Arc<TopicRegistry>) -> Self {
        Self {
            admin,
            registry,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Overrides the timeout for remote calls.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the registry this provisioner records topics in.
    pub fn registry(&self) -> &Arc<TopicRegistry> {
        &self.registry
    }

    /// Ensures the topic described by `spec` exists.
    ///
    /// A failed or timed-out catalog listing is returned as an error and no
    /// create request is sent, since the topic may well exist.
    #[tracing::instrument(skip(self, spec), fields(topic = %spec.name()))]
    pub async fn ensure(&self, spec: &TopicSpec) -> Result<ProvisionOutcome> {
        let name = spec.name();

        if self.registry.contains(name.as_str()) {
            return Ok(ProvisionOutcome::AlreadyRegistered);
        }

        let existing = self.admin.list_topics(self.timeout).await?;
        if existing.contains(name) {
            tracing::info!("topic already exists on broker");
            self.registry.add(name.clone());
            return Ok(ProvisionOutcome::FoundOnBroker);
        }

        let mut results = self
            .admin
            .create_topics(std::slice::from_ref(spec), self.timeout)
            .await?;

        match results.remove(name) {
            Some(Ok(())) => {
                self.registry.add(name.clone());
                metrics::counter!("topics_created_total").increment(1);
                tracing::info!(
                    partitions = spec.partitions(),
                    replication_factor = spec.replication_factor(),
                    "topic created"
                );
                Ok(ProvisionOutcome::Created)
            }
            Some(Err(cause)) => {
                tracing::error!(%cause, "failed to create topic");
                Err(ProducerError::TopicCreation {
                    topic: name.clone(),
                    cause,
                })
            }
            None => {
                tracing::error!("broker returned no result for topic");
                Err(ProducerError::TopicCreation {
                    topic: name.clone(),
                    cause: "no creation result returned by broker".to_string(),
                })
            }
        }
    }
}
