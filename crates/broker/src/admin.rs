use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;

use crate::{Result, TopicName, TopicSpec};

/// Outcome of creating one topic; the error carries the broker's reason.
pub type CreateTopicResult = std::result::Result<(), String>;

/// Topic administration against a broker.
///
/// Both calls are bounded by `timeout`. A timeout is reported as
/// [`BrokerError::Timeout`](crate::BrokerError::Timeout), never as an empty
/// catalog.
#[async_trait]
pub trait BrokerAdmin: Send + Sync {
    /// Lists the names of all topics known to the broker.
    async fn list_topics(&self, timeout: Duration) -> Result<HashSet<TopicName>>;

    /// Requests creation of the given topics.
    ///
    /// The outer error covers the request as a whole; each entry of the map
    /// reports the result for one topic. Creating a topic that already exists
    /// is a per-topic error.
    async fn create_topics(
        &self,
        specs: &[TopicSpec],
        timeout: Duration,
    ) -> Result<HashMap<TopicName, CreateTopicResult>>;
}
