use async_trait::async_trait;

use crate::{RawMessage, Result, TopicName};

/// Reads delivered messages from a topic by offset.
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Returns up to `max` messages starting at `offset`, oldest first.
    async fn fetch(&self, topic: &TopicName, offset: u64, max: usize) -> Result<Vec<RawMessage>>;
}
