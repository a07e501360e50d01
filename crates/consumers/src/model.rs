//! Model trait for consumer-side state.

use async_trait::async_trait;

/// An in-memory model kept up to date from decoded records.
#[async_trait]
pub trait ConsumerModel: Send + Sync {
    type Record: Send;

    /// Returns the name of this model.
    fn name(&self) -> &'static str;

    /// Applies one decoded record.
    async fn apply(&self, record: Self::Record);
}
