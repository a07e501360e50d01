use std::time::Duration;

use async_trait::async_trait;

use crate::{DeliveryError, DeliveryReport, OutboundMessage, Result};

/// Result passed to a delivery callback.
pub type DeliveryOutcome = std::result::Result<DeliveryReport, DeliveryError>;

/// Invoked once per record when the broker acknowledges or rejects it.
pub type DeliveryCallback = Box<dyn FnOnce(DeliveryOutcome) + Send + 'static>;

/// Asynchronous record delivery.
///
/// `produce` only enqueues; the record is delivered later and its outcome is
/// reported through the optional callback. Implementations must accept
/// concurrent `produce` calls.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Enqueues a message for delivery.
    fn produce(&self, message: OutboundMessage, on_delivery: Option<DeliveryCallback>)
    -> Result<()>;

    /// Blocks until every enqueued message is delivered or failed, or the
    /// timeout elapses.
    async fn flush(&self, timeout: Duration) -> Result<()>;
}
