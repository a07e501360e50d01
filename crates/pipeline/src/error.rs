//! Pipeline error types.

use broker::BrokerError;
use consumers::ConsumerError;
use producer::ProducerError;
use thiserror::Error;
use views::ViewError;

/// Errors that stop the pipeline from starting or running.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Broker(#[from] BrokerError),

    #[error(transparent)]
    Producer(#[from] ProducerError),

    #[error(transparent)]
    View(#[from] ViewError),

    #[error(transparent)]
    Consumer(#[from] ConsumerError),

    #[error("Failed to install metrics recorder: {0}")]
    Metrics(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
