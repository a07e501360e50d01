//! Broker-facing abstractions for the transit event pipeline.
//!
//! This crate defines the seams the rest of the workspace talks through:
//! - [`BrokerAdmin`] for listing and creating topics
//! - [`Transport`] for asynchronous record delivery with flush
//! - [`MessageSource`] for reading delivered messages back
//!
//! [`InMemoryBroker`] implements all three for tests and local runs. The
//! `kafka` feature adds implementations backed by `rdkafka`.

pub mod admin;
pub mod error;
#[cfg(feature = "kafka")]
pub mod kafka;
pub mod memory;
pub mod message;
pub mod source;
pub mod topic;
pub mod transport;

pub use admin::{BrokerAdmin, CreateTopicResult};
pub use common::TopicName;
pub use error::{BrokerError, DeliveryError, Result};
#[cfg(feature = "kafka")]
pub use kafka::{KafkaAdmin, KafkaSource, KafkaTransport};
pub use memory::InMemoryBroker;
pub use message::{DeliveryReport, OutboundMessage, RawMessage};
pub use source::MessageSource;
pub use topic::{CleanupPolicy, CompressionType, TopicConfig, TopicSpec};
pub use transport::{DeliveryCallback, DeliveryOutcome, Transport};
