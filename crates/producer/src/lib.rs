//! Producer side of the transit event pipeline.
//!
//! This crate provides:
//! - [`TopicRegistry`], the process-wide set of topics known to exist
//! - [`TopicProvisioner`], which creates a topic only after checking the broker
//! - [`RecordPublisher`], which serializes records and flushes on close
//! - [`Producer`], which ties the two together the way every event source uses them
//! - Typed events for station arrivals, turnstile entries and weather

pub mod error;
pub mod events;
pub mod producer;
pub mod provisioner;
pub mod publisher;
pub mod record;
pub mod registry;

pub use error::{ProducerError, Result};
pub use events::{ArrivalEvent, Line, TrainStatus, TurnstileEvent, WeatherEvent, WeatherStatus};
pub use producer::Producer;
pub use provisioner::{ProvisionOutcome, TopicProvisioner};
pub use publisher::RecordPublisher;
pub use record::{EventKey, Record};
pub use registry::TopicRegistry;
