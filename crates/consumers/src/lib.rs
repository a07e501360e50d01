//! Consumer side of the transit event pipeline.
//!
//! This crate provides:
//! - [`MessageDecoder`] turning raw messages into typed records, with a JSON implementation
//! - [`ConsumerModel`] for in-memory models updated from decoded records
//! - [`TopicConsumer`] polling a topic and isolating per-message decode failures
//! - Weather and turnstile-summary models

pub mod consumer;
pub mod decoder;
pub mod error;
pub mod model;
pub mod models;

pub use consumer::{ConsumeStats, TopicConsumer};
pub use decoder::{JsonDecoder, MessageDecoder};
pub use error::{ConsumerError, DecodeError, Result};
pub use model::ConsumerModel;
pub use models::{
    TurnstileSummaryModel, TurnstileSummaryRow, WeatherModel, WeatherReading, WeatherSnapshot,
};
