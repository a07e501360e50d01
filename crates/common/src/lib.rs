//! Shared types used across the pipeline crates.

pub mod types;

pub use types::{TopicName, now_millis};
