//! Derived-view bootstrap against a KSQL-style query engine.
//!
//! This crate provides:
//! - [`ViewDefinition`] describing a source table and its grouped aggregate
//! - [`KsqlClient`] for catalog listing and statement submission, with an
//!   HTTP implementation and an in-memory engine
//! - [`ViewBootstrapper`], which submits a view's statements only when the
//!   engine catalog does not already contain it

pub mod bootstrap;
pub mod client;
pub mod definition;
pub mod error;
pub mod http;
pub mod memory;

pub use bootstrap::{BootstrapOutcome, BootstrapState, ViewBootstrapper};
pub use client::{KsqlClient, StatementRequest, StatementResponse};
pub use definition::{Column, ValueFormat, ViewDefinition};
pub use error::{Result, ViewError};
pub use http::HttpKsqlClient;
pub use memory::{BrokerLink, InMemoryKsqlEngine};
