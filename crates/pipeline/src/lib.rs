//! Transit event pipeline runner.
//!
//! Wires producers, the derived-view bootstrap and the consumer models
//! together, and serves their state over HTTP with structured logging
//! (tracing) and Prometheus metrics.

pub mod config;
pub mod connections;
pub mod error;
pub mod feeds;
pub mod routes;
pub mod runner;
pub mod simulation;

use std::sync::Arc;
use std::sync::atomic::AtomicU64;

use axum::Router;
use axum::routing::get;
use consumers::{TurnstileSummaryModel, WeatherModel};
use metrics_exporter_prometheus::PrometheusHandle;
use producer::TopicRegistry;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use views::BootstrapState;

pub use config::{BrokerKind, Config};
pub use connections::{BrokerConnections, QueryEngine, query_engine};
pub use error::{PipelineError, Result};
pub use runner::Pipeline;

/// State shared between the pipeline loop and the HTTP handlers.
#[derive(Debug, Default)]
pub struct AppState {
    pub registry: Arc<TopicRegistry>,
    pub weather: WeatherModel,
    pub turnstile_summary: TurnstileSummaryModel,
    pub view_state: RwLock<BootstrapState>,
    pub ticks: AtomicU64,
}

impl AppState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/status", get(routes::status::get))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
