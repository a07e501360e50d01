//! Pipeline status endpoint.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct WeatherResponse {
    pub temperature: f64,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub ticks: u64,
    pub view: &'static str,
    pub topics: Vec<String>,
    pub weather: WeatherResponse,
    pub turnstile_counts: BTreeMap<i64, u64>,
}

/// GET /status: provisioned topics, view state and current model values.
pub async fn get(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let weather = state.weather.snapshot().await;
    let view = state.view_state.read().await.as_str();

    Json(StatusResponse {
        ticks: state.ticks.load(Ordering::Relaxed),
        view,
        topics: state
            .registry
            .names()
            .into_iter()
            .map(|name| name.as_str().to_string())
            .collect(),
        weather: WeatherResponse {
            temperature: weather.temperature,
            status: weather.status,
        },
        turnstile_counts: state.turnstile_summary.counts().await.into_iter().collect(),
    })
}
