//! Per-station entry counts read from the turnstile summary view.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::ConsumerModel;

/// One row of the derived summary table. The query engine upper-cases
/// column names, so both spellings are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TurnstileSummaryRow {
    #[serde(alias = "STATION_ID")]
    pub station_id: i64,
    #[serde(alias = "COUNT")]
    pub count: u64,
}

#[derive(Debug, Clone, Default)]
pub struct TurnstileSummaryModel {
    counts: Arc<RwLock<HashMap<i64, u64>>>,
}

impl TurnstileSummaryModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest count for a station, if one has been seen.
    pub async fn count(&self, station_id: i64) -> Option<u64> {
        self.counts.read().await.get(&station_id).copied()
    }

    pub async fn station_count(&self) -> usize {
        self.counts.read().await.len()
    }

    pub async fn counts(&self) -> HashMap<i64, u64> {
        self.counts.read().await.clone()
    }
}

#[async_trait]
impl ConsumerModel for TurnstileSummaryModel {
    type Record = TurnstileSummaryRow;

    fn name(&self) -> &'static str {
        "TurnstileSummaryModel"
    }

    async fn apply(&self, row: TurnstileSummaryRow) {
        // Each row carries the running total, so the latest one wins.
        self.counts.write().await.insert(row.station_id, row.count);
    }
}
