//! Current-weather model.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::ConsumerModel;

/// A decoded weather message. Either field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct WeatherReading {
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Last known weather conditions.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherSnapshot {
    pub temperature: f64,
    pub status: String,
}

impl Default for WeatherSnapshot {
    fn default() -> Self {
        Self {
            temperature: 70.0,
            status: "sunny".to_string(),
        }
    }
}

/// Tracks the latest weather. Fields present in a reading overwrite the
/// current value; absent fields keep it.
#[derive(Debug, Clone, Default)]
pub struct WeatherModel {
    current: Arc<RwLock<WeatherSnapshot>>,
}

impl WeatherModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> WeatherSnapshot {
        self.current.read().await.clone()
    }
}

#[async_trait]
impl ConsumerModel for WeatherModel {
    type Record = WeatherReading;

    fn name(&self) -> &'static str {
        "WeatherModel"
    }

    async fn apply(&self, reading: WeatherReading) {
        let mut current = self.current.write().await;
        if let Some(temperature) = reading.temperature {
            current.temperature = temperature;
        }
        if let Some(status) = reading.status {
            current.status = status;
        }
        tracing::debug!(
            temperature = current.temperature,
            status = %current.status,
            "weather updated"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn starts_with_defaults() {
        let model = WeatherModel::new();
        let snapshot = model.snapshot().await;
        assert_eq!(snapshot.temperature, 70.0);
        assert_eq!(snapshot.status, "sunny");
    }

    #[tokio::test]
    async fn present_fields_overwrite() {
        let model = WeatherModel::new();
        model
            .apply(WeatherReading {
                temperature: Some(31.5),
                status: Some("snow".to_string()),
            })
            .await;

        let snapshot = model.snapshot().await;
        assert_eq!(snapshot.temperature, 31.5);
        assert_eq!(snapshot.status, "snow");
    }

    #[tokio::test]
    async fn absent_fields_keep_current_value() {
        let model = WeatherModel::new();
        model
            .apply(WeatherReading {
                temperature: Some(55.0),
                status: None,
            })
            .await;
        model
            .apply(WeatherReading {
                temperature: None,
                status: Some("windy".to_string()),
            })
            .await;

        let snapshot = model.snapshot().await;
        assert_eq!(snapshot.temperature, 55.0);
        assert_eq!(snapshot.status, "windy");
    }

    #[test]
    fn reading_tolerates_missing_fields() {
        let reading: WeatherReading = serde_json::from_str("{}").unwrap();
        assert_eq!(reading, WeatherReading::default());
    }
}
