//! Domain events published by the transit simulation.

use broker::{TopicName, TopicSpec};
use serde::{Deserialize, Serialize};

/// Topic receiving every turnstile entry.
pub const TURNSTILE_TOPIC: &str = "org.chicago.cta.turnstile.v1";

/// Topic receiving weather readings.
pub const WEATHER_TOPIC: &str = "org.chicago.cta.weather.v1";

const ARRIVALS_TOPIC_PREFIX: &str = "org.chicago.cta.station.arrivals";

/// Train line serving a station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Line {
    Blue,
    Red,
    Green,
}

impl Line {
    pub fn as_str(&self) -> &'static str {
        match self {
            Line::Blue => "blue",
            Line::Red => "red",
            Line::Green => "green",
        }
    }
}

impl std::fmt::Display for Line {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Operating status of a train at arrival time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainStatus {
    InService,
    OutOfService,
    BrokenDown,
}

/// Observed weather condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherStatus {
    Sunny,
    PartlyCloudy,
    Cloudy,
    Windy,
    Precipitation,
}

/// A train arriving at a station.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrivalEvent {
    pub station_id: i32,
    pub train_id: String,
    pub direction: String,
    pub line: Line,
    pub train_status: TrainStatus,
    pub prev_station_id: Option<i32>,
    pub prev_direction: Option<String>,
}

/// A rider passing through a station turnstile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnstileEvent {
    pub station_id: i32,
    pub station_name: String,
    pub line: Line,
}

/// A periodic weather reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherEvent {
    pub temperature: f64,
    pub status: WeatherStatus,
}

/// Topic name for arrivals at one station.
///
/// The station name is lower-cased and reduced to characters that are safe
/// in a topic name, e.g. `"Addison (O'Hare-bound)"` becomes
/// `org.chicago.cta.station.arrivals.addison_(ohare_bound)`.
pub fn arrivals_topic(station_name: &str) -> TopicName {
    let normalized = station_name
        .to_lowercase()
        .replace('/', "_and_")
        .replace([' ', '-'], "_")
        .replace('\'', "");
    TopicName::new(format!("{ARRIVALS_TOPIC_PREFIX}.{normalized}"))
}

/// Spec for a station's arrivals topic.
pub fn arrivals_topic_spec(station_name: &str) -> broker::Result<TopicSpec> {
    TopicSpec::new(arrivals_topic(station_name), 1, 1)
}

/// Spec for the turnstile topic.
pub fn turnstile_topic_spec() -> broker::Result<TopicSpec> {
    TopicSpec::new(TURNSTILE_TOPIC, 1, 1)
}

/// Spec for the weather topic.
pub fn weather_topic_spec() -> broker::Result<TopicSpec> {
    TopicSpec::new(WEATHER_TOPIC, 1, 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrivals_topic_normalizes_station_name() {
        assert_eq!(
            arrivals_topic("Clark/Lake").as_str(),
            "org.chicago.cta.station.arrivals.clark_and_lake"
        );
        assert_eq!(
            arrivals_topic("Harlem-Lake").as_str(),
            "org.chicago.cta.station.arrivals.harlem_lake"
        );
        assert_eq!(
            arrivals_topic("O'Hare").as_str(),
            "org.chicago.cta.station.arrivals.ohare"
        );
        assert_eq!(
            arrivals_topic("Washington Wells").as_str(),
            "org.chicago.cta.station.arrivals.washington_wells"
        );
    }

    #[test]
    fn turnstile_event_serializes_line_lowercase() {
        let event = TurnstileEvent {
            station_id: 40380,
            station_name: "Clark/Lake".to_string(),
            line: Line::Blue,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["line"], "blue");
        assert_eq!(json["station_id"], 40380);
    }

    #[test]
    fn weather_status_serializes_snake_case() {
        let event = WeatherEvent {
            temperature: 64.2,
            status: WeatherStatus::PartlyCloudy,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["status"], "partly_cloudy");
    }

    #[test]
    fn arrival_event_keeps_missing_previous_station() {
        let event = ArrivalEvent {
            station_id: 40380,
            train_id: "BL001".to_string(),
            direction: "a".to_string(),
            line: Line::Blue,
            train_status: TrainStatus::InService,
            prev_station_id: None,
            prev_direction: None,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert!(json["prev_station_id"].is_null());
        assert_eq!(json["train_status"], "in_service");
    }

    #[test]
    fn fixed_topic_specs_are_valid() {
        assert_eq!(turnstile_topic_spec().unwrap().name().as_str(), TURNSTILE_TOPIC);
        assert_eq!(weather_topic_spec().unwrap().name().as_str(), WEATHER_TOPIC);
    }
}
