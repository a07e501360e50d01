//! Synthetic transit activity published on every tick.

use std::sync::Arc;
use std::time::Duration;

use broker::{TopicName, Transport};
use producer::events::{arrivals_topic_spec, turnstile_topic_spec, weather_topic_spec};
use producer::{
    ArrivalEvent, EventKey, Line, Producer, TopicProvisioner, TrainStatus, TurnstileEvent,
    WeatherEvent, WeatherStatus,
};

use crate::Result;

/// A station served by the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Station {
    pub id: i32,
    pub name: &'static str,
    pub line: Line,
}

/// Stations along the simulated line, in travel order.
pub const STATIONS: &[Station] = &[
    Station {
        id: 40890,
        name: "O'Hare",
        line: Line::Blue,
    },
    Station {
        id: 40010,
        name: "Austin",
        line: Line::Blue,
    },
    Station {
        id: 40380,
        name: "Clark/Lake",
        line: Line::Blue,
    },
];

const WEATHER_CYCLE: [WeatherStatus; 5] = [
    WeatherStatus::Sunny,
    WeatherStatus::PartlyCloudy,
    WeatherStatus::Cloudy,
    WeatherStatus::Windy,
    WeatherStatus::Precipitation,
];

/// Owns one producer per event source and publishes a round of events
/// on each [`tick`](Self::tick).
pub struct Simulation {
    weather: Producer<EventKey, WeatherEvent>,
    turnstiles: Producer<EventKey, TurnstileEvent>,
    arrivals: Vec<(Station, Producer<EventKey, ArrivalEvent>)>,
    ticks: u64,
}

impl Simulation {
    /// Creates every producer, provisioning its topic first.
    ///
    /// Fails on the first topic that cannot be provisioned.
    pub async fn create(
        provisioner: &TopicProvisioner,
        transport: Arc<dyn Transport>,
        flush_timeout: Duration,
    ) -> Result<Self> {
        let weather = Producer::<EventKey, WeatherEvent>::create(
            weather_topic_spec()?,
            provisioner,
            transport.clone(),
        )
        .await?
        .with_flush_timeout(flush_timeout);
        let turnstiles = Producer::<EventKey, TurnstileEvent>::create(
            turnstile_topic_spec()?,
            provisioner,
            transport.clone(),
        )
        .await?
        .with_flush_timeout(flush_timeout);

        let mut arrivals = Vec::with_capacity(STATIONS.len());
        for station in STATIONS {
            let producer = Producer::<EventKey, ArrivalEvent>::create(
                arrivals_topic_spec(station.name)?,
                provisioner,
                transport.clone(),
            )
            .await?
            .with_flush_timeout(flush_timeout);
            arrivals.push((*station, producer));
        }

        tracing::info!(producers = arrivals.len() + 2, "simulation producers ready");
        Ok(Self {
            weather,
            turnstiles,
            arrivals,
            ticks: 0,
        })
    }

    pub fn weather_topic(&self) -> &TopicName {
        self.weather.topic()
    }

    pub fn turnstile_topic(&self) -> &TopicName {
        self.turnstiles.topic()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Publishes one weather reading, one turnstile entry and one train
    /// arrival.
    pub fn tick(&mut self) -> Result<()> {
        let tick = self.ticks;
        let index = (tick % STATIONS.len() as u64) as usize;
        let station = STATIONS[index];

        self.weather.publish_event(WeatherEvent {
            temperature: 40.0 + (tick % 20) as f64,
            status: WEATHER_CYCLE[(tick / 5) as usize % WEATHER_CYCLE.len()],
        })?;

        self.turnstiles.publish_event(TurnstileEvent {
            station_id: station.id,
            station_name: station.name.to_string(),
            line: station.line,
        })?;

        let previous = index.checked_sub(1).map(|i| STATIONS[i]);
        let (_, arrivals) = &self.arrivals[index];
        arrivals.publish_event(ArrivalEvent {
            station_id: station.id,
            train_id: format!("BL{:03}", tick % 1000),
            direction: "b".to_string(),
            line: station.line,
            train_status: TrainStatus::InService,
            prev_station_id: previous.map(|s| s.id),
            prev_direction: previous.map(|_| "b".to_string()),
        })?;

        self.ticks += 1;
        Ok(())
    }

    /// Closes every producer, flushing outstanding records.
    ///
    /// All producers are closed even if one fails; the first failure is
    /// returned.
    pub async fn close(&self) -> Result<()> {
        let mut outcomes = vec![self.weather.close().await, self.turnstiles.close().await];
        for (_, producer) in &self.arrivals {
            outcomes.push(producer.close().await);
        }

        let mut first_error = None;
        for outcome in outcomes {
            if let Err(e) = outcome {
                tracing::error!(error = %e, "failed to close producer");
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }
}
