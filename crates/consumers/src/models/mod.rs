//! Concrete consumer models.

mod turnstile_summary;
mod weather;

pub use turnstile_summary::{TurnstileSummaryModel, TurnstileSummaryRow};
pub use weather::{WeatherModel, WeatherReading, WeatherSnapshot};
