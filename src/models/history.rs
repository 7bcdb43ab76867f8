//! Historical observation series

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::conditions::SourceUnits;

/// A single historical observation.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Observation {
    /// Observation timestamp
    pub timestamp: DateTime<Utc>,
    /// Temperature in Celsius
    pub temperature: f32,
    /// Relative humidity in percent, when reported
    pub humidity: Option<f32>,
    /// Wind speed in km/h, when reported
    pub wind_speed: Option<f32>,
}

/// Ordered series of observations covering a date range.
///
/// Timestamps are strictly ascending with no duplicates; the normalizer
/// enforces both before a series is handed out.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct HistoricalSeries {
    /// First day of the covered range (inclusive)
    pub start: NaiveDate,
    /// Last day of the covered range (inclusive)
    pub end: NaiveDate,
    /// Observations, ascending by timestamp
    pub observations: Vec<Observation>,
    /// Unit system of the original payload
    pub units: SourceUnits,
}

impl HistoricalSeries {
    #[must_use]
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Min/max temperature over the series, `None` when empty.
    #[must_use]
    pub fn temperature_range(&self) -> Option<(f32, f32)> {
        if self.observations.is_empty() {
            return None;
        }
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        for obs in &self.observations {
            min = min.min(obs.temperature);
            max = max.max(obs.temperature);
        }
        Some((min, max))
    }
}
