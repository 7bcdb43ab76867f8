//! Current weather conditions snapshot

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Unit system the upstream payload was expressed in, recorded for display.
/// Values past the normalizer are always Celsius and km/h.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SourceUnits {
    /// Original temperature unit, e.g. "°C" or "°F"
    pub temperature: String,
    /// Original wind speed unit, e.g. "km/h", "mph" or "m/s"
    pub wind_speed: String,
}

impl SourceUnits {
    /// The units weather values are normalized to internally.
    #[must_use]
    pub fn metric() -> Self {
        Self {
            temperature: "°C".to_string(),
            wind_speed: "km/h".to_string(),
        }
    }
}

/// Snapshot of current conditions at a location.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CurrentConditions {
    /// Observation timestamp reported by the upstream service
    pub timestamp: DateTime<Utc>,
    /// Temperature in Celsius
    pub temperature: f32,
    /// Relative humidity in percent, when reported
    pub humidity: Option<f32>,
    /// Wind speed in km/h, when reported
    pub wind_speed: Option<f32>,
    /// Human-readable description of conditions
    pub condition: String,
    /// WMO weather code, when reported
    pub condition_code: Option<u8>,
    /// Unit system of the original payload
    pub units: SourceUnits,
}

impl CurrentConditions {
    /// Whether the observation is recent enough to serve without a re-fetch.
    #[must_use]
    pub fn is_fresh(&self, window: Duration, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(self.timestamp);
        age <= chrono::Duration::from_std(window).unwrap_or(chrono::Duration::MAX)
    }

    /// Format temperature with unit
    #[must_use]
    pub fn format_temperature(&self) -> String {
        format!("{:.1}°C", self.temperature)
    }

    /// Format wind speed with unit, "unknown" when not reported
    #[must_use]
    pub fn format_wind(&self) -> String {
        match self.wind_speed {
            Some(speed) => format!("{speed:.1} km/h"),
            None => "unknown".to_string(),
        }
    }

    /// Format humidity, "unknown" when not reported
    #[must_use]
    pub fn format_humidity(&self) -> String {
        match self.humidity {
            Some(humidity) => format!("{humidity:.0}%"),
            None => "unknown".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(timestamp: DateTime<Utc>) -> CurrentConditions {
        CurrentConditions {
            timestamp,
            temperature: 18.4,
            humidity: Some(62.0),
            wind_speed: None,
            condition: "Partly cloudy".to_string(),
            condition_code: Some(2),
            units: SourceUnits::metric(),
        }
    }

    #[test]
    fn test_freshness_within_window() {
        let now = Utc::now();
        let conditions = snapshot(now - chrono::Duration::minutes(10));
        assert!(conditions.is_fresh(Duration::from_secs(3600), now));
    }

    #[test]
    fn test_freshness_expired() {
        let now = Utc::now();
        let conditions = snapshot(now - chrono::Duration::hours(2));
        assert!(!conditions.is_fresh(Duration::from_secs(3600), now));
    }

    #[test]
    fn test_format_helpers_handle_unknowns() {
        let conditions = snapshot(Utc::now());
        assert_eq!(conditions.format_temperature(), "18.4°C");
        assert_eq!(conditions.format_humidity(), "62%");
        assert_eq!(conditions.format_wind(), "unknown");
    }
}
