//! Upstream payload normalization
//!
//! Everything dynamic about the upstream JSON contract is confined to this
//! module: raw response structs, unit conversion and required-field checks.
//! Past this boundary the rest of the crate only sees the fixed internal
//! models, always in Celsius and km/h, with the original unit system
//! recorded for display.
//!
//! Missing optional fields become `None`; a missing or unparsable required
//! field (timestamp, temperature) fails with `MalformedResponse` and is
//! never retried.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::Deserialize;

use crate::error::WeatherError;
use crate::models::{CurrentConditions, HistoricalSeries, Observation, SourceUnits};

/// Forecast endpoint response carrying the current-conditions block.
#[derive(Debug, Deserialize)]
pub struct ForecastResponse {
    pub current_units: Option<UnitsBlock>,
    pub current: Option<CurrentBlock>,
}

/// Archive endpoint response carrying hourly observations.
#[derive(Debug, Deserialize)]
pub struct ArchiveResponse {
    pub hourly_units: Option<UnitsBlock>,
    pub hourly: Option<HourlyBlock>,
}

/// Units the upstream reports its values in.
#[derive(Debug, Default, Deserialize)]
pub struct UnitsBlock {
    #[serde(rename = "temperature_2m")]
    pub temperature: Option<String>,
    #[serde(rename = "wind_speed_10m")]
    pub wind_speed: Option<String>,
}

/// Current conditions block.
#[derive(Debug, Deserialize)]
pub struct CurrentBlock {
    pub time: Option<String>,
    #[serde(rename = "temperature_2m")]
    pub temperature: Option<f32>,
    #[serde(rename = "relative_humidity_2m")]
    pub humidity: Option<f32>,
    #[serde(rename = "wind_speed_10m")]
    pub wind_speed: Option<f32>,
    #[serde(rename = "weather_code")]
    pub weather_code: Option<u8>,
}

/// Hourly observations block, column-per-variable.
#[derive(Debug, Deserialize)]
pub struct HourlyBlock {
    pub time: Vec<String>,
    #[serde(rename = "temperature_2m")]
    pub temperature: Option<Vec<Option<f32>>>,
    #[serde(rename = "relative_humidity_2m")]
    pub humidity: Option<Vec<Option<f32>>>,
    #[serde(rename = "wind_speed_10m")]
    pub wind_speed: Option<Vec<Option<f32>>>,
}

/// Normalize a forecast payload into a current-conditions snapshot.
pub fn current(response: &ForecastResponse) -> Result<CurrentConditions, WeatherError> {
    let block = response
        .current
        .as_ref()
        .ok_or_else(|| WeatherError::malformed("no current conditions block in response"))?;

    let time = block
        .time
        .as_deref()
        .ok_or_else(|| WeatherError::malformed("observation timestamp missing"))?;
    let timestamp = parse_timestamp(time)?;

    let raw_temperature = block
        .temperature
        .ok_or_else(|| WeatherError::malformed("temperature missing from current conditions"))?;

    let units = source_units(response.current_units.as_ref());
    let temperature = to_celsius(raw_temperature, &units.temperature);
    let wind_speed = block.wind_speed.map(|v| to_kmh(v, &units.wind_speed));

    let condition = block
        .weather_code
        .map_or("Unknown", weather_code_to_description)
        .to_string();

    Ok(CurrentConditions {
        timestamp,
        temperature,
        humidity: block.humidity,
        wind_speed,
        condition,
        condition_code: block.weather_code,
        units,
    })
}

/// Normalize an archive payload into an ordered historical series.
///
/// Rows with an unparsable timestamp are a contract violation; rows whose
/// temperature is null are gaps in the record and are dropped. A payload
/// with no temperature column at all is malformed.
pub fn history(
    response: &ArchiveResponse,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<HistoricalSeries, WeatherError> {
    let block = response
        .hourly
        .as_ref()
        .ok_or_else(|| WeatherError::malformed("no hourly block in response"))?;

    let temperatures = block
        .temperature
        .as_ref()
        .ok_or_else(|| WeatherError::malformed("temperature column missing from hourly data"))?;

    let units = source_units(response.hourly_units.as_ref());

    let mut observations = Vec::with_capacity(block.time.len());
    for (i, time) in block.time.iter().enumerate() {
        let timestamp = parse_timestamp(time)?;
        let date = timestamp.date_naive();
        if date < start || date > end {
            continue;
        }

        let Some(temperature) = temperatures.get(i).copied().flatten() else {
            continue;
        };

        let humidity = column_value(block.humidity.as_ref(), i);
        let wind_speed =
            column_value(block.wind_speed.as_ref(), i).map(|v| to_kmh(v, &units.wind_speed));

        observations.push(Observation {
            timestamp,
            temperature: to_celsius(temperature, &units.temperature),
            humidity,
            wind_speed,
        });
    }

    observations.sort_by_key(|obs| obs.timestamp);
    observations.dedup_by_key(|obs| obs.timestamp);

    Ok(HistoricalSeries {
        start,
        end,
        observations,
        units,
    })
}

fn column_value(column: Option<&Vec<Option<f32>>>, index: usize) -> Option<f32> {
    column.and_then(|values| values.get(index).copied().flatten())
}

fn source_units(block: Option<&UnitsBlock>) -> SourceUnits {
    let metric = SourceUnits::metric();
    match block {
        Some(units) => SourceUnits {
            temperature: units
                .temperature
                .clone()
                .unwrap_or(metric.temperature),
            wind_speed: units.wind_speed.clone().unwrap_or(metric.wind_speed),
        },
        None => metric,
    }
}

/// Parse the timestamp formats the upstream emits.
pub(crate) fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, WeatherError> {
    // ISO 8601 without seconds (2026-02-05T14:00) is the common case
    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M") {
        return Ok(Utc.from_utc_datetime(&dt));
    }

    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Ok(Utc.from_utc_datetime(&dt));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    Err(WeatherError::malformed(format!(
        "unparsable timestamp: {s}"
    )))
}

/// Convert a temperature to Celsius based on the reported unit.
fn to_celsius(value: f32, unit: &str) -> f32 {
    match unit {
        "°F" | "fahrenheit" => (value - 32.0) * 5.0 / 9.0,
        _ => value,
    }
}

/// Convert a wind speed to km/h based on the reported unit.
fn to_kmh(value: f32, unit: &str) -> f32 {
    match unit {
        "mph" => value * 1.609_344,
        "m/s" | "ms" => value * 3.6,
        "kn" => value * 1.852,
        _ => value,
    }
}

/// Convert a WMO weather code to a human-readable description
#[must_use]
pub fn weather_code_to_description(code: u8) -> &'static str {
    match code {
        0 => "Clear sky",
        1 => "Mainly clear",
        2 => "Partly cloudy",
        3 => "Overcast",
        45 => "Fog",
        48 => "Depositing rime fog",
        51 => "Light drizzle",
        53 => "Moderate drizzle",
        55 => "Dense drizzle",
        56 => "Light freezing drizzle",
        57 => "Dense freezing drizzle",
        61 => "Slight rain",
        63 => "Moderate rain",
        65 => "Heavy rain",
        66 => "Light freezing rain",
        67 => "Heavy freezing rain",
        71 => "Slight snow fall",
        73 => "Moderate snow fall",
        75 => "Heavy snow fall",
        77 => "Snow grains",
        80 => "Slight rain showers",
        81 => "Moderate rain showers",
        82 => "Violent rain showers",
        85 => "Slight snow showers",
        86 => "Heavy snow showers",
        95 => "Thunderstorm",
        96 => "Thunderstorm with slight hail",
        99 => "Thunderstorm with heavy hail",
        _ => "Unknown",
    }
}
