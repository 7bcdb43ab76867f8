//! HTTP API for the dashboard frontend
//!
//! Two endpoints: current conditions and a date-ranged history query whose
//! response carries chart-ready columnar series. Each error kind maps to a
//! distinct status code and user-facing message.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::WeatherError;
use crate::models::{CurrentConditions, HistoricalSeries, Location, SourceUnits};
use crate::service::WeatherService;

#[derive(Serialize)]
pub struct ApiLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub name: String,
    pub country: Option<String>,
}

impl From<&Location> for ApiLocation {
    fn from(location: &Location) -> Self {
        Self {
            latitude: location.latitude,
            longitude: location.longitude,
            name: location.name.clone(),
            country: location.country.clone(),
        }
    }
}

#[derive(Serialize)]
pub struct ApiConditions {
    pub timestamp: DateTime<Utc>,
    pub temperature_c: f32,
    pub humidity_pct: Option<f32>,
    pub wind_speed_kmh: Option<f32>,
    pub condition: String,
    pub condition_code: Option<u8>,
    pub source_units: SourceUnits,
}

impl From<&CurrentConditions> for ApiConditions {
    fn from(conditions: &CurrentConditions) -> Self {
        Self {
            timestamp: conditions.timestamp,
            temperature_c: conditions.temperature,
            humidity_pct: conditions.humidity,
            wind_speed_kmh: conditions.wind_speed,
            condition: conditions.condition.clone(),
            condition_code: conditions.condition_code,
            source_units: conditions.units.clone(),
        }
    }
}

/// Columnar reshape of a historical series for the chart.
#[derive(Serialize)]
pub struct ChartSeries {
    pub timestamps: Vec<DateTime<Utc>>,
    pub temperature: Vec<f32>,
    pub humidity: Vec<Option<f32>>,
    pub wind_speed: Vec<Option<f32>>,
}

impl From<&HistoricalSeries> for ChartSeries {
    fn from(series: &HistoricalSeries) -> Self {
        let mut chart = Self {
            timestamps: Vec::with_capacity(series.len()),
            temperature: Vec::with_capacity(series.len()),
            humidity: Vec::with_capacity(series.len()),
            wind_speed: Vec::with_capacity(series.len()),
        };
        for obs in &series.observations {
            chart.timestamps.push(obs.timestamp);
            chart.temperature.push(obs.temperature);
            chart.humidity.push(obs.humidity);
            chart.wind_speed.push(obs.wind_speed);
        }
        chart
    }
}

#[derive(Serialize)]
pub struct CurrentResponse {
    pub location: ApiLocation,
    pub conditions: ApiConditions,
}

#[derive(Serialize)]
pub struct HistoryResponse {
    pub location: ApiLocation,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub count: usize,
    pub source_units: SourceUnits,
    pub chart: ChartSeries,
}

#[derive(Deserialize)]
pub struct CurrentParams {
    pub location: String,
}

#[derive(Deserialize)]
pub struct HistoryParams {
    pub location: String,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

/// Error wrapper so handlers can use `?` on service calls.
pub struct ApiError(WeatherError);

impl From<WeatherError> for ApiError {
    fn from(err: WeatherError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: error_kind(&self.0),
            message: self.0.user_message(),
        });
        let mut response = (status_for(&self.0), body).into_response();

        if let WeatherError::RateLimited {
            retry_after: Some(wait),
        } = &self.0
        {
            if let Ok(value) = HeaderValue::from_str(&wait.as_secs().to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }

        response
    }
}

fn status_for(err: &WeatherError) -> StatusCode {
    match err {
        WeatherError::NotFound { .. } => StatusCode::NOT_FOUND,
        WeatherError::AmbiguousLocation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        WeatherError::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
        WeatherError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        WeatherError::Timeout => StatusCode::GATEWAY_TIMEOUT,
        WeatherError::MalformedResponse { .. } => StatusCode::BAD_GATEWAY,
        WeatherError::UpstreamUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        WeatherError::Config { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_kind(err: &WeatherError) -> &'static str {
    match err {
        WeatherError::NotFound { .. } => "not_found",
        WeatherError::AmbiguousLocation { .. } => "ambiguous_location",
        WeatherError::InvalidRequest { .. } => "invalid_request",
        WeatherError::RateLimited { .. } => "rate_limited",
        WeatherError::Timeout => "timeout",
        WeatherError::MalformedResponse { .. } => "malformed_response",
        WeatherError::UpstreamUnavailable { .. } => "upstream_unavailable",
        WeatherError::Config { .. } => "config",
    }
}

/// Default history range when the caller omits dates: the last full week.
fn default_range(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let end = today.checked_sub_days(Days::new(1)).unwrap_or(today);
    let start = end.checked_sub_days(Days::new(6)).unwrap_or(end);
    (start, end)
}

pub fn router(service: Arc<WeatherService>) -> Router {
    Router::new()
        .route("/current", get(get_current))
        .route("/history", get(get_history))
        .with_state(service)
}

async fn get_current(
    State(service): State<Arc<WeatherService>>,
    Query(params): Query<CurrentParams>,
) -> Result<Json<CurrentResponse>, ApiError> {
    let (location, conditions) = service.current(&params.location).await?;
    Ok(Json(CurrentResponse {
        location: (&location).into(),
        conditions: (&conditions).into(),
    }))
}

async fn get_history(
    State(service): State<Arc<WeatherService>>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let (default_start, default_end) = default_range(Utc::now().date_naive());
    let start = params.start.unwrap_or(default_start);
    let end = params.end.unwrap_or(default_end);

    let (location, series) = service.history(&params.location, start, end).await?;
    Ok(Json(HistoryResponse {
        location: (&location).into(),
        start: series.start,
        end: series.end,
        count: series.len(),
        source_units: series.units.clone(),
        chart: (&series).into(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Observation;
    use chrono::TimeZone;

    #[test]
    fn test_each_error_kind_has_a_distinct_status_or_label() {
        let errors = [
            WeatherError::not_found("x"),
            WeatherError::ambiguous("x", vec![]),
            WeatherError::invalid_request("x"),
            WeatherError::RateLimited { retry_after: None },
            WeatherError::Timeout,
            WeatherError::malformed("x"),
            WeatherError::upstream(1, "x"),
            WeatherError::config("x"),
        ];
        let labels: Vec<&str> = errors.iter().map(error_kind).collect();
        let mut deduped = labels.clone();
        deduped.sort_unstable();
        deduped.dedup();
        assert_eq!(labels.len(), deduped.len());
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&WeatherError::not_found("x")),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&WeatherError::RateLimited { retry_after: None }),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(status_for(&WeatherError::Timeout), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(
            status_for(&WeatherError::malformed("x")),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_chart_reshape_keeps_columns_aligned() {
        let observations = vec![
            Observation {
                timestamp: Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap(),
                temperature: 12.0,
                humidity: Some(60.0),
                wind_speed: None,
            },
            Observation {
                timestamp: Utc.with_ymd_and_hms(2025, 6, 1, 1, 0, 0).unwrap(),
                temperature: 11.5,
                humidity: None,
                wind_speed: Some(9.0),
            },
        ];
        let series = HistoricalSeries {
            start: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            observations,
            units: SourceUnits::metric(),
        };

        let chart = ChartSeries::from(&series);
        assert_eq!(chart.timestamps.len(), 2);
        assert_eq!(chart.temperature, vec![12.0, 11.5]);
        assert_eq!(chart.humidity, vec![Some(60.0), None]);
        assert_eq!(chart.wind_speed, vec![None, Some(9.0)]);
    }

    #[test]
    fn test_default_range_is_last_full_week() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        let (start, end) = default_range(today);
        assert_eq!(end, NaiveDate::from_ymd_opt(2025, 6, 14).unwrap());
        assert_eq!(start, NaiveDate::from_ymd_opt(2025, 6, 8).unwrap());
    }
}
