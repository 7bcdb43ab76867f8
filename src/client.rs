//! Weather client
//!
//! HTTP client for the upstream weather service: current conditions from the
//! forecast endpoint, historical observations from the archive endpoint.
//!
//! Failure policy: transient network failures and 5xx responses are retried
//! with exponential backoff; a 429 triggers a longer cooldown honoring the
//! `Retry-After` hint; other 4xx responses are rejected without retry; a
//! per-attempt timeout abandons the request. Malformed payloads are never
//! retried.

use std::time::Duration;

use chrono::{Days, NaiveDate, Utc};
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

use crate::config::ApiConfig;
use crate::error::WeatherError;
use crate::models::{CurrentConditions, HistoricalSeries, Location};
use crate::normalize;

const CURRENT_FIELDS: &str = "temperature_2m,relative_humidity_2m,wind_speed_10m,weather_code";
const HOURLY_FIELDS: &str = "temperature_2m,relative_humidity_2m,wind_speed_10m";

/// HTTP client for the upstream weather service.
#[derive(Debug)]
pub struct WeatherClient {
    client: Client,
    config: ApiConfig,
}

impl WeatherClient {
    /// Create a new client with the given configuration.
    pub fn new(config: &ApiConfig) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .user_agent(concat!("weatherdash/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| WeatherError::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// Fetch current conditions at a resolved location.
    pub async fn fetch_current(
        &self,
        location: &Location,
    ) -> Result<CurrentConditions, WeatherError> {
        validate_coordinates(location.latitude, location.longitude)?;

        let url = format!(
            "{}/forecast?latitude={}&longitude={}&current={}&timezone=UTC",
            self.config.base_url, location.latitude, location.longitude, CURRENT_FIELDS
        );

        let body = self.get_with_retry(&url).await?;
        let response: normalize::ForecastResponse = serde_json::from_str(&body)
            .map_err(|e| WeatherError::malformed(format!("forecast response: {e}")))?;

        normalize::current(&response)
    }

    /// Fetch hourly observations covering a date range.
    ///
    /// Rejects `start > end` before any network call; the range is clamped
    /// to the upstream retention window.
    pub async fn fetch_history(
        &self,
        location: &Location,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<HistoricalSeries, WeatherError> {
        validate_coordinates(location.latitude, location.longitude)?;

        let today = Utc::now().date_naive();
        let (start, end) = clamp_range(start, end, today, self.config.retention_days)?;

        let url = format!(
            "{}/archive?latitude={}&longitude={}&start_date={}&end_date={}&hourly={}&timezone=UTC",
            self.config.archive_url, location.latitude, location.longitude, start, end,
            HOURLY_FIELDS
        );

        let body = self.get_with_retry(&url).await?;
        let response: normalize::ArchiveResponse = serde_json::from_str(&body)
            .map_err(|e| WeatherError::malformed(format!("archive response: {e}")))?;

        normalize::history(&response, start, end)
    }

    /// Perform a GET with the configured retry policy and return the body.
    async fn get_with_retry(&self, url: &str) -> Result<String, WeatherError> {
        let max_attempts = self.config.max_retries.saturating_add(1);
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            debug!(url, attempt, "requesting upstream");

            match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        if attempt > 1 {
                            debug!(attempt, "request succeeded after retrying");
                        }
                        return response.text().await.map_err(|e| {
                            WeatherError::malformed(format!("failed to read body: {e}"))
                        });
                    }

                    if status == StatusCode::TOO_MANY_REQUESTS {
                        let hint = retry_after(&response);
                        if attempt >= max_attempts {
                            return Err(WeatherError::RateLimited { retry_after: hint });
                        }
                        let cooldown = hint.unwrap_or(Duration::from_millis(
                            self.config.rate_limit_cooldown_ms,
                        ));
                        warn!(attempt, ?cooldown, "rate limited, cooling down");
                        tokio::time::sleep(cooldown).await;
                        continue;
                    }

                    if status.is_server_error() {
                        if attempt >= max_attempts {
                            return Err(WeatherError::upstream(attempt, format!("HTTP {status}")));
                        }
                        let delay = self.backoff_delay(attempt);
                        warn!(attempt, %status, ?delay, "server error, backing off");
                        tokio::time::sleep(delay).await;
                        continue;
                    }

                    // Remaining 4xx are never retried
                    return Err(WeatherError::invalid_request(format!(
                        "upstream rejected request: HTTP {status}"
                    )));
                }
                Err(e) if e.is_timeout() => {
                    // Timeouts abandon the request; they never consume
                    // retry budget.
                    warn!(attempt, "request timed out");
                    return Err(WeatherError::Timeout);
                }
                Err(e) if e.is_connect() => {
                    if attempt >= max_attempts {
                        return Err(WeatherError::upstream(attempt, e.to_string()));
                    }
                    let delay = self.backoff_delay(attempt);
                    warn!(attempt, error = %e, ?delay, "connection error, backing off");
                    tokio::time::sleep(delay).await;
                    continue;
                }
                Err(e) => return Err(WeatherError::upstream(attempt, e.to_string())),
            }
        }
    }

    /// Exponential backoff delay after the given (1-based) failed attempt.
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
        let delay_ms = self
            .config
            .retry_base_delay_ms
            .saturating_mul(factor)
            .min(self.config.retry_max_delay_ms);
        Duration::from_millis(delay_ms)
    }
}

/// Clamp a requested range to the upstream retention window.
fn clamp_range(
    start: NaiveDate,
    end: NaiveDate,
    today: NaiveDate,
    retention_days: u32,
) -> Result<(NaiveDate, NaiveDate), WeatherError> {
    if start > end {
        return Err(WeatherError::invalid_request(format!(
            "start date {start} is after end date {end}"
        )));
    }

    let earliest = today
        .checked_sub_days(Days::new(u64::from(retention_days)))
        .unwrap_or(NaiveDate::MIN);

    let clamped_start = start.max(earliest);
    let clamped_end = end.min(today);

    if clamped_start > clamped_end {
        return Err(WeatherError::invalid_request(format!(
            "range {start}..{end} is outside the supported window ({earliest}..{today})"
        )));
    }

    Ok((clamped_start, clamped_end))
}

fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), WeatherError> {
    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return Err(WeatherError::invalid_request(format!(
            "coordinates out of range: ({latitude}, {longitude})"
        )));
    }
    Ok(())
}

/// Parse a Retry-After header given in seconds.
fn retry_after(response: &reqwest::Response) -> Option<Duration> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}
