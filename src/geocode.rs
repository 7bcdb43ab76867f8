//! Location resolution
//!
//! Resolves free-form location input (city name or postal code) to
//! coordinates via the Open-Meteo geocoding API. The resolver performs a
//! single attempt per call; callers memoize successful resolutions in the
//! cache keyed by the normalized input text, so repeated lookups of the
//! same place never hit the network twice.

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::config::ApiConfig;
use crate::error::WeatherError;
use crate::models::Location;

/// Case- and whitespace-insensitive form of a location input, used as the
/// resolution cache key.
#[must_use]
pub fn normalize_query(input: &str) -> String {
    input
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Geocoding response from the upstream service
#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    results: Option<Vec<GeocodingResult>>,
}

#[derive(Debug, Deserialize)]
struct GeocodingResult {
    name: String,
    latitude: f64,
    longitude: f64,
    country: Option<String>,
    admin1: Option<String>,
    population: Option<u64>,
}

impl GeocodingResult {
    /// Display name for disambiguation messages, e.g. "Paris, Texas, United States".
    fn display_name(&self) -> String {
        let mut parts = vec![self.name.clone()];
        if let Some(admin1) = &self.admin1 {
            parts.push(admin1.clone());
        }
        if let Some(country) = &self.country {
            parts.push(country.clone());
        }
        parts.join(", ")
    }
}

impl From<GeocodingResult> for Location {
    fn from(result: GeocodingResult) -> Self {
        Location {
            latitude: result.latitude,
            longitude: result.longitude,
            name: result.name,
            country: result.country,
        }
    }
}

/// Service for resolving location inputs
#[derive(Debug)]
pub struct LocationResolver {
    client: Client,
    base_url: String,
}

impl LocationResolver {
    /// Create a new resolver against the configured geocoding endpoint.
    pub fn new(config: &ApiConfig) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .user_agent(concat!("weatherdash/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| WeatherError::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.geocoding_url.clone(),
        })
    }

    /// Resolve a free-form location string to coordinates.
    ///
    /// Fails with `NotFound` when nothing matches and `AmbiguousLocation`
    /// when several equally-plausible places do.
    pub async fn resolve(&self, input: &str) -> Result<Location, WeatherError> {
        let query = input.trim();
        if query.is_empty() {
            return Err(WeatherError::invalid_request("location cannot be empty"));
        }

        debug!(query, "geocoding location input");

        let url = format!(
            "{}/search?name={}&count=5&language=en&format=json",
            self.base_url,
            urlencoding::encode(query)
        );

        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                WeatherError::Timeout
            } else {
                WeatherError::upstream(1, format!("geocoding request failed: {e}"))
            }
        })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(WeatherError::RateLimited { retry_after: None });
        }
        if status.is_server_error() {
            return Err(WeatherError::upstream(1, format!("HTTP {status}")));
        }
        if !status.is_success() {
            return Err(WeatherError::invalid_request(format!(
                "geocoder rejected request: HTTP {status}"
            )));
        }

        let geocoding: GeocodingResponse = response
            .json()
            .await
            .map_err(|e| WeatherError::malformed(format!("geocoding response: {e}")))?;

        let results = geocoding.results.unwrap_or_default();
        let location = classify(query, results)?;

        debug!(
            name = %location.name,
            coordinates = %location.format_coordinates(),
            "resolved location"
        );

        Ok(location)
    }
}

/// Pick the winning result, or classify the failure.
///
/// The upstream ranks results by relevance. Two results are "equally
/// plausible" when they carry the same name and the top one does not
/// dominate by population (both unknown, top unknown, or less than twice
/// the runner-up).
fn classify(query: &str, results: Vec<GeocodingResult>) -> Result<Location, WeatherError> {
    let mut results = results.into_iter();
    let Some(top) = results.next() else {
        return Err(WeatherError::not_found(query));
    };

    let rivals: Vec<GeocodingResult> = results
        .filter(|r| r.name.eq_ignore_ascii_case(&top.name) && !dominates(&top, r))
        .collect();

    if rivals.is_empty() {
        return Ok(top.into());
    }

    let mut candidates = vec![top.display_name()];
    candidates.extend(rivals.iter().map(GeocodingResult::display_name));
    Err(WeatherError::ambiguous(query, candidates))
}

/// Whether the top-ranked result clearly outweighs a same-named rival.
fn dominates(top: &GeocodingResult, rival: &GeocodingResult) -> bool {
    match (top.population, rival.population) {
        (Some(top_pop), Some(rival_pop)) => top_pop >= rival_pop.saturating_mul(2),
        (Some(_), None) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(name: &str, admin1: &str, population: Option<u64>) -> GeocodingResult {
        GeocodingResult {
            name: name.to_string(),
            latitude: 48.85,
            longitude: 2.35,
            country: Some("Testland".to_string()),
            admin1: Some(admin1.to_string()),
            population,
        }
    }

    #[test]
    fn test_normalize_query() {
        assert_eq!(normalize_query("  Salt   Lake City "), "salt lake city");
        assert_eq!(normalize_query("BERLIN"), "berlin");
        assert_eq!(normalize_query("berlin"), normalize_query("  Berlin  "));
    }

    #[test]
    fn test_classify_empty_results_is_not_found() {
        let err = classify("atlantis", vec![]).expect_err("no results must not resolve");
        assert!(matches!(err, WeatherError::NotFound { .. }));
    }

    #[test]
    fn test_classify_single_result_wins() {
        let location =
            classify("paris", vec![result("Paris", "Île-de-France", Some(2_100_000))])
                .expect("single result should resolve");
        assert_eq!(location.name, "Paris");
    }

    #[test]
    fn test_classify_dominant_population_wins() {
        let location = classify(
            "paris",
            vec![
                result("Paris", "Île-de-France", Some(2_100_000)),
                result("Paris", "Texas", Some(25_000)),
            ],
        )
        .expect("dominant result should resolve");
        assert_eq!(location.name, "Paris");
    }

    #[test]
    fn test_classify_close_populations_are_ambiguous() {
        let err = classify(
            "springfield",
            vec![
                result("Springfield", "Illinois", Some(110_000)),
                result("Springfield", "Missouri", Some(160_000)),
            ],
        )
        .expect_err("near-equal rivals must be ambiguous");
        match err {
            WeatherError::AmbiguousLocation { candidates, .. } => {
                assert_eq!(candidates.len(), 2);
                assert!(candidates[0].contains("Illinois"));
            }
            other => panic!("expected AmbiguousLocation, got {other:?}"),
        }
    }

    #[test]
    fn test_classify_unknown_populations_are_ambiguous() {
        let err = classify(
            "springfield",
            vec![
                result("Springfield", "Illinois", None),
                result("Springfield", "Missouri", None),
            ],
        )
        .expect_err("unknown populations must be ambiguous");
        assert!(matches!(err, WeatherError::AmbiguousLocation { .. }));
    }

    #[test]
    fn test_classify_differently_named_results_are_not_rivals() {
        let location = classify(
            "gornau",
            vec![
                result("Gornau", "Saxony", None),
                result("Gornau/Erzgebirge", "Saxony", None),
            ],
        )
        .expect("different names should not be ambiguous");
        assert_eq!(location.name, "Gornau");
    }
}
