//! Weather data access service
//!
//! Wires the resolver, cache and client together behind the two operations
//! the dashboard needs. Every query goes through the cache: identical keys
//! within the TTL never reach the network, and the per-key single-flight
//! guard keeps concurrent identical requests down to one upstream call.

use std::time::Duration;

use chrono::{NaiveDate, Utc};
use rand::RngExt;
use tracing::{debug, info};

use crate::cache::{Cache, CacheKey, CachedValue};
use crate::client::WeatherClient;
use crate::config::DashboardConfig;
use crate::error::WeatherError;
use crate::geocode::{self, LocationResolver};
use crate::models::{CurrentConditions, HistoricalSeries, Location};

/// Weather data access layer: resolve, fetch, normalize, memoize.
#[derive(Debug)]
pub struct WeatherService {
    resolver: LocationResolver,
    client: WeatherClient,
    cache: Cache,
    ttl: Duration,
}

impl WeatherService {
    /// Build the service from configuration.
    pub fn new(config: &DashboardConfig) -> Result<Self, WeatherError> {
        Ok(Self {
            resolver: LocationResolver::new(&config.api)?,
            client: WeatherClient::new(&config.api)?,
            cache: Cache::new(config.cache.max_entries),
            ttl: Duration::from_secs(config.cache.ttl_seconds),
        })
    }

    /// Resolve a free-form location input, memoized by its normalized form.
    pub async fn resolve(&self, input: &str) -> Result<Location, WeatherError> {
        let normalized = geocode::normalize_query(input);
        if normalized.is_empty() {
            return Err(WeatherError::invalid_request("location cannot be empty"));
        }

        let key = CacheKey::resolve(&normalized);
        if let Some(CachedValue::Location(location)) = self.cache.get(&key) {
            return Ok(location);
        }

        let _flight = self.cache.begin_flight(&key).await;
        if let Some(CachedValue::Location(location)) = self.cache.get(&key) {
            return Ok(location);
        }

        let location = self.resolver.resolve(input).await?;
        self.cache.put(
            key,
            CachedValue::Location(location.clone()),
            self.ttl,
        );
        Ok(location)
    }

    /// Current conditions for a location input.
    pub async fn current(
        &self,
        input: &str,
    ) -> Result<(Location, CurrentConditions), WeatherError> {
        let location = self.resolve(input).await?;
        let key = CacheKey::current(&location);

        if let Some(conditions) = self.fresh_cached_current(&key) {
            return Ok((location, conditions));
        }

        let _flight = self.cache.begin_flight(&key).await;
        if let Some(conditions) = self.fresh_cached_current(&key) {
            return Ok((location, conditions));
        }

        info!(location = %location, "fetching current conditions");
        let conditions = self.client.fetch_current(&location).await?;
        self.cache.put(
            key,
            CachedValue::Current(conditions.clone()),
            self.ttl,
        );
        Ok((location, conditions))
    }

    /// Historical observations for a location input and date range.
    pub async fn history(
        &self,
        input: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<(Location, HistoricalSeries), WeatherError> {
        // Reject an inverted range before any network call, including
        // resolution.
        if start > end {
            return Err(WeatherError::invalid_request(format!(
                "start date {start} is after end date {end}"
            )));
        }

        let location = self.resolve(input).await?;
        let key = CacheKey::history(&location, start, end);

        if let Some(CachedValue::History(series)) = self.cache.get(&key) {
            return Ok((location, series));
        }

        let _flight = self.cache.begin_flight(&key).await;
        if let Some(CachedValue::History(series)) = self.cache.get(&key) {
            return Ok((location, series));
        }

        info!(location = %location, %start, %end, "fetching historical observations");
        let series = self.client.fetch_history(&location, start, end).await?;
        self.cache.put(
            key,
            CachedValue::History(series.clone()),
            self.jittered_ttl(),
        );
        Ok((location, series))
    }

    /// Cached current conditions, unless the observation itself has drifted
    /// past the freshness window (then the entry is dropped and re-fetched).
    fn fresh_cached_current(&self, key: &CacheKey) -> Option<CurrentConditions> {
        match self.cache.get(key) {
            Some(CachedValue::Current(conditions)) => {
                if conditions.is_fresh(self.ttl, Utc::now()) {
                    Some(conditions)
                } else {
                    debug!(?key, "cached observation stale, re-fetching");
                    self.cache.invalidate(key);
                    None
                }
            }
            _ => None,
        }
    }

    /// History entries get a jittered TTL so synchronized dashboards don't
    /// re-fetch in lockstep.
    fn jittered_ttl(&self) -> Duration {
        let jitter: f32 = rand::rng().random_range(0.9..1.1);
        Duration::from_secs_f32(self.ttl.as_secs_f32() * jitter)
    }
}
