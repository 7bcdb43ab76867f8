//! Weatherdash - weather dashboard backend
//!
//! This library provides the data access layer behind the dashboard:
//! location resolution, resilient upstream weather fetching, payload
//! normalization and query caching, plus the HTTP boundary the frontend
//! talks to.

pub mod api;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod geocode;
pub mod models;
pub mod normalize;
pub mod service;
pub mod web;

// Re-export core types for public API
pub use cache::{Cache, CacheKey, CachedValue, QueryKind};
pub use client::WeatherClient;
pub use config::DashboardConfig;
pub use error::WeatherError;
pub use geocode::LocationResolver;
pub use models::{CurrentConditions, HistoricalSeries, Location, Observation, SourceUnits};
pub use service::WeatherService;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, WeatherError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
