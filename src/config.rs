//! Configuration management for the weatherdash backend
//!
//! Handles loading configuration from files and environment variables,
//! and provides validation for all configuration settings.

use crate::WeatherError;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure for the weatherdash backend
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DashboardConfig {
    /// Upstream API configuration
    #[serde(default)]
    pub api: ApiConfig,
    /// Cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
}

/// Upstream API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL for current-conditions requests
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Base URL for historical observations
    #[serde(default = "default_archive_url")]
    pub archive_url: String,
    /// Base URL for geocoding requests
    #[serde(default = "default_geocoding_url")]
    pub geocoding_url: String,
    /// Per-attempt request timeout in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Retry budget for transient failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base delay for exponential backoff in milliseconds
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    /// Backoff delay cap in milliseconds
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
    /// Cooldown after a 429 without a Retry-After hint, in milliseconds
    #[serde(default = "default_rate_limit_cooldown_ms")]
    pub rate_limit_cooldown_ms: u64,
    /// How far back the upstream archive is queried, in days
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

/// Cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Entry time-to-live in seconds; doubles as the current-conditions
    /// freshness window
    #[serde(default = "default_cache_ttl_seconds")]
    pub ttl_seconds: u64,
    /// Maximum number of cached entries before LRU eviction
    #[serde(default = "default_cache_max_entries")]
    pub max_entries: usize,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Port to listen on
    #[serde(default = "default_server_port")]
    pub port: u16,
}

// Default value functions
fn default_base_url() -> String {
    "https://api.open-meteo.com/v1".to_string()
}

fn default_archive_url() -> String {
    "https://archive-api.open-meteo.com/v1".to_string()
}

fn default_geocoding_url() -> String {
    "https://geocoding-api.open-meteo.com/v1".to_string()
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    500
}

fn default_retry_max_delay_ms() -> u64 {
    5_000
}

fn default_rate_limit_cooldown_ms() -> u64 {
    5_000
}

fn default_retention_days() -> u32 {
    730
}

fn default_cache_ttl_seconds() -> u64 {
    900
}

fn default_cache_max_entries() -> usize {
    256
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_server_port() -> u16 {
    8080
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            archive_url: default_archive_url(),
            geocoding_url: default_geocoding_url(),
            request_timeout_ms: default_request_timeout_ms(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
            rate_limit_cooldown_ms: default_rate_limit_cooldown_ms(),
            retention_days: default_retention_days(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_cache_ttl_seconds(),
            max_entries: default_cache_max_entries(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_server_port(),
        }
    }
}

impl DashboardConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // Environment overrides with WEATHERDASH_ prefix,
        // e.g. WEATHERDASH_SERVER__PORT=9000
        builder = builder.add_source(
            Environment::with_prefix("WEATHERDASH")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let config: DashboardConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("weatherdash").join("config.toml"))
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.api.request_timeout_ms == 0 || self.api.request_timeout_ms > 300_000 {
            return Err(WeatherError::config(
                "Request timeout must be between 1 ms and 300000 ms",
            )
            .into());
        }

        if self.api.max_retries > 10 {
            return Err(WeatherError::config("Retry budget cannot exceed 10").into());
        }

        if self.api.retry_base_delay_ms > self.api.retry_max_delay_ms {
            return Err(
                WeatherError::config("Backoff base delay cannot exceed the delay cap").into(),
            );
        }

        if self.api.retention_days == 0 {
            return Err(WeatherError::config("Retention window must cover at least one day").into());
        }

        if self.cache.ttl_seconds == 0 || self.cache.ttl_seconds > 604_800 {
            return Err(
                WeatherError::config("Cache TTL must be between 1 second and 1 week").into(),
            );
        }

        if self.cache.max_entries == 0 {
            return Err(WeatherError::config("Cache must hold at least one entry").into());
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(WeatherError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(WeatherError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        for (name, url) in [
            ("api.base_url", &self.api.base_url),
            ("api.archive_url", &self.api.archive_url),
            ("api.geocoding_url", &self.api.geocoding_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(WeatherError::config(format!(
                    "{name} must be a valid HTTP or HTTPS URL"
                ))
                .into());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DashboardConfig::default();
        assert_eq!(config.api.base_url, "https://api.open-meteo.com/v1");
        assert_eq!(config.api.max_retries, 3);
        assert_eq!(config.api.retry_base_delay_ms, 500);
        assert_eq!(config.cache.ttl_seconds, 900);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.server.port, 8080);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_invalid_log_level() {
        let mut config = DashboardConfig::default();
        config.logging.level = "verbose".to_string();
        let result = config.validate();
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Invalid log level")
        );
    }

    #[test]
    fn test_config_validation_numeric_ranges() {
        let mut config = DashboardConfig::default();
        config.api.max_retries = 50;
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Retry budget"));
    }

    #[test]
    fn test_config_validation_backoff_ordering() {
        let mut config = DashboardConfig::default();
        config.api.retry_base_delay_ms = 10_000;
        config.api.retry_max_delay_ms = 1_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_bad_url() {
        let mut config = DashboardConfig::default();
        config.api.geocoding_url = "ftp://example.com".to_string();
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("geocoding_url"));
    }

    #[test]
    fn test_config_path_generation() {
        let path = DashboardConfig::get_config_path();
        assert!(path.is_some());
        let path = path.unwrap();
        assert!(path.to_string_lossy().contains("weatherdash"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }
}
