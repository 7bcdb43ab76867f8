//! Error types for the weatherdash backend
//!
//! Every failure a request can hit maps to exactly one variant; the HTTP
//! layer turns each variant into a distinct status code and user-facing
//! message. No request failure is fatal to the process.

use std::time::Duration;

use thiserror::Error;

/// Main error type for the weatherdash backend
#[derive(Error, Debug)]
pub enum WeatherError {
    /// The location string matched no known place
    #[error("no place matches '{query}'")]
    NotFound { query: String },

    /// Several equally-plausible places match the location string
    #[error("location '{query}' is ambiguous ({} candidates)", candidates.len())]
    AmbiguousLocation {
        query: String,
        candidates: Vec<String>,
    },

    /// The request was rejected before or by the upstream service; not retried
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    /// Upstream rate limit exhausted the retry budget
    #[error("rate limited by upstream service")]
    RateLimited { retry_after: Option<Duration> },

    /// The per-attempt timeout elapsed; the in-flight attempt was abandoned
    #[error("request to upstream service timed out")]
    Timeout,

    /// Upstream payload violated the expected contract; never retried
    #[error("malformed upstream response: {message}")]
    MalformedResponse { message: String },

    /// Transient failures persisted past the retry budget
    #[error("upstream service unavailable after {attempts} attempts: {message}")]
    UpstreamUnavailable { attempts: u32, message: String },

    /// Configuration-related errors
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl WeatherError {
    /// Create a new not-found error
    pub fn not_found<S: Into<String>>(query: S) -> Self {
        Self::NotFound {
            query: query.into(),
        }
    }

    /// Create a new ambiguous-location error
    pub fn ambiguous<S: Into<String>>(query: S, candidates: Vec<String>) -> Self {
        Self::AmbiguousLocation {
            query: query.into(),
            candidates,
        }
    }

    /// Create a new invalid-request error
    pub fn invalid_request<S: Into<String>>(message: S) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Create a new malformed-response error
    pub fn malformed<S: Into<String>>(message: S) -> Self {
        Self::MalformedResponse {
            message: message.into(),
        }
    }

    /// Create a new upstream-unavailable error
    pub fn upstream<S: Into<String>>(attempts: u32, message: S) -> Self {
        Self::UpstreamUnavailable {
            attempts,
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            WeatherError::NotFound { query } => {
                format!("No location found for '{query}'. Check the spelling and try again.")
            }
            WeatherError::AmbiguousLocation { query, candidates } => {
                format!(
                    "'{query}' matches several places ({}). Add a region or country to narrow it down.",
                    candidates.join("; ")
                )
            }
            WeatherError::InvalidRequest { message } => {
                format!("Invalid request: {message}")
            }
            WeatherError::RateLimited { retry_after } => match retry_after {
                Some(wait) => format!(
                    "The weather service is rate limiting requests. Try again in {} seconds.",
                    wait.as_secs()
                ),
                None => {
                    "The weather service is rate limiting requests. Try again shortly.".to_string()
                }
            },
            WeatherError::Timeout => {
                "The weather service took too long to respond. Try again.".to_string()
            }
            WeatherError::MalformedResponse { .. } => {
                "The weather service returned data we could not understand.".to_string()
            }
            WeatherError::UpstreamUnavailable { .. } => {
                "The weather service is currently unavailable. Try again later.".to_string()
            }
            WeatherError::Config { .. } => {
                "Server configuration error. Check the config file.".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let not_found = WeatherError::not_found("atlantis");
        assert!(matches!(not_found, WeatherError::NotFound { .. }));

        let invalid = WeatherError::invalid_request("start date after end date");
        assert!(matches!(invalid, WeatherError::InvalidRequest { .. }));

        let malformed = WeatherError::malformed("temperature missing");
        assert!(matches!(malformed, WeatherError::MalformedResponse { .. }));
    }

    #[test]
    fn test_user_messages_are_distinct_per_kind() {
        let errors = [
            WeatherError::not_found("x"),
            WeatherError::ambiguous("x", vec!["a".into(), "b".into()]),
            WeatherError::invalid_request("x"),
            WeatherError::RateLimited { retry_after: None },
            WeatherError::Timeout,
            WeatherError::malformed("x"),
            WeatherError::upstream(3, "x"),
            WeatherError::config("x"),
        ];
        let messages: Vec<String> = errors.iter().map(WeatherError::user_message).collect();
        for (i, a) in messages.iter().enumerate() {
            for b in messages.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_rate_limited_message_carries_hint() {
        let err = WeatherError::RateLimited {
            retry_after: Some(Duration::from_secs(30)),
        };
        assert!(err.user_message().contains("30 seconds"));
    }
}
