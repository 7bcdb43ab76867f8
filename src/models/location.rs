//! Location model for geographic coordinates and metadata

use serde::{Deserialize, Serialize};

/// A resolved location. Once produced by the resolver the coordinates are
/// immutable for the session; a new user input triggers a fresh resolution.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Location {
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
    /// Display name (city, region, etc.)
    pub name: String,
    /// Country name, when the geocoder reports one
    pub country: Option<String>,
}

impl Location {
    /// Create a new location
    #[must_use]
    pub fn new(latitude: f64, longitude: f64, name: String) -> Self {
        Self {
            latitude,
            longitude,
            name,
            country: None,
        }
    }

    /// Create location with country
    #[must_use]
    pub fn with_country(latitude: f64, longitude: f64, name: String, country: String) -> Self {
        Self {
            latitude,
            longitude,
            name,
            country: Some(country),
        }
    }

    /// Format location as coordinates string
    #[must_use]
    pub fn format_coordinates(&self) -> String {
        format!("{:.4}, {:.4}", self.latitude, self.longitude)
    }

    /// Round coordinates for cache key generation. Two decimal places
    /// (~1 km) is enough to share cached weather between nearby queries.
    #[must_use]
    pub fn rounded_coordinates(&self, precision: u32) -> (f64, f64) {
        let multiplier = 10_f64.powi(i32::try_from(precision).unwrap_or(4));
        let lat = (self.latitude * multiplier).round() / multiplier;
        let lon = (self.longitude * multiplier).round() / multiplier;
        (lat, lon)
    }

    /// Stable identifier used as the location part of weather cache keys.
    #[must_use]
    pub fn coordinate_key(&self) -> String {
        let (lat, lon) = self.rounded_coordinates(2);
        format!("{lat:.2}:{lon:.2}")
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.country {
            Some(country) => write!(f, "{}, {}", self.name, country),
            None => write!(f, "{}", self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_key_rounds_to_two_places() {
        let location = Location::new(46.8182, 8.2275, "Interlaken".to_string());
        assert_eq!(location.coordinate_key(), "46.82:8.23");
    }

    #[test]
    fn test_rounded_coordinates() {
        let location = Location::new(46.818_234, 8.227_456, "Test".to_string());
        let (lat, lon) = location.rounded_coordinates(2);
        assert_eq!(lat, 46.82);
        assert_eq!(lon, 8.23);
    }

    #[test]
    fn test_display_includes_country() {
        let location =
            Location::with_country(48.8566, 2.3522, "Paris".to_string(), "France".to_string());
        assert_eq!(location.to_string(), "Paris, France");
    }
}
