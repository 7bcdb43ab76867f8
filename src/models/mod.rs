//! Data models for the weatherdash backend
//!
//! Core domain models organized by concern:
//! - Location: geographic coordinates and metadata
//! - Conditions: current weather snapshot
//! - History: ordered historical observation series

pub mod conditions;
pub mod history;
pub mod location;

// Re-export all public types for convenient access
pub use conditions::{CurrentConditions, SourceUnits};
pub use history::{HistoricalSeries, Observation};
pub use location::Location;
