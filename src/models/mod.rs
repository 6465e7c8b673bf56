//! Core data models for incident alerting.

pub mod coordinate;
pub mod incident;

pub use coordinate::{Coordinate, EncodedPath};
pub use incident::{IncidentRecord, NewIncident, ProximityMatch, Severity, UNKNOWN_INTERSECTION};
