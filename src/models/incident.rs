//! Incident records as stored in the record store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Coordinate;

/// Intersection name used when none is known.
pub const UNKNOWN_INTERSECTION: &str = "Unknown";

/// Categorical incident rating
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    #[default]
    Low,
    Moderate,
    High,
}

impl Severity {
    /// Parse a rating label, ignoring case and surrounding whitespace.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Severity::Low),
            "moderate" => Some(Severity::Moderate),
            "high" => Some(Severity::High),
            _ => None,
        }
    }

    /// Ratings that trigger point-check alerts.
    pub fn alerting() -> [Severity; 2] {
        [Severity::Moderate, Severity::High]
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Low => write!(f, "Low"),
            Severity::Moderate => write!(f, "Moderate"),
            Severity::High => write!(f, "High"),
        }
    }
}

fn unknown_intersection() -> String {
    UNKNOWN_INTERSECTION.to_string()
}

/// A reported incident.
///
/// Field names on the wire follow the incident dataset columns so stored
/// documents and API responses stay compatible with existing clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentRecord {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(rename = "Latitude", alias = "latitude")]
    pub latitude: f64,

    #[serde(rename = "Longitude", alias = "longitude")]
    pub longitude: f64,

    #[serde(rename = "rating", default)]
    pub severity: Severity,

    #[serde(rename = "crime_rate", default)]
    pub rate: f64,

    #[serde(rename = "NearestIntersectionLocation", default = "unknown_intersection")]
    pub nearest_intersection: String,

    /// Free-text description for user-submitted reports
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reported_at: Option<DateTime<Utc>>,
}

impl IncidentRecord {
    /// Create a record with dataset defaults for the optional fields
    pub fn new(id: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            id: id.into(),
            latitude,
            longitude,
            severity: Severity::default(),
            rate: 0.0,
            nearest_intersection: unknown_intersection(),
            description: None,
            reported_at: None,
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_intersection(mut self, name: impl Into<String>) -> Self {
        self.nearest_intersection = name.into();
        self
    }

    pub fn with_rate(mut self, rate: f64) -> Self {
        self.rate = rate;
        self
    }

    pub fn position(&self) -> Coordinate {
        Coordinate {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }

    pub fn has_known_intersection(&self) -> bool {
        !self.nearest_intersection.is_empty() && self.nearest_intersection != UNKNOWN_INTERSECTION
    }
}

/// An incident about to be inserted; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewIncident {
    pub position: Coordinate,
    pub severity: Severity,
    pub rate: f64,
    pub nearest_intersection: String,
    pub description: Option<String>,
}

impl NewIncident {
    pub fn into_record(self, id: String) -> IncidentRecord {
        IncidentRecord {
            id,
            latitude: self.position.latitude,
            longitude: self.position.longitude,
            severity: self.severity,
            rate: self.rate,
            nearest_intersection: self.nearest_intersection,
            description: self.description,
            reported_at: Some(Utc::now()),
        }
    }
}

/// An incident within the detection radius of a query point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProximityMatch {
    #[serde(flatten)]
    pub record: IncidentRecord,

    /// Great-circle distance in kilometres
    #[serde(rename = "distance")]
    pub distance_km: f64,
}
