//! Geographic coordinates and encoded paths.

use geo::Point;
use serde::{Deserialize, Serialize};

use crate::error::AlertError;

/// Geographic point in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// Create a coordinate, rejecting non-finite or out-of-range values.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, AlertError> {
        let coord = Self {
            latitude,
            longitude,
        };
        coord.validate()?;
        Ok(coord)
    }

    /// Build a coordinate from optional request fields.
    pub fn from_parts(latitude: Option<f64>, longitude: Option<f64>) -> Result<Self, AlertError> {
        match (latitude, longitude) {
            (Some(lat), Some(lon)) => Self::new(lat, lon),
            (None, _) => Err(AlertError::InvalidCoordinate(
                "latitude is missing".to_string(),
            )),
            (_, None) => Err(AlertError::InvalidCoordinate(
                "longitude is missing".to_string(),
            )),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    pub fn validate(&self) -> Result<(), AlertError> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(AlertError::InvalidCoordinate(format!(
                "({}, {}) is outside [-90, 90] x [-180, 180]",
                self.latitude, self.longitude
            )))
        }
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.5},{:.5}", self.latitude, self.longitude)
    }
}

impl From<Coordinate> for Point<f64> {
    fn from(coord: Coordinate) -> Self {
        Point::new(coord.longitude, coord.latitude)
    }
}

/// Compressed polyline as produced by the directions provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncodedPath(String);

impl EncodedPath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for EncodedPath {
    fn from(path: String) -> Self {
        Self(path)
    }
}
