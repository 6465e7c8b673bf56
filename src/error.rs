//! Error taxonomy shared by the proximity engine, route sampler and collaborators.

use thiserror::Error;

/// Errors surfaced by crime-alert operations.
///
/// The first group is caused by bad caller input and maps to a 400-equivalent.
/// The second group reports a failing external dependency and maps to a
/// 500-equivalent. Nothing here is retried by the core.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AlertError {
    #[error("invalid coordinate: {0}")]
    InvalidCoordinate(String),

    #[error("invalid detection radius: {0} km")]
    InvalidRadius(f64),

    #[error("malformed path: {0}")]
    MalformedPath(String),

    #[error("invalid destination: {0}")]
    InvalidDestination(String),

    #[error("invalid contact: {0}")]
    InvalidContact(String),

    #[error("record store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("directions unavailable: {0}")]
    DirectionsUnavailable(String),

    #[error("geocoder unavailable: {0}")]
    GeocoderUnavailable(String),
}

impl AlertError {
    /// Whether the error was caused by the caller's input rather than a dependency.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AlertError::InvalidCoordinate(_)
                | AlertError::InvalidRadius(_)
                | AlertError::MalformedPath(_)
                | AlertError::InvalidDestination(_)
                | AlertError::InvalidContact(_)
        )
    }
}
