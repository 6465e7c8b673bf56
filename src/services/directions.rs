//! Directions provider interface.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::AlertError;
use crate::models::{Coordinate, EncodedPath};

/// A planned route as returned by the directions provider
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedRoute {
    pub encoded_path: EncodedPath,
    pub endpoint: Coordinate,
}

/// Computes walking routes between a position and a free-text destination.
///
/// Implementations report any non-success response as
/// [`AlertError::DirectionsUnavailable`].
#[async_trait]
pub trait DirectionsProvider: Send + Sync {
    async fn compute_route(
        &self,
        origin: Coordinate,
        destination: &str,
    ) -> Result<PlannedRoute, AlertError>;
}
