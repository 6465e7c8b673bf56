//! Reverse geocoding.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::store::{fetch_snapshot, RecordStore};
use crate::error::AlertError;
use crate::models::Coordinate;
use crate::proximity::{find_nearby, DedupeKey, MatchOrder, NearbyQuery};

/// Resolves a position to a human-readable place name.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// `Ok(None)` when nothing is known about the position.
    async fn reverse_geocode(&self, coord: Coordinate) -> Result<Option<String>, AlertError>;
}

/// Names a position after the closest known intersection in the incident dataset.
pub struct IntersectionGeocoder {
    store: Arc<dyn RecordStore>,
    radius_km: f64,
    timeout: Duration,
}

impl IntersectionGeocoder {
    pub fn new(store: Arc<dyn RecordStore>, radius_km: f64, timeout: Duration) -> Self {
        Self {
            store,
            radius_km,
            timeout,
        }
    }
}

#[async_trait]
impl Geocoder for IntersectionGeocoder {
    async fn reverse_geocode(&self, coord: Coordinate) -> Result<Option<String>, AlertError> {
        let records = fetch_snapshot(self.store.as_ref(), self.timeout)
            .await
            .map_err(|e| AlertError::GeocoderUnavailable(e.to_string()))?;

        let query = NearbyQuery::new(self.radius_km, DedupeKey::ByIntersection)
            .with_order(MatchOrder::Nearest);
        let name = find_nearby(&coord, &records, &query)?
            .into_iter()
            .find(|m| m.record.has_known_intersection())
            .map(|m| m.record.nearest_intersection);

        debug!("Reverse geocode {} -> {:?}", coord, name);
        Ok(name)
    }
}
