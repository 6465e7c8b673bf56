//! Proximity engine.
//!
//! Computes great-circle distances between a query point and incident
//! records, filters by detection radius and severity, and deduplicates
//! the survivors. Linear scans and an R-tree backed index share the same
//! filtering rules so both produce identical results.

mod engine;
mod haversine;
mod index;

pub use engine::{find_nearby, DedupeKey, MatchOrder, MatchSet, NearbyQuery, NearbySearch};
pub use haversine::{haversine_km, EARTH_RADIUS_KM};
pub use index::IncidentIndex;
