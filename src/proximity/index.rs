//! Spatial index for fast incident lookups around many query points.

use geo::Point;
use rstar::{RTree, RTreeObject, AABB};
use tracing::debug;

use super::engine::{NearbyQuery, NearbySearch};
use super::EARTH_RADIUS_KM;
use crate::error::AlertError;
use crate::models::{Coordinate, IncidentRecord, ProximityMatch};

/// Degrees added to every search box to absorb floating point error
const BOX_MARGIN_DEG: f64 = 1e-9;

/// Wrapper for R-tree indexing of incident positions
#[derive(Debug, Clone)]
struct IndexedIncident {
    /// Position of the record in the snapshot
    slot: usize,
    point: [f64; 2],
}

impl RTreeObject for IndexedIncident {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

/// R-tree over a record snapshot.
///
/// Produces exactly the same matches, in the same order, as a linear
/// [`find_nearby`](super::find_nearby) over the snapshot it was built from.
pub struct IncidentIndex {
    records: Vec<IncidentRecord>,
    tree: RTree<IndexedIncident>,
}

impl IncidentIndex {
    /// Build the index from a record snapshot
    pub fn build(records: Vec<IncidentRecord>) -> Self {
        let indexed: Vec<IndexedIncident> = records
            .iter()
            .enumerate()
            .filter(|(_, record)| record.position().is_valid())
            .map(|(slot, record)| {
                let point: Point<f64> = record.position().into();
                IndexedIncident {
                    slot,
                    point: [point.x(), point.y()],
                }
            })
            .collect();

        let skipped = records.len() - indexed.len();
        let tree = RTree::bulk_load(indexed);

        debug!(
            "Incident index built with {} entries ({} skipped with invalid positions)",
            tree.size(),
            skipped
        );

        Self { records, tree }
    }

    pub fn records(&self) -> &[IncidentRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Snapshot slots of records inside the search boxes, in snapshot order.
    fn candidate_slots(&self, center: &Coordinate, radius_km: f64) -> Vec<usize> {
        let mut slots: Vec<usize> = search_boxes(center, radius_km)
            .into_iter()
            .flat_map(|envelope| {
                self.tree
                    .locate_in_envelope_intersecting(&envelope)
                    .map(|ii| ii.slot)
                    .collect::<Vec<_>>()
            })
            .collect();

        slots.sort_unstable();
        slots.dedup();
        slots
    }
}

impl NearbySearch for IncidentIndex {
    fn find_nearby(
        &self,
        center: &Coordinate,
        query: &NearbyQuery,
    ) -> Result<Vec<ProximityMatch>, AlertError> {
        center.validate()?;
        query.validate()?;

        let slots = self.candidate_slots(center, query.radius_km);
        let candidates = slots.len();

        let matches = query.collect(
            slots
                .into_iter()
                .map(|slot| &self.records[slot])
                .filter(|record| query.admits(record))
                .filter_map(|record| query.within(center, record).map(|d| (record, d))),
        );

        debug!(
            "Indexed lookup at {}: {} candidates, {} within {} km",
            center,
            candidates,
            matches.len(),
            query.radius_km
        );

        Ok(matches)
    }
}

/// Lon/lat boxes that together contain every point within `radius_km` of `center`.
///
/// Boxes crossing the antimeridian are split in two. When the circle reaches
/// a pole the box spans all longitudes.
fn search_boxes(center: &Coordinate, radius_km: f64) -> Vec<AABB<[f64; 2]>> {
    use std::f64::consts::{FRAC_PI_2, PI};

    let angular = radius_km / EARTH_RADIUS_KM;
    let lat = center.latitude.to_radians();
    let lon = center.longitude.to_radians();

    let min_lat = lat - angular;
    let max_lat = lat + angular;

    let lat_span = |lo: f64, hi: f64| {
        (
            lo.to_degrees() - BOX_MARGIN_DEG,
            hi.to_degrees() + BOX_MARGIN_DEG,
        )
    };

    if angular >= PI || min_lat <= -FRAC_PI_2 || max_lat >= FRAC_PI_2 {
        let (lo, hi) = lat_span(min_lat.max(-FRAC_PI_2), max_lat.min(FRAC_PI_2));
        return vec![AABB::from_corners([-180.0, lo], [180.0, hi])];
    }

    let (lat_lo, lat_hi) = lat_span(min_lat, max_lat);
    let d_lon = (angular.sin() / lat.cos()).clamp(-1.0, 1.0).asin();
    let lon_lo = (lon - d_lon).to_degrees() - BOX_MARGIN_DEG;
    let lon_hi = (lon + d_lon).to_degrees() + BOX_MARGIN_DEG;

    if lon_lo < -180.0 {
        vec![
            AABB::from_corners([lon_lo + 360.0, lat_lo], [180.0, lat_hi]),
            AABB::from_corners([-180.0, lat_lo], [lon_hi, lat_hi]),
        ]
    } else if lon_hi > 180.0 {
        vec![
            AABB::from_corners([lon_lo, lat_lo], [180.0, lat_hi]),
            AABB::from_corners([-180.0, lat_lo], [lon_hi - 360.0, lat_hi]),
        ]
    } else {
        vec![AABB::from_corners([lon_lo, lat_lo], [lon_hi, lat_hi])]
    }
}
