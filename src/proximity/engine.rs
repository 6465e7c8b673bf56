//! Radius filtering and deduplication of incident records.

use hashbrown::HashSet;
use serde::Deserialize;
use tracing::debug;

use super::haversine_km;
use crate::error::AlertError;
use crate::models::{Coordinate, IncidentRecord, ProximityMatch, Severity};

/// Key used to collapse several matching records into one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupeKey {
    ById,
    ByIntersection,
}

impl DedupeKey {
    fn key<'r>(&self, record: &'r IncidentRecord) -> &'r str {
        match self {
            DedupeKey::ById => &record.id,
            DedupeKey::ByIntersection => &record.nearest_intersection,
        }
    }
}

/// Which candidate wins when several share a dedupe key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchOrder {
    /// First record in store iteration order wins; output keeps that order.
    #[default]
    Scan,
    /// Closest record wins; output is sorted nearest first.
    Nearest,
}

/// Parameters for a proximity search
#[derive(Debug, Clone)]
pub struct NearbyQuery {
    pub radius_km: f64,
    pub dedupe: DedupeKey,
    pub severities: Option<HashSet<Severity>>,
    pub order: MatchOrder,
}

impl NearbyQuery {
    pub fn new(radius_km: f64, dedupe: DedupeKey) -> Self {
        Self {
            radius_km,
            dedupe,
            severities: None,
            order: MatchOrder::Scan,
        }
    }

    /// Only admit records whose severity is in `severities`.
    pub fn with_severities(mut self, severities: impl IntoIterator<Item = Severity>) -> Self {
        self.severities = Some(severities.into_iter().collect());
        self
    }

    pub fn with_order(mut self, order: MatchOrder) -> Self {
        self.order = order;
        self
    }

    pub fn with_dedupe(mut self, dedupe: DedupeKey) -> Self {
        self.dedupe = dedupe;
        self
    }

    pub fn validate(&self) -> Result<(), AlertError> {
        if self.radius_km.is_finite() && self.radius_km >= 0.0 {
            Ok(())
        } else {
            Err(AlertError::InvalidRadius(self.radius_km))
        }
    }

    /// Severity filter and position sanity, evaluated before the distance test.
    pub(crate) fn admits(&self, record: &IncidentRecord) -> bool {
        if !record.position().is_valid() {
            return false;
        }
        match &self.severities {
            Some(allowed) => allowed.contains(&record.severity),
            None => true,
        }
    }

    /// Distance to `record` if it lies strictly inside the radius.
    pub(crate) fn within(&self, center: &Coordinate, record: &IncidentRecord) -> Option<f64> {
        let distance = haversine_km(center, &record.position());
        (distance < self.radius_km).then_some(distance)
    }

    /// Order and deduplicate candidates that already passed `admits` and `within`.
    pub(crate) fn collect<'r>(
        &self,
        candidates: impl Iterator<Item = (&'r IncidentRecord, f64)>,
    ) -> Vec<ProximityMatch> {
        let mut candidates: Vec<(&IncidentRecord, f64)> = candidates.collect();
        if self.order == MatchOrder::Nearest {
            candidates.sort_by(|a, b| a.1.total_cmp(&b.1));
        }

        let mut seen: HashSet<&str> = HashSet::new();
        candidates
            .into_iter()
            .filter(|&(record, _)| seen.insert(self.dedupe.key(record)))
            .map(|(record, distance_km)| ProximityMatch {
                record: record.clone(),
                distance_km,
            })
            .collect()
    }
}

/// Anything that can answer a proximity query around a point.
pub trait NearbySearch {
    fn find_nearby(
        &self,
        center: &Coordinate,
        query: &NearbyQuery,
    ) -> Result<Vec<ProximityMatch>, AlertError>;
}

impl NearbySearch for [IncidentRecord] {
    fn find_nearby(
        &self,
        center: &Coordinate,
        query: &NearbyQuery,
    ) -> Result<Vec<ProximityMatch>, AlertError> {
        find_nearby(center, self, query)
    }
}

impl NearbySearch for Vec<IncidentRecord> {
    fn find_nearby(
        &self,
        center: &Coordinate,
        query: &NearbyQuery,
    ) -> Result<Vec<ProximityMatch>, AlertError> {
        find_nearby(center, self, query)
    }
}

/// Linear scan over `records` for incidents strictly within the query radius.
pub fn find_nearby(
    center: &Coordinate,
    records: &[IncidentRecord],
    query: &NearbyQuery,
) -> Result<Vec<ProximityMatch>, AlertError> {
    center.validate()?;
    query.validate()?;

    let matches = query.collect(
        records
            .iter()
            .filter(|record| query.admits(record))
            .filter_map(|record| query.within(center, record).map(|d| (record, d))),
    );

    debug!(
        "Proximity scan at {}: {} of {} records within {} km",
        center,
        matches.len(),
        records.len(),
        query.radius_km
    );

    Ok(matches)
}

/// Accumulates matches across several searches, keeping one entry per record id.
#[derive(Debug, Default)]
pub struct MatchSet {
    seen: HashSet<String>,
    matches: Vec<ProximityMatch>,
}

impl MatchSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, matches: impl IntoIterator<Item = ProximityMatch>) {
        for m in matches {
            if self.seen.insert(m.record.id.clone()) {
                self.matches.push(m);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn into_matches(self) -> Vec<ProximityMatch> {
        self.matches
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn center(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon).unwrap()
    }

    fn sample_records() -> Vec<IncidentRecord> {
        vec![
            IncidentRecord::new("1", 0.0, 0.0).with_severity(Severity::High),
            IncidentRecord::new("2", 10.0, 10.0).with_severity(Severity::Low),
        ]
    }

    #[test]
    fn test_point_check_end_to_end() {
        let records = sample_records();
        let query = NearbyQuery::new(0.5, DedupeKey::ByIntersection)
            .with_severities(Severity::alerting());

        let matches = find_nearby(&center(0.001, 0.001), &records, &query).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].record.id, "1");
        assert!(matches[0].distance_km > 0.0);

        let safe = find_nearby(&center(5.0, 5.0), &records, &query).unwrap();
        assert!(safe.is_empty());
    }

    #[test]
    fn test_severity_filter_excludes_low() {
        let records = vec![
            IncidentRecord::new("low", 0.0, 0.0).with_intersection("A"),
            IncidentRecord::new("mod", 0.0, 0.0)
                .with_severity(Severity::Moderate)
                .with_intersection("B"),
        ];
        let query = NearbyQuery::new(1.0, DedupeKey::ById).with_severities(Severity::alerting());
        let matches = find_nearby(&center(0.0, 0.0), &records, &query).unwrap();
        let ids: Vec<&str> = matches.iter().map(|m| m.record.id.as_str()).collect();
        assert_eq!(ids, vec!["mod"]);
    }

    #[test]
    fn test_filtered_record_does_not_claim_intersection() {
        // A Low record ahead of a High one at the same corner must not hide it
        let records = vec![
            IncidentRecord::new("low", 0.0, 0.0).with_intersection("Main & 1st"),
            IncidentRecord::new("high", 0.0, 0.0)
                .with_severity(Severity::High)
                .with_intersection("Main & 1st"),
        ];
        let query = NearbyQuery::new(1.0, DedupeKey::ByIntersection)
            .with_severities(Severity::alerting());
        let matches = find_nearby(&center(0.0, 0.0), &records, &query).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].record.id, "high");
    }

    #[test]
    fn test_dedupe_by_intersection_keeps_first() {
        let records = vec![
            IncidentRecord::new("far", 0.003, 0.0).with_intersection("King & Erb"),
            IncidentRecord::new("near", 0.0001, 0.0).with_intersection("King & Erb"),
            IncidentRecord::new("other", 0.002, 0.0).with_intersection("Weber & Erb"),
        ];
        let query = NearbyQuery::new(1.0, DedupeKey::ByIntersection);
        let matches = find_nearby(&center(0.0, 0.0), &records, &query).unwrap();

        let ids: Vec<&str> = matches.iter().map(|m| m.record.id.as_str()).collect();
        assert_eq!(ids, vec!["far", "other"]);
    }

    #[test]
    fn test_nearest_order_prefers_closest() {
        let records = vec![
            IncidentRecord::new("far", 0.003, 0.0).with_intersection("King & Erb"),
            IncidentRecord::new("near", 0.0001, 0.0).with_intersection("King & Erb"),
            IncidentRecord::new("other", 0.002, 0.0).with_intersection("Weber & Erb"),
        ];
        let query =
            NearbyQuery::new(1.0, DedupeKey::ByIntersection).with_order(MatchOrder::Nearest);
        let matches = find_nearby(&center(0.0, 0.0), &records, &query).unwrap();

        let ids: Vec<&str> = matches.iter().map(|m| m.record.id.as_str()).collect();
        assert_eq!(ids, vec!["near", "other"]);
    }

    #[test]
    fn test_boundary_is_exclusive() {
        let origin = center(0.0, 0.0);
        let record = IncidentRecord::new("edge", 0.0, 0.004);
        let exact = haversine_km(&origin, &record.position());
        let records = vec![record];

        let at_edge = NearbyQuery::new(exact, DedupeKey::ById);
        assert!(find_nearby(&origin, &records, &at_edge).unwrap().is_empty());

        let just_inside = NearbyQuery::new(exact + 1e-9, DedupeKey::ById);
        assert_eq!(find_nearby(&origin, &records, &just_inside).unwrap().len(), 1);
    }

    #[test]
    fn test_empty_records() {
        let query = NearbyQuery::new(0.5, DedupeKey::ById);
        assert!(find_nearby(&center(1.0, 1.0), &[], &query).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_inputs() {
        let records = sample_records();
        let query = NearbyQuery::new(0.5, DedupeKey::ById);
        let bad_center = Coordinate {
            latitude: 120.0,
            longitude: 0.0,
        };
        assert!(matches!(
            find_nearby(&bad_center, &records, &query),
            Err(AlertError::InvalidCoordinate(_))
        ));

        let bad_radius = NearbyQuery::new(-1.0, DedupeKey::ById);
        assert!(matches!(
            find_nearby(&center(0.0, 0.0), &records, &bad_radius),
            Err(AlertError::InvalidRadius(_))
        ));
    }

    #[test]
    fn test_records_with_bad_positions_are_skipped() {
        let records = vec![IncidentRecord::new("broken", 95.0, 0.0)];
        let query = NearbyQuery::new(20_000.0, DedupeKey::ById);
        assert!(find_nearby(&center(0.0, 0.0), &records, &query)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_match_set_dedupes_by_id() {
        let m = |id: &str, d: f64| ProximityMatch {
            record: IncidentRecord::new(id, 0.0, 0.0),
            distance_km: d,
        };
        let mut set = MatchSet::new();
        set.extend(vec![m("a", 0.3), m("b", 0.1)]);
        set.extend(vec![m("a", 0.05), m("c", 0.2)]);

        let matches = set.into_matches();
        let ids: Vec<&str> = matches.iter().map(|m| m.record.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(matches[0].distance_km, 0.3);
    }
}
