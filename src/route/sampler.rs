//! Route sampling: decode a path and search around every sample.

use tracing::debug;

use super::polyline;
use crate::error::AlertError;
use crate::models::{Coordinate, EncodedPath, ProximityMatch};
use crate::proximity::{DedupeKey, MatchSet, NearbyQuery, NearbySearch};

/// Decode a path into its ordered coordinate samples.
pub fn sample_route(path: &EncodedPath) -> Result<Vec<Coordinate>, AlertError> {
    polyline::decode(path.as_str())
}

/// Incidents within `radius_km` of any sample along `path`, one entry per record id.
pub fn nearby_along_route<S>(
    path: &EncodedPath,
    radius_km: f64,
    source: &S,
) -> Result<Vec<ProximityMatch>, AlertError>
where
    S: NearbySearch + ?Sized,
{
    let query = NearbyQuery::new(radius_km, DedupeKey::ById);
    nearby_along_route_with(path, &query, source)
}

/// Like [`nearby_along_route`] but with a caller-supplied query.
///
/// The query's dedupe key is always forced to [`DedupeKey::ById`]. A record
/// seen at several samples is reported at the first sample that found it.
pub fn nearby_along_route_with<S>(
    path: &EncodedPath,
    query: &NearbyQuery,
    source: &S,
) -> Result<Vec<ProximityMatch>, AlertError>
where
    S: NearbySearch + ?Sized,
{
    query.validate()?;
    let samples = sample_route(path)?;
    nearby_along_samples(&samples, query, source)
}

/// Search around already decoded route samples, merging results by record id.
pub fn nearby_along_samples<S>(
    samples: &[Coordinate],
    query: &NearbyQuery,
    source: &S,
) -> Result<Vec<ProximityMatch>, AlertError>
where
    S: NearbySearch + ?Sized,
{
    query.validate()?;
    let query = query.clone().with_dedupe(DedupeKey::ById);

    let mut found = MatchSet::new();
    for sample in samples {
        found.extend(source.find_nearby(sample, &query)?);
    }

    debug!(
        "Route with {} samples matched {} incidents within {} km",
        samples.len(),
        found.len(),
        query.radius_km
    );

    Ok(found.into_matches())
}
