//! Incident dataset loading from CSV.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecord};
use flate2::read::GzDecoder;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{IncidentRecord, Severity, UNKNOWN_INTERSECTION};

/// Column positions resolved from the header row
struct Columns {
    id: Option<usize>,
    latitude: usize,
    longitude: usize,
    rating: Option<usize>,
    crime_rate: Option<usize>,
    intersection: Option<usize>,
}

impl Columns {
    fn resolve(headers: &StringRecord) -> Result<Self> {
        Ok(Self {
            id: find_column(headers, &["_id", "id"]),
            latitude: find_column(headers, &["latitude", "lat"])
                .context("Column 'Latitude' not found")?,
            longitude: find_column(headers, &["longitude", "lon", "lng"])
                .context("Column 'Longitude' not found")?,
            rating: find_column(headers, &["rating", "severity"]),
            crime_rate: find_column(headers, &["crime_rate", "rate"]),
            intersection: find_column(headers, &["nearestintersectionlocation", "intersection"]),
        })
    }
}

fn find_column(headers: &StringRecord, names: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
}

/// Load incident records from a CSV export (optionally gzip-compressed)
pub fn load_incidents_csv(path: &Path) -> Result<Vec<IncidentRecord>> {
    info!("Loading incidents from {}", path.display());

    let file = File::open(path).context("Failed to open incident file")?;
    let reader: Box<dyn Read> = if path.extension().is_some_and(|e| e == "gz") {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };

    let records = read_incidents(reader)?;
    info!("Loaded {} incidents", records.len());
    Ok(records)
}

/// Parse incident rows from any CSV reader
pub fn read_incidents<R: Read>(reader: R) -> Result<Vec<IncidentRecord>> {
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let columns = Columns::resolve(&headers)?;

    let mut records = Vec::new();
    let mut skipped = 0usize;

    for (row, result) in csv_reader.records().enumerate() {
        let row_data = result.with_context(|| format!("Failed to read row {}", row + 1))?;
        let field = |idx: Option<usize>| {
            idx.and_then(|i| row_data.get(i))
                .map(str::trim)
                .filter(|s| !s.is_empty())
        };

        let position = (
            field(Some(columns.latitude)).and_then(|s| s.parse::<f64>().ok()),
            field(Some(columns.longitude)).and_then(|s| s.parse::<f64>().ok()),
        );
        let (latitude, longitude) = match position {
            (Some(lat), Some(lon)) => (lat, lon),
            _ => {
                warn!("Skipping row {}: missing or unparseable coordinates", row + 1);
                skipped += 1;
                continue;
            }
        };

        let id = field(columns.id)
            .map(String::from)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let severity = match field(columns.rating) {
            Some(label) => Severity::parse(label).unwrap_or_else(|| {
                warn!("Row {}: unknown rating {:?}, using Low", row + 1, label);
                Severity::Low
            }),
            None => Severity::Low,
        };

        let record = IncidentRecord::new(id, latitude, longitude)
            .with_severity(severity)
            .with_rate(
                field(columns.crime_rate)
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(0.0),
            )
            .with_intersection(field(columns.intersection).unwrap_or(UNKNOWN_INTERSECTION));

        records.push(record);
    }

    if skipped > 0 {
        warn!("Skipped {} rows without usable coordinates", skipped);
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    const DATASET: &str = "\
_id,Latitude,Longitude,rating,crime_rate,NearestIntersectionLocation
a1,43.4643,-80.5204,High,4.2,King St N & University Ave W
a2,43.4501,-80.4925,,,
a3,not-a-number,-80.49,Low,1.0,Nowhere
a4,43.4723,-80.5449,moderate,2.5,Columbia St W & Phillip St
";

    #[test]
    fn test_read_dataset() {
        let records = read_incidents(DATASET.as_bytes()).unwrap();
        assert_eq!(records.len(), 3);

        assert_eq!(records[0].id, "a1");
        assert_eq!(records[0].severity, Severity::High);
        assert_eq!(records[0].rate, 4.2);
        assert_eq!(records[0].nearest_intersection, "King St N & University Ave W");

        assert_eq!(records[1].severity, Severity::Low);
        assert_eq!(records[1].rate, 0.0);
        assert_eq!(records[1].nearest_intersection, "Unknown");

        assert_eq!(records[2].id, "a4");
        assert_eq!(records[2].severity, Severity::Moderate);
    }

    #[test]
    fn test_missing_ids_are_generated() {
        let data = "Latitude,Longitude\n1.0,2.0\n3.0,4.0\n";
        let records = read_incidents(data.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
        assert_ne!(records[0].id, records[1].id);
    }

    #[test]
    fn test_missing_coordinate_column() {
        let data = "_id,Longitude\n1,2.0\n";
        assert!(read_incidents(data.as_bytes()).is_err());
    }

    #[test]
    fn test_load_gzip_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crime_rate.csv.gz");

        let mut encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        encoder.write_all(DATASET.as_bytes()).unwrap();
        encoder.finish().unwrap();

        let records = load_incidents_csv(&path).unwrap();
        assert_eq!(records.len(), 3);
    }

    #[test]
    fn test_load_plain_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crime_rate.csv");
        std::fs::write(&path, DATASET).unwrap();

        let records = load_incidents_csv(&path).unwrap();
        assert_eq!(records[0].id, "a1");
    }
}
