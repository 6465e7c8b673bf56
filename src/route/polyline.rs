//! Encoded polyline codec (5 decimal precision, delta + zigzag varint).

use crate::error::AlertError;
use crate::models::{Coordinate, EncodedPath};

const PRECISION: f64 = 1e5;
const CHAR_OFFSET: u8 = 63;
const CONTINUATION: i64 = 0x20;
const CHUNK_MASK: i64 = 0x1f;
/// Values are at most 32 bits, i.e. seven 5-bit chunks
const MAX_SHIFT: u32 = 30;

/// Decode an encoded polyline into its ordered coordinates.
pub fn decode(path: &str) -> Result<Vec<Coordinate>, AlertError> {
    let bytes = path.as_bytes();
    let mut index = 0;
    let mut lat: i64 = 0;
    let mut lon: i64 = 0;
    let mut coords = Vec::new();

    while index < bytes.len() {
        lat += next_value(bytes, &mut index)?;
        if index >= bytes.len() {
            return Err(AlertError::MalformedPath(format!(
                "latitude without longitude at point {}",
                coords.len()
            )));
        }
        lon += next_value(bytes, &mut index)?;

        let coord = Coordinate::new(lat as f64 / PRECISION, lon as f64 / PRECISION).map_err(
            |_| {
                AlertError::MalformedPath(format!(
                    "point {} decodes outside valid range ({}, {})",
                    coords.len(),
                    lat as f64 / PRECISION,
                    lon as f64 / PRECISION
                ))
            },
        )?;
        coords.push(coord);
    }

    Ok(coords)
}

/// Read one zigzag varint starting at `index`, advancing past it.
fn next_value(bytes: &[u8], index: &mut usize) -> Result<i64, AlertError> {
    let mut result: i64 = 0;
    let mut shift: u32 = 0;

    loop {
        let Some(&byte) = bytes.get(*index) else {
            return Err(AlertError::MalformedPath(format!(
                "path ends in the middle of a value at offset {}",
                *index
            )));
        };
        if !(CHAR_OFFSET..=b'~').contains(&byte) {
            return Err(AlertError::MalformedPath(format!(
                "invalid character {:?} at offset {}",
                byte as char, *index
            )));
        }
        if shift > MAX_SHIFT {
            return Err(AlertError::MalformedPath(format!(
                "value at offset {} exceeds 32 bits",
                *index
            )));
        }
        *index += 1;

        let chunk = i64::from(byte - CHAR_OFFSET);
        result |= (chunk & CHUNK_MASK) << shift;
        shift += 5;

        if chunk < CONTINUATION {
            break;
        }
    }

    Ok(if result & 1 != 0 {
        !(result >> 1)
    } else {
        result >> 1
    })
}

/// Encode coordinates, rounding each to 5 decimal places.
pub fn encode(coords: &[Coordinate]) -> EncodedPath {
    let mut out = String::new();
    let mut prev_lat: i64 = 0;
    let mut prev_lon: i64 = 0;

    for coord in coords {
        let lat = (coord.latitude * PRECISION).round() as i64;
        let lon = (coord.longitude * PRECISION).round() as i64;
        push_value(&mut out, lat - prev_lat);
        push_value(&mut out, lon - prev_lon);
        prev_lat = lat;
        prev_lon = lon;
    }

    EncodedPath::new(out)
}

fn push_value(out: &mut String, delta: i64) {
    let mut value = if delta < 0 { !(delta << 1) } else { delta << 1 };
    while value >= CONTINUATION {
        out.push(((CONTINUATION | (value & CHUNK_MASK)) as u8 + CHAR_OFFSET) as char);
        value >>= 5;
    }
    out.push((value as u8 + CHAR_OFFSET) as char);
}
