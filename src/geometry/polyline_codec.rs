//! Thin wrapper around the `polyline` crate's precision-5 Google polyline
//! codec, pinned to this crate's (lng, lat) point convention.
//!
//! `geo_types::Coord` already stores `x` as longitude and `y` as latitude, so
//! decoding straight into `(f64, f64)` tuples here requires no axis swap —
//! the tuple order below *is* the (lng, lat) convention the Map-Matcher
//! expects.

use geo_types::{Coord, LineString};

const PRECISION: u32 = 5;

/// Decodes a precision-5 encoded polyline into an ordered (lng, lat) sequence.
pub fn decode_precision5(encoded: &str) -> Result<Vec<(f64, f64)>, String> {
    let line: LineString<f64> = polyline::decode_polyline(encoded, PRECISION)?;
    Ok(line.into_iter().map(|c: Coord<f64>| (c.x, c.y)).collect())
}

/// Encodes an ordered (lng, lat) sequence with precision 5. Used by this
/// crate's own test fixtures to stand in for the admin-side encoder.
pub fn encode_precision5(coords: &[(f64, f64)]) -> Result<String, String> {
    let line: LineString<f64> = coords.iter().map(|&(lng, lat)| Coord { x: lng, y: lat }).collect();
    polyline::encode_coordinates(line, PRECISION)
}
