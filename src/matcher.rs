//! Map-Matcher (MM): a pure function that snaps a geographic point to a
//! polyline and computes its arc-length offset in kilometers.
//!
//! The matcher never caches and never mutates; it is safe to call from any
//! number of concurrent tasks without synchronization.

/// Mean Earth radius in kilometers (WGS84 authalic mean), per the contract.
const EARTH_RADIUS_KM: f64 = 6371.0088;

/// Segments shorter than this are treated as degenerate points for the
/// projection step; their length still contributes to cumulative arc length.
const DEGENERATE_SEGMENT_METERS: f64 = 1.0;

/// The result of snapping a point onto a polyline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchResult {
    pub snapped_lng: f64,
    pub snapped_lat: f64,
    pub offset_km: f64,
}

/// Great-circle distance between two (lng, lat) points, in kilometers.
pub fn haversine_km(a: (f64, f64), b: (f64, f64)) -> f64 {
    let (lng1, lat1) = a;
    let (lng2, lat2) = b;
    let (lat1r, lat2r) = (lat1.to_radians(), lat2.to_radians());
    let dlat = (lat2 - lat1).to_radians();
    let dlng = (lng2 - lng1).to_radians();

    let sin_dlat = (dlat / 2.0).sin();
    let sin_dlng = (dlng / 2.0).sin();
    let h = sin_dlat * sin_dlat + lat1r.cos() * lat2r.cos() * sin_dlng * sin_dlng;
    let c = 2.0 * h.sqrt().asin();
    EARTH_RADIUS_KM * c
}

/// Snaps `point` onto `coords` (an ordered polyline, (lng, lat), >= 2 points)
/// and returns the nearest point on the polyline plus its arc-length offset
/// from the polyline's origin.
///
/// `coords` with fewer than two points has no well-defined arc length; the
/// caller must not invoke this with such input (the Geometry Cache treats a
/// degenerate polyline as `notFound` before it ever reaches the matcher).
pub fn snap(coords: &[(f64, f64)], point: (f64, f64)) -> MatchResult {
    debug_assert!(coords.len() >= 2, "map-matcher requires at least two polyline points");

    let mut best: Option<MatchResult> = None;
    let mut best_dist_km = f64::INFINITY;
    let mut cumulative_km = 0.0;

    for window in coords.windows(2) {
        let (p0, p1) = (window[0], window[1]);
        let segment_len_km = haversine_km(p0, p1);

        let (foot, dist_to_foot_km) = if segment_len_km * 1000.0 < DEGENERATE_SEGMENT_METERS {
            (p0, haversine_km(p0, point))
        } else {
            project_onto_segment(p0, p1, point)
        };

        if dist_to_foot_km < best_dist_km {
            best_dist_km = dist_to_foot_km;
            let offset_km = cumulative_km + haversine_km(p0, foot);
            best = Some(MatchResult {
                snapped_lng: foot.0,
                snapped_lat: foot.1,
                offset_km,
            });
        }

        cumulative_km += segment_len_km;
    }

    best.expect("coords has at least two points, so windows(2) yields at least one segment")
}

/// Projects `point` onto the segment `(p0, p1)` using an equirectangular
/// planar approximation (adequate at the scale of a single transit route
/// segment), clamped to the segment endpoints.
///
/// Returns the projected foot (lng, lat) and the haversine distance from
/// `point` to that foot.
fn project_onto_segment(
    p0: (f64, f64),
    p1: (f64, f64),
    point: (f64, f64),
) -> ((f64, f64), f64) {
    // Scale longitude by cos(latitude) so the planar projection is locally
    // metric-consistent near the segment.
    let lat_ref = ((p0.1 + p1.1) / 2.0).to_radians();
    let cos_lat = lat_ref.cos().max(1e-9);

    let to_xy = |p: (f64, f64)| -> (f64, f64) { (p.0 * cos_lat, p.1) };
    let (x0, y0) = to_xy(p0);
    let (x1, y1) = to_xy(p1);
    let (xp, yp) = to_xy(point);

    let dx = x1 - x0;
    let dy = y1 - y0;
    let len_sq = dx * dx + dy * dy;

    let t = if len_sq <= f64::EPSILON {
        0.0
    } else {
        (((xp - x0) * dx + (yp - y0) * dy) / len_sq).clamp(0.0, 1.0)
    };

    let foot = (p0.0 + t * (p1.0 - p0.0), p0.1 + t * (p1.1 - p0.1));
    let dist_km = haversine_km(foot, point);
    (foot, dist_km)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Scenario S1 golden fixture: Route R1 with stops A=(28.6328,77.2197),
    // B=(28.628,77.3649); polyline decoded to [[77.2197,28.6328],[77.3649,28.628]].
    fn s1_polyline() -> Vec<(f64, f64)> {
        vec![(77.2197, 28.6328), (77.3649, 28.628)]
    }

    #[test]
    fn haversine_matches_known_distance() {
        // Roughly the length of the S1 segment (~13-14 km at this latitude).
        let d = haversine_km((77.2197, 28.6328), (77.3649, 28.628));
        assert!(d > 10.0 && d < 16.0, "unexpected segment length: {d}");
    }

    #[test]
    fn snaps_midpoint_to_roughly_half_segment_offset() {
        let coords = s1_polyline();
        let total = haversine_km(coords[0], coords[1]);
        let midpoint = (77.2923, 28.6300);
        let m = snap(&coords, midpoint);
        assert!((m.offset_km - total / 2.0).abs() < 0.5);
        assert!(m.offset_km >= 0.0 && m.offset_km <= total);
    }

    #[test]
    fn snaps_exact_vertex_to_itself() {
        let coords = s1_polyline();
        let m = snap(&coords, coords[0]);
        assert!((m.offset_km).abs() < 1e-6);
        assert!((m.snapped_lng - coords[0].0).abs() < 1e-9);
        assert!((m.snapped_lat - coords[0].1).abs() < 1e-9);

        let total = haversine_km(coords[0], coords[1]);
        let m_end = snap(&coords, coords[1]);
        assert!((m_end.offset_km - total).abs() < 1e-6);
    }

    #[test]
    fn is_idempotent() {
        let coords = s1_polyline();
        let point = (77.3, 28.63);
        let a = snap(&coords, point);
        let b = snap(&coords, point);
        assert_eq!(a, b);
    }

    #[test]
    fn tie_breaks_to_earliest_segment() {
        // Three collinear points; a point equidistant from both segments'
        // feet should match the earlier segment.
        let coords = vec![(0.0, 0.0), (0.0, 1.0), (0.0, 2.0)];
        let m = snap(&coords, (0.0, 1.0));
        // Offset at the shared vertex is the cumulative length of segment 0.
        let seg0 = haversine_km(coords[0], coords[1]);
        assert!((m.offset_km - seg0).abs() < 1e-6);
    }

    #[test]
    fn collapses_degenerate_segment_without_dividing_by_zero() {
        // Two consecutive vertices within 1 m of each other.
        let coords = vec![(77.0, 28.0), (77.0 + 1e-7, 28.0), (77.1, 28.1)];
        let m = snap(&coords, (77.05, 28.05));
        assert!(m.offset_km.is_finite());
        assert!(m.offset_km >= 0.0);
    }
}
