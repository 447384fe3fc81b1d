//! Geographic utilities: great-circle distance, cross-track distance and
//! path length.

use crate::{GpsPoint, TrackPoint};

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance between two points in meters (haversine).
pub fn haversine_distance(p1: &GpsPoint, p2: &GpsPoint) -> f64 {
    let lat1 = p1.latitude.to_radians();
    let lat2 = p2.latitude.to_radians();
    let dlat = (p2.latitude - p1.latitude).to_radians();
    let dlon = (p2.longitude - p1.longitude).to_radians();

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Minimum distance in meters from `point` to the segment `start -> end`.
///
/// The closest point is located in a local equirectangular frame centred on
/// `point`, then measured back on the sphere, which stays accurate from
/// centimetre segments up to tens of kilometres.
///
/// Degenerate cases: a point lying on either endpoint is at distance 0, and
/// a zero-length segment falls back to point-to-point distance.
pub fn distance_from_segment(point: &GpsPoint, start: &GpsPoint, end: &GpsPoint) -> f64 {
    let to_start = haversine_distance(point, start);
    let to_end = haversine_distance(point, end);
    if to_start == 0.0 || to_end == 0.0 {
        return 0.0;
    }
    if haversine_distance(start, end) == 0.0 {
        return to_start;
    }

    let (ax, ay) = project_local(point, start);
    let (bx, by) = project_local(point, end);
    let (dx, dy) = (bx - ax, by - ay);
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return to_start;
    }

    // Point sits at the local origin, so project (0,0) onto a->b.
    let t = (-(ax * dx + ay * dy) / len_sq).clamp(0.0, 1.0);
    if t == 0.0 {
        return to_start;
    }
    if t == 1.0 {
        return to_end;
    }

    let closest = GpsPoint::new(
        start.latitude + t * (end.latitude - start.latitude),
        start.longitude + t * (end.longitude - start.longitude),
    );
    haversine_distance(point, &closest).min(to_start).min(to_end)
}

/// Total distance along a path in meters.
pub fn path_length(points: &[GpsPoint]) -> f64 {
    points
        .windows(2)
        .map(|w| haversine_distance(&w[0], &w[1]))
        .sum()
}

/// Positions of a track, without timestamps.
pub fn positions(points: &[TrackPoint]) -> Vec<GpsPoint> {
    points.iter().map(TrackPoint::position).collect()
}

/// Move `origin` by `east` and `north` meters.
///
/// Inverse of the local projection used by [`distance_from_segment`]; handy
/// for laying out tracks in metres.
pub fn offset_meters(origin: &GpsPoint, east: f64, north: f64) -> GpsPoint {
    let dlat = (north / EARTH_RADIUS_M).to_degrees();
    let cos_lat = origin.latitude.to_radians().cos();
    let dlon = if cos_lat.abs() < 1e-12 {
        0.0
    } else {
        (east / (EARTH_RADIUS_M * cos_lat)).to_degrees()
    };
    GpsPoint::new(origin.latitude + dlat, origin.longitude + dlon)
}

/// Equirectangular projection of `p` in meters, relative to `origin`.
fn project_local(origin: &GpsPoint, p: &GpsPoint) -> (f64, f64) {
    let cos_lat = origin.latitude.to_radians().cos();
    let x = (p.longitude - origin.longitude).to_radians() * cos_lat * EARTH_RADIUS_M;
    let y = (p.latitude - origin.latitude).to_radians() * EARTH_RADIUS_M;
    (x, y)
}
