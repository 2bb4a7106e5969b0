//! # Geographic Utilities
//!
//! Great-circle math used by every matching tier.
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`haversine_distance_km`] | Great-circle distance between two points, in km |
//! | [`haversine_distance`] | Same, in meters |
//! | [`distance_to_segment_km`] | Distance from a point to a segment, in km |
//! | [`slerp`] | Spherical linear interpolation along a great circle |
//! | [`polyline_length`] | Total length of a point sequence, in meters |
//! | [`meters_to_degrees`] | Convert meters to approximate degrees at a latitude |
//!
//! ## Example
//!
//! ```rust
//! use ride_route_matcher::{GeoPoint, geo_utils};
//!
//! let hyderabad = GeoPoint::from_lon_lat(78.47, 17.38);
//! let vijayawada = GeoPoint::from_lon_lat(80.64, 16.50);
//!
//! let km = geo_utils::haversine_distance_km(&hyderabad, &vijayawada);
//! assert!(km > 240.0 && km < 260.0);
//!
//! let midpoint = geo_utils::slerp(&hyderabad, &vijayawada, 0.5);
//! assert!(midpoint.longitude > 78.47 && midpoint.longitude < 80.64);
//! ```
//!
//! ## Algorithm Notes
//!
//! Distances assume a spherical Earth of radius 6371 km. Segment projection is
//! done on a locally flattened (equirectangular) plane centred on the segment,
//! which is accurate for road segments up to a few hundred kilometres. None of
//! these functions validate their input; NaN in gives NaN out.

use crate::GeoPoint;

/// Mean Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Approximate meters per degree of latitude (and of longitude at the equator).
pub const METERS_PER_DEGREE: f64 = 111_320.0;

/// Segments shorter than this (in meters) are treated as a single point.
const SEGMENT_EPSILON_METERS: f64 = 1.0;

/// Central angles below this (in radians, ~1mm on the ground) are treated as zero.
const ANGLE_EPSILON_RAD: f64 = 1e-10;

// =============================================================================
// Distance Functions
// =============================================================================

/// Central angle between two points in radians.
#[inline]
fn central_angle(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let delta_lat = (b.latitude - a.latitude).to_radians();
    let delta_lng = (b.longitude - a.longitude).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lng / 2.0).sin().powi(2);

    // Rounding can push h a hair above 1 for near-antipodal points
    2.0 * h.min(1.0).sqrt().asin()
}

/// Great-circle distance between two points using the haversine formula.
///
/// Returns kilometers on a sphere of radius [`EARTH_RADIUS_KM`]. Symmetric in
/// its arguments.
///
/// # Example
///
/// ```rust
/// use ride_route_matcher::{GeoPoint, geo_utils};
///
/// let london = GeoPoint::new(51.5074, -0.1278);
/// let paris = GeoPoint::new(48.8566, 2.3522);
/// let km = geo_utils::haversine_distance_km(&london, &paris);
/// assert!((km - 343.5).abs() < 5.0);
/// ```
#[inline]
pub fn haversine_distance_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    EARTH_RADIUS_KM * central_angle(a, b)
}

/// Great-circle distance in meters.
#[inline]
pub fn haversine_distance(a: &GeoPoint, b: &GeoPoint) -> f64 {
    haversine_distance_km(a, b) * 1000.0
}

/// Distance from `p` to the segment `seg_start`→`seg_end`, in kilometers.
///
/// The segment is flattened onto a local equirectangular plane (longitude
/// scaled by the cosine of the segment's mid-latitude), `p` is projected onto
/// it with the projection parameter clamped to `[0, 1]`, and the haversine
/// distance to the clamped point is returned. The result never exceeds the
/// distance to either endpoint.
///
/// Segments shorter than one meter are treated as a point.
pub fn distance_to_segment_km(p: &GeoPoint, seg_start: &GeoPoint, seg_end: &GeoPoint) -> f64 {
    let to_start = haversine_distance_km(p, seg_start);
    let to_end = haversine_distance_km(p, seg_end);

    let mid_lat = ((seg_start.latitude + seg_end.latitude) / 2.0).to_radians();
    let mx = METERS_PER_DEGREE * mid_lat.cos();
    let my = METERS_PER_DEGREE;

    let dx = (seg_end.longitude - seg_start.longitude) * mx;
    let dy = (seg_end.latitude - seg_start.latitude) * my;
    let len_sq = dx * dx + dy * dy;

    if len_sq.sqrt() < SEGMENT_EPSILON_METERS {
        return to_start.min(to_end);
    }

    let px = (p.longitude - seg_start.longitude) * mx;
    let py = (p.latitude - seg_start.latitude) * my;
    let t = ((px * dx + py * dy) / len_sq).clamp(0.0, 1.0);

    let closest = GeoPoint::new(
        seg_start.latitude + t * (seg_end.latitude - seg_start.latitude),
        seg_start.longitude + t * (seg_end.longitude - seg_start.longitude),
    );

    // The planar projection can land a few meters off the true minimum on
    // long segments; never report more than the nearer endpoint.
    haversine_distance_km(p, &closest).min(to_start).min(to_end)
}

// =============================================================================
// Interpolation
// =============================================================================

/// Spherical linear interpolation between `a` and `b`.
///
/// `fraction` is the share of the central angle to travel from `a`: 0 gives
/// `a`, 1 gives `b`, 0.5 the great-circle midpoint. Points closer than ~1mm,
/// and antipodal points (no unique great circle), return `a`.
///
/// # Example
///
/// ```rust
/// use ride_route_matcher::{GeoPoint, geo_utils};
///
/// let a = GeoPoint::new(0.0, 0.0);
/// let b = GeoPoint::new(0.0, 90.0);
/// let mid = geo_utils::slerp(&a, &b, 0.5);
/// assert!((mid.longitude - 45.0).abs() < 1e-9);
/// assert!(mid.latitude.abs() < 1e-9);
/// ```
pub fn slerp(a: &GeoPoint, b: &GeoPoint, fraction: f64) -> GeoPoint {
    let delta = central_angle(a, b);
    let sin_delta = delta.sin();
    if delta < ANGLE_EPSILON_RAD || sin_delta.abs() < ANGLE_EPSILON_RAD {
        return *a;
    }

    let (lat1, lng1) = (a.latitude.to_radians(), a.longitude.to_radians());
    let (lat2, lng2) = (b.latitude.to_radians(), b.longitude.to_radians());

    let wa = ((1.0 - fraction) * delta).sin() / sin_delta;
    let wb = (fraction * delta).sin() / sin_delta;

    let x = wa * lat1.cos() * lng1.cos() + wb * lat2.cos() * lng2.cos();
    let y = wa * lat1.cos() * lng1.sin() + wb * lat2.cos() * lng2.sin();
    let z = wa * lat1.sin() + wb * lat2.sin();

    GeoPoint::new(
        z.atan2((x * x + y * y).sqrt()).to_degrees(),
        y.atan2(x).to_degrees(),
    )
}

// =============================================================================
// Polyline Helpers
// =============================================================================

/// Total length of a point sequence in meters. Fewer than two points is 0.
pub fn polyline_length(points: &[GeoPoint]) -> f64 {
    points
        .windows(2)
        .map(|w| haversine_distance(&w[0], &w[1]))
        .sum()
}

/// Convert meters to approximate degrees at a given latitude.
///
/// Uses the longitude scale (the smaller one), so the result is a conservative
/// (larger) radius in degrees for both axes.
#[inline]
pub fn meters_to_degrees(meters: f64, latitude: f64) -> f64 {
    let meters_per_degree = METERS_PER_DEGREE * latitude.to_radians().cos().max(0.1);
    meters / meters_per_degree
}
