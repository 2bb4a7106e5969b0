//! Substitute route geometry for rides that have none stored.
//!
//! The synthetic polyline follows the great circle between the driver's two
//! endpoints. It is curvature-aware but knows nothing about roads, so it must
//! never be persisted or shown as the driver's actual path.

use crate::geo_utils::slerp;
use crate::polyline::Polyline;
use crate::GeoPoint;

/// Build a great-circle polyline from `source` to `destination`.
///
/// Returns `source`, the `n - 1` interior points at fractions `1/n .. (n-1)/n`,
/// then `destination`, for `n = waypoint_count`. The endpoints are the inputs
/// themselves, not interpolated copies. A count of 0 is treated as 1.
///
/// # Example
/// ```
/// use ride_route_matcher::{build_synthetic_polyline, GeoPoint};
///
/// let src = GeoPoint::from_lon_lat(78.47, 17.38);
/// let dst = GeoPoint::from_lon_lat(80.64, 16.50);
/// let polyline = build_synthetic_polyline(&src, &dst, 4);
///
/// assert_eq!(polyline.len(), 5);
/// assert_eq!(polyline.first(), Some(&src));
/// assert_eq!(polyline.last(), Some(&dst));
/// ```
pub fn build_synthetic_polyline(
    source: &GeoPoint,
    destination: &GeoPoint,
    waypoint_count: u32,
) -> Polyline {
    let n = waypoint_count.max(1);

    let mut points = Vec::with_capacity(n as usize + 1);
    points.push(*source);
    points.extend((1..n).map(|i| slerp(source, destination, i as f64 / n as f64)));
    points.push(*destination);

    Polyline::from_points(points)
}
