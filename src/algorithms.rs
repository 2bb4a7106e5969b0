//! # Algorithm Toolbox
//!
//! Direct access to the geometry behind route matching, for callers that want
//! the math without the tiered policy.
//!
//! ## Geographic Utilities
//!
//! - **Haversine Distance**: Great-circle distance between points
//! - **Segment Distance**: Point-to-segment distance on a locally flat plane
//! - **Slerp**: Interpolation along a great circle
//!
//! ## Polyline Queries
//!
//! - **Minimum Distance**: Point to nearest polyline segment
//! - **Nearest Vertex**: Index of the closest polyline vertex
//! - **Distance Along**: Approximate progress along a polyline
//! - **Douglas-Peucker**: Line simplification
//!
//! # Example
//!
//! ```rust
//! use ride_route_matcher::algorithms::{
//!     haversine_distance_km, min_distance_to_polyline_meters, nearest_vertex_index, GeoPoint,
//! };
//!
//! let route = vec![
//!     GeoPoint::from_lon_lat(78.47, 17.38),
//!     GeoPoint::from_lon_lat(79.60, 17.05),
//!     GeoPoint::from_lon_lat(80.64, 16.50),
//! ];
//! let nalgonda = GeoPoint::from_lon_lat(79.61, 17.06);
//!
//! assert_eq!(nearest_vertex_index(&nalgonda, &route), Some(1));
//! assert!(min_distance_to_polyline_meters(&nalgonda, &route) < 2_000.0);
//! assert!(haversine_distance_km(&route[0], &route[2]) > 200.0);
//! ```

// =============================================================================
// Core Types (re-exported from lib)
// =============================================================================

pub use crate::{Bounds, GeoPoint, MatchConfig, MatchResult, MatchTier, Polyline};

// =============================================================================
// Geographic Utilities
// =============================================================================

pub use crate::geo_utils::{
    distance_to_segment_km, haversine_distance, haversine_distance_km, meters_to_degrees,
    polyline_length, slerp,
};

// =============================================================================
// Polyline Queries
// =============================================================================

pub use crate::polyline::{
    approx_distance_along_polyline_meters, min_distance_to_polyline_meters,
    nearest_vertex_index,
};

/// Build a great-circle substitute route between two endpoints.
pub use crate::synthetic::build_synthetic_polyline;

/// Direction-of-travel check against a polyline.
pub use crate::ordering::{check_route_order, is_in_route_order, OrderCheck};

// =============================================================================
// Line Simplification
// =============================================================================

/// Douglas-Peucker line simplification.
///
/// Tolerance is in degrees. Uses the geo crate's implementation.
///
/// # Example
/// ```rust
/// use ride_route_matcher::algorithms::{douglas_peucker, GeoPoint};
///
/// let track: Vec<GeoPoint> = (0..10)
///     .map(|i| GeoPoint::new(17.0, 78.0 + i as f64 * 0.01))
///     .collect();
/// let simplified = douglas_peucker(&track, 0.0001);
/// assert_eq!(simplified.len(), 2);
/// ```
pub fn douglas_peucker(points: &[GeoPoint], tolerance: f64) -> Vec<GeoPoint> {
    Polyline::from_points(points.to_vec())
        .simplified(tolerance)
        .points()
        .to_vec()
}
