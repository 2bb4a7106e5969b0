//! # Ride Route Matcher
//!
//! Decides whether a passenger's requested trip lies along a driver's posted
//! route, including trips that join or leave the route part way.
//!
//! This library provides:
//! - Great-circle geometry (haversine, point-to-segment distance, slerp)
//! - Route polylines parsed from stored driver geometry
//! - A three-tier matching policy: stored geometry, synthetic great-circle
//!   polyline, then a coarse coordinate check
//! - Batch search over candidate rides with an optional R-tree prefilter
//!
//! Matching is a pure function of its inputs. Nothing here does I/O or holds
//! state between calls, so candidates can be evaluated concurrently.
//!
//! ## Features
//!
//! - **`parallel`** - Evaluate candidate rides in parallel with rayon
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use ride_route_matcher::{match_ride, DriverRide, GeoPoint, MatchConfig, PassengerSearch};
//!
//! let ride = DriverRide {
//!     ride_id: "ride-1".to_string(),
//!     source_coordinate: GeoPoint::from_lon_lat(78.47, 17.38),
//!     destination_coordinate: GeoPoint::from_lon_lat(80.64, 16.50),
//!     route_geometry: Some(serde_json::json!([[78.47, 17.38], [79.60, 17.05], [80.64, 16.50]])),
//!     geometry_order: Default::default(),
//! };
//! let search = PassengerSearch {
//!     source_coordinate: Some(GeoPoint::from_lon_lat(79.61, 17.06)),
//!     destination_coordinate: Some(GeoPoint::from_lon_lat(80.64, 16.50)),
//! };
//!
//! let result = match_ride(&ride, &search, &MatchConfig::default()).unwrap();
//! assert!(result.is_match);
//! ```

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{CoordinateFault, OptionExt, Result, RouteMatchError};

// Great-circle math
pub mod geo_utils;

// Route polylines and geometry parsing
pub mod polyline;
pub use polyline::{CoordinateOrder, OrientationSource, Polyline};

// Great-circle substitute for missing geometry
pub mod synthetic;
pub use synthetic::build_synthetic_polyline;

// Direction-of-travel validation
pub mod ordering;
pub use ordering::{check_route_order, is_in_route_order, OrderCheck};

// Ride and search records consumed from the booking layer
pub mod ride;
pub use ride::{DriverRide, PassengerSearch};

// Three-tier matching engine
pub mod matching;
pub use matching::{evaluate_match, match_ride, RouteMatchQuery};

// Batch search over candidate rides
pub mod search;
#[cfg(feature = "parallel")]
pub use search::match_rides_parallel;
pub use search::{match_rides, RideIndex, RideMatch};

// Algorithm toolbox - flat access to the pure geometry functions
pub mod algorithms;

// ============================================================================
// Core Types
// ============================================================================

/// A geographic coordinate in decimal degrees.
///
/// # Example
/// ```
/// use ride_route_matcher::GeoPoint;
/// let hyderabad = GeoPoint::from_lon_lat(78.47, 17.38);
/// assert_eq!(hyderabad, GeoPoint::new(17.38, 78.47));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Create a new point from latitude and longitude.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Create a new point from a (longitude, latitude) pair.
    pub fn from_lon_lat(longitude: f64, latitude: f64) -> Self {
        Self::new(latitude, longitude)
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }

    /// Validate the point for matching.
    ///
    /// `role` names the point in the error (e.g. "passenger source").
    pub fn validate(&self, role: &str, service_area: Option<&Bounds>) -> Result<()> {
        let fault = if !self.latitude.is_finite() || !self.longitude.is_finite() {
            Some(CoordinateFault::NonFinite)
        } else if !self.is_valid() {
            Some(CoordinateFault::OutOfRange)
        } else if service_area.is_some_and(|area| !area.contains(self)) {
            Some(CoordinateFault::OutsideServiceArea)
        } else {
            None
        };

        match fault {
            Some(reason) => Err(RouteMatchError::InvalidCoordinate {
                role: role.to_string(),
                latitude: self.latitude,
                longitude: self.longitude,
                reason,
            }),
            None => Ok(()),
        }
    }
}

/// A latitude/longitude rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Default service area: a rectangle around India.
    pub const INDIA: Bounds = Bounds {
        min_lat: 6.0,
        max_lat: 37.5,
        min_lng: 68.0,
        max_lng: 97.5,
    };

    /// Create bounds from points.
    pub fn from_points(points: &[GeoPoint]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let mut min_lat = f64::MAX;
        let mut max_lat = f64::MIN;
        let mut min_lng = f64::MAX;
        let mut max_lng = f64::MIN;

        for p in points {
            min_lat = min_lat.min(p.latitude);
            max_lat = max_lat.max(p.latitude);
            min_lng = min_lng.min(p.longitude);
            max_lng = max_lng.max(p.longitude);
        }

        Some(Self {
            min_lat,
            max_lat,
            min_lng,
            max_lng,
        })
    }

    /// Inclusive containment check.
    pub fn contains(&self, point: &GeoPoint) -> bool {
        point.latitude >= self.min_lat
            && point.latitude <= self.max_lat
            && point.longitude >= self.min_lng
            && point.longitude <= self.max_lng
    }

    /// Grow the rectangle by `degrees` on every side.
    pub fn expanded(&self, degrees: f64) -> Self {
        Self {
            min_lat: self.min_lat - degrees,
            max_lat: self.max_lat + degrees,
            min_lng: self.min_lng - degrees,
            max_lng: self.max_lng + degrees,
        }
    }
}

/// Configuration for route matching.
///
/// Every field has a deployment default; a partial JSON document only
/// overrides the fields it names (see [`MatchConfig::from_json_str`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Maximum distance from the driver route for either passenger endpoint.
    /// Default: 50,000 meters
    pub max_distance_meters: f64,

    /// Multiplier applied to `max_distance_meters` when one endpoint sits
    /// almost exactly on the route. Default: 1.5
    pub lenient_multiplier: f64,

    /// Endpoint distance at or below which the lenient threshold applies.
    /// Default: 1,000 meters
    pub lenient_trigger_meters: f64,

    /// Vertex indices at most this far apart are ordered by distance along
    /// the route instead. Default: 5
    pub close_index_window: u32,

    /// How far the source may sit past the destination along the route and
    /// still count as in order. Default: 500 meters
    pub order_tolerance_meters: f64,

    /// Reversed trips shorter than this share of the route are accepted.
    /// Default: 0.2
    pub reverse_segment_fraction_limit: f64,

    /// Reversed trips must also be shorter than this. Default: 50,000 meters
    pub reverse_segment_absolute_limit_meters: f64,

    /// Interpolation steps for synthetic polylines (0 disables the tier).
    /// Default: 10
    pub synthetic_waypoint_count: u32,

    /// Maximum detour slack for the coordinate fallback tier.
    /// Default: 5,000 meters
    pub coordinate_fallback_margin_meters: f64,

    /// Passenger endpoints further than this from undeclared geometry flag the
    /// geometry as possibly axis-swapped. Default: 500,000 meters
    pub orientation_suspect_meters: f64,

    /// Stored geometry with more vertices is simplified before matching
    /// (0 disables simplification). Default: 2000
    pub max_polyline_points: u32,

    /// Douglas-Peucker tolerance in degrees. Default: 0.0001 (~11 meters)
    pub simplification_tolerance: f64,

    /// Points outside this rectangle are rejected. `None` disables the check.
    /// Default: India
    pub service_area: Option<Bounds>,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            max_distance_meters: 50_000.0,
            lenient_multiplier: 1.5,
            lenient_trigger_meters: 1_000.0,
            close_index_window: 5,
            order_tolerance_meters: 500.0,
            reverse_segment_fraction_limit: 0.2,
            reverse_segment_absolute_limit_meters: 50_000.0,
            synthetic_waypoint_count: 10,
            coordinate_fallback_margin_meters: 5_000.0,
            orientation_suspect_meters: 500_000.0,
            max_polyline_points: 2000,
            simplification_tolerance: 0.0001,
            service_area: Some(Bounds::INDIA),
        }
    }
}

impl MatchConfig {
    /// Load configuration from a JSON document and validate it.
    ///
    /// # Example
    /// ```
    /// use ride_route_matcher::MatchConfig;
    ///
    /// let config = MatchConfig::from_json_str(r#"{"max_distance_meters": 20000}"#).unwrap();
    /// assert_eq!(config.max_distance_meters, 20_000.0);
    /// assert_eq!(config.lenient_multiplier, 1.5);
    /// ```
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: MatchConfig =
            serde_json::from_str(raw).map_err(|e| RouteMatchError::ConfigError {
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Check that thresholds are usable.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("max_distance_meters", self.max_distance_meters),
            ("lenient_trigger_meters", self.lenient_trigger_meters),
            ("order_tolerance_meters", self.order_tolerance_meters),
            (
                "reverse_segment_absolute_limit_meters",
                self.reverse_segment_absolute_limit_meters,
            ),
            (
                "coordinate_fallback_margin_meters",
                self.coordinate_fallback_margin_meters,
            ),
            ("orientation_suspect_meters", self.orientation_suspect_meters),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(config_error(format!("{} must be positive, got {}", name, value)));
            }
        }

        if !(self.lenient_multiplier.is_finite() && self.lenient_multiplier >= 1.0) {
            return Err(config_error(format!(
                "lenient_multiplier must be at least 1, got {}",
                self.lenient_multiplier
            )));
        }
        if !(self.reverse_segment_fraction_limit > 0.0 && self.reverse_segment_fraction_limit <= 1.0)
        {
            return Err(config_error(format!(
                "reverse_segment_fraction_limit must be in (0, 1], got {}",
                self.reverse_segment_fraction_limit
            )));
        }
        if !(self.simplification_tolerance.is_finite() && self.simplification_tolerance >= 0.0) {
            return Err(config_error(format!(
                "simplification_tolerance must be non-negative, got {}",
                self.simplification_tolerance
            )));
        }
        if let Some(area) = &self.service_area {
            if area.min_lat > area.max_lat || area.min_lng > area.max_lng {
                return Err(config_error("service_area is inverted".to_string()));
            }
        }
        Ok(())
    }

    /// Distance threshold for both endpoints given their route distances.
    pub fn effective_threshold(&self, max_distance_meters: f64, source_m: f64, dest_m: f64) -> f64 {
        if source_m <= self.lenient_trigger_meters || dest_m <= self.lenient_trigger_meters {
            max_distance_meters * self.lenient_multiplier
        } else {
            max_distance_meters
        }
    }
}

fn config_error(message: String) -> RouteMatchError {
    RouteMatchError::ConfigError { message }
}

/// The tier of the matching policy that produced a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    /// The driver's stored road geometry
    StoredGeometry,
    /// Great-circle polyline between the driver's endpoints
    SyntheticPolyline,
    /// Triangle-inequality check on the four endpoints
    CoordinateFallback,
}

/// Result of matching one passenger trip against one driver ride.
///
/// Diagnostic only; not persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub is_match: bool,
    /// Distance from the passenger source to the route, in meters
    pub source_distance_meters: f64,
    /// Distance from the passenger destination to the route, in meters
    pub destination_distance_meters: f64,
    /// Nearest route vertex to the passenger source
    pub source_index: Option<usize>,
    /// Nearest route vertex to the passenger destination
    pub destination_index: Option<usize>,
    /// Tier that produced the verdict (`None` if no tier could run)
    pub tier: Option<MatchTier>,
    /// Ordering rule applied, when the distance checks passed
    pub order: Option<OrderCheck>,
    /// Stored geometry of undeclared axis order put an endpoint implausibly far away
    pub orientation_suspect: bool,
}

impl MatchResult {
    /// A non-match with no tier able to adjudicate.
    pub fn unavailable() -> Self {
        Self {
            is_match: false,
            source_distance_meters: f64::INFINITY,
            destination_distance_meters: f64::INFINITY,
            source_index: None,
            destination_index: None,
            tier: None,
            order: None,
            orientation_suspect: false,
        }
    }
}
