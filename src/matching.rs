//! Three-tier route matching.
//!
//! For each candidate ride the tiers are tried in order and the first one that
//! can decide wins:
//!
//! 1. **Stored geometry** - the driver's road polyline. Both passenger
//!    endpoints must lie within the distance threshold of it and in travel
//!    order. A rejection here falls through to tier 2.
//! 2. **Synthetic polyline** - a great-circle polyline between the driver's
//!    endpoints, checked the same way. Its verdict is final.
//! 3. **Coordinate fallback** - only when neither polyline exists: accept if
//!    the detour `driver source → pickup → drop-off → driver destination` is
//!    barely longer than the direct driver trip. Only meaningful for
//!    near-straight routes.

use log::{debug, warn};

use crate::error::{Result, RouteMatchError};
use crate::geo_utils::haversine_distance;
use crate::ordering::check_route_order;
use crate::polyline::{OrientationSource, Polyline};
use crate::ride::{DriverRide, PassengerSearch};
use crate::synthetic::build_synthetic_polyline;
use crate::{GeoPoint, MatchConfig, MatchResult, MatchTier};

/// Driver endpoints closer than this cannot define a synthetic route.
const DEGENERATE_ROUTE_METERS: f64 = 1.0;

/// Everything needed to evaluate one passenger trip against one driver ride.
///
/// Built per candidate and discarded after evaluation. `max_distance_meters`
/// and `synthetic_waypoint_count` start from the config and may be overridden
/// for a single evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteMatchQuery {
    /// Stored geometry; empty when the ride has none
    pub driver_polyline: Polyline,
    pub driver_source: GeoPoint,
    pub driver_destination: GeoPoint,
    pub passenger_source: GeoPoint,
    pub passenger_destination: GeoPoint,
    pub max_distance_meters: f64,
    pub synthetic_waypoint_count: u32,
}

impl RouteMatchQuery {
    /// Build a query for `ride` and `search`, validating every coordinate.
    ///
    /// Fails with [`RouteMatchError::MissingSearchCoordinates`] when the search
    /// lacks an endpoint and [`RouteMatchError::InvalidCoordinate`] when any of
    /// the four endpoints is out of range or outside the service area.
    /// An invalid `config` fails with [`RouteMatchError::ConfigError`].
    /// Oversized stored geometry is simplified here.
    pub fn for_ride(
        ride: &DriverRide,
        search: &PassengerSearch,
        config: &MatchConfig,
    ) -> Result<Self> {
        config.validate()?;

        let (passenger_source, passenger_destination) = search
            .coordinates()
            .ok_or(RouteMatchError::MissingSearchCoordinates)?;

        let area = config.service_area.as_ref();
        passenger_source.validate("passenger source", area)?;
        passenger_destination.validate("passenger destination", area)?;
        ride.source_coordinate.validate("driver source", area)?;
        ride.destination_coordinate.validate("driver destination", area)?;

        let mut driver_polyline = ride.route_polyline();
        let max_points = config.max_polyline_points as usize;
        if max_points > 0 && driver_polyline.len() > max_points {
            let before = driver_polyline.len();
            driver_polyline = driver_polyline.simplified(config.simplification_tolerance);
            debug!(
                "[RouteMatcher] Simplified ride {} geometry from {} to {} points",
                ride.ride_id,
                before,
                driver_polyline.len()
            );
        }

        Ok(Self {
            driver_polyline,
            driver_source: ride.source_coordinate,
            driver_destination: ride.destination_coordinate,
            passenger_source,
            passenger_destination,
            max_distance_meters: config.max_distance_meters,
            synthetic_waypoint_count: config.synthetic_waypoint_count,
        })
    }

    /// Override the distance threshold for this evaluation only.
    ///
    /// The threshold must be finite and positive.
    pub fn with_max_distance(mut self, meters: f64) -> Result<Self> {
        if !(meters.is_finite() && meters > 0.0) {
            return Err(RouteMatchError::ConfigError {
                message: format!("max distance override must be positive, got {}", meters),
            });
        }
        self.max_distance_meters = meters;
        Ok(self)
    }

    /// Override the synthetic polyline resolution (0 disables tier 2).
    pub fn with_synthetic_waypoints(mut self, count: u32) -> Self {
        self.synthetic_waypoint_count = count;
        self
    }

    /// The synthetic route tier 2 would use, or `None` if tier 2 cannot run.
    pub fn synthetic_polyline(&self) -> Option<Polyline> {
        if self.synthetic_waypoint_count == 0
            || haversine_distance(&self.driver_source, &self.driver_destination)
                < DEGENERATE_ROUTE_METERS
        {
            return None;
        }
        Some(build_synthetic_polyline(
            &self.driver_source,
            &self.driver_destination,
            self.synthetic_waypoint_count,
        ))
    }
}

/// Match one ride against one search.
///
/// # Example
/// ```
/// use ride_route_matcher::{match_ride, DriverRide, GeoPoint, MatchConfig, PassengerSearch};
///
/// let ride = DriverRide {
///     ride_id: "hyd-vja".to_string(),
///     source_coordinate: GeoPoint::from_lon_lat(78.47, 17.38),
///     destination_coordinate: GeoPoint::from_lon_lat(80.64, 16.50),
///     route_geometry: None,
///     geometry_order: Default::default(),
/// };
/// let search = PassengerSearch::new(
///     GeoPoint::from_lon_lat(79.0, 18.0),
///     GeoPoint::from_lon_lat(80.3, 17.25),
/// );
///
/// let result = match_ride(&ride, &search, &MatchConfig::default()).unwrap();
/// assert!(!result.is_match);
/// ```
pub fn match_ride(
    ride: &DriverRide,
    search: &PassengerSearch,
    config: &MatchConfig,
) -> Result<MatchResult> {
    let query = RouteMatchQuery::for_ride(ride, search, config)?;
    let result = evaluate_match(&query, config);
    debug!(
        "[RouteMatcher] Ride {}: match={} tier={:?} src={:.0}m dst={:.0}m",
        ride.ride_id,
        result.is_match,
        result.tier,
        result.source_distance_meters,
        result.destination_distance_meters
    );
    Ok(result)
}

/// Run the tiered matching policy for a validated query.
///
/// Pure: the same query and config always produce the same result.
pub fn evaluate_match(query: &RouteMatchQuery, config: &MatchConfig) -> MatchResult {
    let mut stored = None;

    if !query.driver_polyline.is_empty() {
        let mut result = evaluate_polyline(
            &query.driver_polyline,
            query,
            config,
            MatchTier::StoredGeometry,
        );
        result.orientation_suspect = orientation_suspect(&query.driver_polyline, &result, config);
        if result.orientation_suspect {
            warn!(
                "[RouteMatcher] Stored geometry ({:?} axis order) is {:.0}km/{:.0}km from the passenger; coordinates may be swapped",
                query.driver_polyline.orientation(),
                result.source_distance_meters / 1000.0,
                result.destination_distance_meters / 1000.0
            );
        }
        if result.is_match {
            return result;
        }
        debug!("[RouteMatcher] Stored geometry rejected, trying synthetic polyline");
        stored = Some(result);
    }

    let suspect = stored.as_ref().is_some_and(|r| r.orientation_suspect);

    if let Some(synthetic) = query.synthetic_polyline() {
        let mut result =
            evaluate_polyline(&synthetic, query, config, MatchTier::SyntheticPolyline);
        result.orientation_suspect = suspect;
        return result;
    }

    // A stored-geometry rejection outranks the coordinate check
    if let Some(result) = stored {
        return result;
    }

    debug!("[RouteMatcher] No route geometry available, using coordinate fallback");
    evaluate_coordinates(query, config)
}

/// Distance and ordering checks against one polyline.
fn evaluate_polyline(
    polyline: &Polyline,
    query: &RouteMatchQuery,
    config: &MatchConfig,
    tier: MatchTier,
) -> MatchResult {
    let source_distance_meters = polyline.min_distance_meters(&query.passenger_source);
    let destination_distance_meters = polyline.min_distance_meters(&query.passenger_destination);
    let source_index = polyline.nearest_vertex_index(&query.passenger_source);
    let destination_index = polyline.nearest_vertex_index(&query.passenger_destination);

    let mut result = MatchResult {
        is_match: false,
        source_distance_meters,
        destination_distance_meters,
        source_index,
        destination_index,
        tier: Some(tier),
        order: None,
        orientation_suspect: false,
    };

    let threshold = config.effective_threshold(
        query.max_distance_meters,
        source_distance_meters,
        destination_distance_meters,
    );
    // NaN distances or thresholds never pass
    if !(source_distance_meters <= threshold && destination_distance_meters <= threshold) {
        debug!(
            "[RouteMatcher] {:?}: endpoints {:.0}m/{:.0}m exceed {:.0}m",
            tier, source_distance_meters, destination_distance_meters, threshold
        );
        return result;
    }

    let order = check_route_order(
        polyline,
        &query.passenger_source,
        &query.passenger_destination,
        source_index,
        destination_index,
        config,
    );
    result.order = Some(order);
    result.is_match = order.is_accepted();
    result
}

/// Triangle-inequality check on the four endpoints.
fn evaluate_coordinates(query: &RouteMatchQuery, config: &MatchConfig) -> MatchResult {
    let pickup_leg = haversine_distance(&query.driver_source, &query.passenger_source);
    let shared_leg = haversine_distance(&query.passenger_source, &query.passenger_destination);
    let dropoff_leg = haversine_distance(&query.passenger_destination, &query.driver_destination);
    let direct = haversine_distance(&query.driver_source, &query.driver_destination);

    let slack = pickup_leg + shared_leg + dropoff_leg - direct;

    MatchResult {
        is_match: slack < config.coordinate_fallback_margin_meters,
        source_distance_meters: pickup_leg,
        destination_distance_meters: dropoff_leg,
        source_index: None,
        destination_index: None,
        tier: Some(MatchTier::CoordinateFallback),
        order: None,
        orientation_suspect: false,
    }
}

/// Undeclared geometry that puts a passenger endpoint implausibly far away is
/// more likely axis-swapped than genuinely off route.
fn orientation_suspect(polyline: &Polyline, result: &MatchResult, config: &MatchConfig) -> bool {
    if polyline.orientation() == OrientationSource::Declared {
        return false;
    }
    [
        result.source_distance_meters,
        result.destination_distance_meters,
    ]
    .iter()
    .any(|d| d.is_finite() && *d > config.orientation_suspect_meters)
}
