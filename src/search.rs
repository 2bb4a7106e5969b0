//! Batch matching of one passenger search against many candidate rides.
//!
//! Each ride is evaluated independently, so the parallel variant needs no
//! coordination beyond collecting results. [`RideIndex`] adds an R-tree over
//! ride envelopes to skip rides that cannot be within reach of the passenger.

use std::collections::HashSet;

use log::{debug, info};
use rstar::{RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RouteMatchError};
use crate::geo_utils::meters_to_degrees;
use crate::matching::match_ride;
use crate::ride::{DriverRide, PassengerSearch};
use crate::synthetic::build_synthetic_polyline;
use crate::{Bounds, GeoPoint, MatchConfig, MatchResult};

/// A ride that matched the search, with its diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RideMatch {
    pub ride_id: String,
    pub result: MatchResult,
}

impl RideMatch {
    /// Combined off-route distance of pickup and drop-off; lower is better.
    pub fn detour_meters(&self) -> f64 {
        self.result.source_distance_meters + self.result.destination_distance_meters
    }
}

/// Validate the config and search once, before touching any ride.
fn search_endpoints(
    search: &PassengerSearch,
    config: &MatchConfig,
) -> Result<(GeoPoint, GeoPoint)> {
    config.validate()?;
    let (src, dst) = search
        .coordinates()
        .ok_or(RouteMatchError::MissingSearchCoordinates)?;
    let area = config.service_area.as_ref();
    src.validate("passenger source", area)?;
    dst.validate("passenger destination", area)?;
    Ok((src, dst))
}

/// Evaluate one ride; rides with unusable coordinates are skipped.
fn evaluate_candidate(
    ride: &DriverRide,
    search: &PassengerSearch,
    config: &MatchConfig,
) -> Option<RideMatch> {
    match match_ride(ride, search, config) {
        Ok(result) if result.is_match => Some(RideMatch {
            ride_id: ride.ride_id.clone(),
            result,
        }),
        Ok(_) => None,
        Err(e) => {
            debug!("[RideSearch] Skipping ride {}: {}", ride.ride_id, e);
            None
        }
    }
}

/// Closest fit first; ties broken by ride id for a stable order.
fn sort_matches(matches: &mut [RideMatch]) {
    matches.sort_by(|a, b| {
        a.detour_meters()
            .total_cmp(&b.detour_meters())
            .then_with(|| a.ride_id.cmp(&b.ride_id))
    });
}

fn collect_matches<'a>(
    rides: impl Iterator<Item = &'a DriverRide>,
    search: &PassengerSearch,
    config: &MatchConfig,
) -> Vec<RideMatch> {
    let mut matches: Vec<RideMatch> = rides
        .filter_map(|ride| evaluate_candidate(ride, search, config))
        .collect();
    sort_matches(&mut matches);
    matches
}

/// Match a search against every ride, returning matches closest-fit first.
///
/// Fails only when the search itself is unusable: missing an endpoint
/// (fall back to text matching) or carrying an invalid coordinate, or when
/// `config` does not validate.
pub fn match_rides(
    rides: &[DriverRide],
    search: &PassengerSearch,
    config: &MatchConfig,
) -> Result<Vec<RideMatch>> {
    search_endpoints(search, config)?;
    let matches = collect_matches(rides.iter(), search, config);
    info!(
        "[RideSearch] {} of {} rides matched",
        matches.len(),
        rides.len()
    );
    Ok(matches)
}

/// Parallel version of [`match_rides`].
///
/// Uses rayon to evaluate rides concurrently. Results are identical to the
/// sequential version.
#[cfg(feature = "parallel")]
pub fn match_rides_parallel(
    rides: &[DriverRide],
    search: &PassengerSearch,
    config: &MatchConfig,
) -> Result<Vec<RideMatch>> {
    use rayon::prelude::*;

    search_endpoints(search, config)?;

    let mut matches: Vec<RideMatch> = rides
        .par_iter()
        .filter_map(|ride| evaluate_candidate(ride, search, config))
        .collect();
    sort_matches(&mut matches);

    info!(
        "[RideSearch] {} of {} rides matched (parallel)",
        matches.len(),
        rides.len()
    );
    Ok(matches)
}

// ============================================================================
// Spatial prefilter
// ============================================================================

/// Envelope of everything a ride could be matched against.
#[derive(Debug, Clone)]
struct RideEnvelope {
    position: usize,
    bounds: Bounds,
}

impl RTreeObject for RideEnvelope {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(
            [self.bounds.min_lng, self.bounds.min_lat],
            [self.bounds.max_lng, self.bounds.max_lat],
        )
    }
}

/// Rides indexed by the area their route (stored or synthetic) covers.
///
/// A ride is a candidate only if both passenger endpoints fall within the
/// lenient distance threshold of its envelope. The coordinate fallback tier
/// can in principle reach slightly further on long degenerate rides; such
/// rides are rare enough that the index does not account for them.
pub struct RideIndex {
    rides: Vec<DriverRide>,
    tree: RTree<RideEnvelope>,
}

impl RideIndex {
    /// Build the index. Rides whose envelope cannot be computed are kept out
    /// of the tree and never returned as candidates.
    pub fn new(rides: Vec<DriverRide>, config: &MatchConfig) -> Self {
        let envelopes: Vec<RideEnvelope> = rides
            .iter()
            .enumerate()
            .filter_map(|(position, ride)| {
                ride_bounds(ride, config).map(|bounds| RideEnvelope { position, bounds })
            })
            .collect();

        if envelopes.len() < rides.len() {
            debug!(
                "[RideSearch] {} rides have no usable coordinates and were not indexed",
                rides.len() - envelopes.len()
            );
        }

        Self {
            rides,
            tree: RTree::bulk_load(envelopes),
        }
    }

    pub fn len(&self) -> usize {
        self.rides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rides.is_empty()
    }

    pub fn rides(&self) -> &[DriverRide] {
        &self.rides
    }

    /// Rides whose envelope is within reach of both passenger endpoints.
    pub fn candidates(
        &self,
        source: &GeoPoint,
        destination: &GeoPoint,
        config: &MatchConfig,
    ) -> Vec<&DriverRide> {
        let reach = config.max_distance_meters * config.lenient_multiplier;

        let near_source: HashSet<usize> = self
            .tree
            .locate_in_envelope_intersecting(&search_envelope(source, reach))
            .map(|e| e.position)
            .collect();

        let mut positions: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&search_envelope(destination, reach))
            .map(|e| e.position)
            .filter(|p| near_source.contains(p))
            .collect();
        positions.sort_unstable();

        positions.into_iter().map(|p| &self.rides[p]).collect()
    }

    /// Match a search against the indexed candidates only.
    pub fn match_search(
        &self,
        search: &PassengerSearch,
        config: &MatchConfig,
    ) -> Result<Vec<RideMatch>> {
        let (src, dst) = search_endpoints(search, config)?;
        let candidates = self.candidates(&src, &dst, config);
        let matches = collect_matches(candidates.iter().copied(), search, config);
        info!(
            "[RideSearch] {} of {} candidates matched ({} rides indexed)",
            matches.len(),
            candidates.len(),
            self.rides.len()
        );
        Ok(matches)
    }
}

/// Square envelope of `radius_meters` around a point.
fn search_envelope(point: &GeoPoint, radius_meters: f64) -> AABB<[f64; 2]> {
    let deg = meters_to_degrees(radius_meters, point.latitude);
    AABB::from_corners(
        [point.longitude - deg, point.latitude - deg],
        [point.longitude + deg, point.latitude + deg],
    )
}

/// Bounds of a ride's endpoints, stored geometry and synthetic route.
fn ride_bounds(ride: &DriverRide, config: &MatchConfig) -> Option<Bounds> {
    if !ride.source_coordinate.is_valid() || !ride.destination_coordinate.is_valid() {
        return None;
    }

    let mut points = ride.route_polyline().points().to_vec();
    points.extend(
        build_synthetic_polyline(
            &ride.source_coordinate,
            &ride.destination_coordinate,
            config.synthetic_waypoint_count,
        )
        .points(),
    );
    Bounds::from_points(&points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ride(id: &str, from: (f64, f64), to: (f64, f64)) -> DriverRide {
        DriverRide {
            ride_id: id.to_string(),
            source_coordinate: GeoPoint::new(from.0, from.1),
            destination_coordinate: GeoPoint::new(to.0, to.1),
            route_geometry: None,
            geometry_order: Default::default(),
        }
    }

    fn rides() -> Vec<DriverRide> {
        vec![
            // Along 17°N, exactly through the passenger's trip
            ride("exact", (17.0, 78.0), (17.0, 80.0)),
            // Parallel route ~22 km north
            ride("offset", (17.2, 78.0), (17.2, 80.0)),
            // Opposite direction
            ride("reverse", (17.0, 80.0), (17.0, 78.0)),
            // Delhi to Jaipur
            ride("far", (28.61, 77.21), (26.91, 75.79)),
        ]
    }

    fn search() -> PassengerSearch {
        PassengerSearch::new(GeoPoint::new(17.0, 78.5), GeoPoint::new(17.0, 79.5))
    }

    #[test]
    fn test_match_rides_sorted_by_detour() {
        let matches = match_rides(&rides(), &search(), &MatchConfig::default()).unwrap();
        let ids: Vec<&str> = matches.iter().map(|m| m.ride_id.as_str()).collect();
        assert_eq!(ids, vec!["exact", "offset"]);
        assert!(matches[0].detour_meters() < matches[1].detour_meters());
    }

    #[test]
    fn test_missing_search_coordinates() {
        let partial = PassengerSearch {
            source_coordinate: None,
            destination_coordinate: Some(GeoPoint::new(17.0, 79.5)),
        };
        assert_eq!(
            match_rides(&rides(), &partial, &MatchConfig::default()),
            Err(RouteMatchError::MissingSearchCoordinates)
        );
    }

    #[test]
    fn test_invalid_config_fails_search() {
        let config = MatchConfig {
            max_distance_meters: f64::NAN,
            ..MatchConfig::default()
        };
        assert!(matches!(
            match_rides(&rides(), &search(), &config),
            Err(RouteMatchError::ConfigError { .. })
        ));

        let index = RideIndex::new(rides(), &MatchConfig::default());
        assert!(matches!(
            index.match_search(&search(), &config),
            Err(RouteMatchError::ConfigError { .. })
        ));
    }

    #[test]
    fn test_invalid_ride_is_skipped() {
        let mut all = rides();
        all.push(ride("broken", (f64::NAN, 78.0), (17.0, 80.0)));
        let matches = match_rides(&all, &search(), &MatchConfig::default()).unwrap();
        assert_eq!(matches.len(), 2);
    }

    #[test]
    fn test_index_excludes_distant_rides() {
        let config = MatchConfig::default();
        let index = RideIndex::new(rides(), &config);
        assert_eq!(index.len(), 4);

        let src = GeoPoint::new(17.0, 78.5);
        let dst = GeoPoint::new(17.0, 79.5);
        let ids: Vec<&str> = index
            .candidates(&src, &dst, &config)
            .iter()
            .map(|r| r.ride_id.as_str())
            .collect();
        assert_eq!(ids, vec!["exact", "offset", "reverse"]);
    }

    #[test]
    fn test_index_agrees_with_full_scan() {
        let config = MatchConfig::default();
        let mut all = rides();
        let mut with_geometry = ride("stored", (17.0, 78.0), (17.0, 80.0));
        with_geometry.route_geometry = Some(json!([[78.0, 17.0], [79.0, 17.1], [80.0, 17.0]]));
        all.push(with_geometry);

        let index = RideIndex::new(all.clone(), &config);
        assert_eq!(
            index.match_search(&search(), &config).unwrap(),
            match_rides(&all, &search(), &config).unwrap()
        );
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_matches_sequential() {
        let config = MatchConfig::default();
        assert_eq!(
            match_rides_parallel(&rides(), &search(), &config).unwrap(),
            match_rides(&rides(), &search(), &config).unwrap()
        );
    }
}
