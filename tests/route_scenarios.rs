//! End-to-end matching scenarios on the Hyderabad → Vijayawada corridor.
//!
//! Run with: `cargo test --test route_scenarios`
//! Add `-- --nocapture` and `RUST_LOG=debug` to see per-tier decisions.

use ride_route_matcher::geo_utils::{distance_to_segment_km, haversine_distance_km, slerp};
use ride_route_matcher::{
    build_synthetic_polyline, evaluate_match, is_in_route_order, match_ride, match_rides,
    CoordinateOrder, DriverRide, GeoPoint, MatchConfig, MatchTier, PassengerSearch, Polyline,
    RouteMatchError, RouteMatchQuery,
};
use serde_json::json;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn hyderabad() -> GeoPoint {
    GeoPoint::from_lon_lat(78.47, 17.38)
}

fn nalgonda() -> GeoPoint {
    GeoPoint::from_lon_lat(79.60, 17.05)
}

fn vijayawada() -> GeoPoint {
    GeoPoint::from_lon_lat(80.64, 16.50)
}

fn driver_ride(id: &str, geometry: Option<serde_json::Value>) -> DriverRide {
    DriverRide {
        ride_id: id.to_string(),
        source_coordinate: hyderabad(),
        destination_coordinate: vijayawada(),
        route_geometry: geometry,
        geometry_order: CoordinateOrder::LonLat,
    }
}

fn direct_ride() -> DriverRide {
    driver_ride("direct", Some(json!([[78.47, 17.38], [80.64, 16.50]])))
}

fn via_nalgonda_ride() -> DriverRide {
    driver_ride(
        "via-nalgonda",
        Some(json!([[78.47, 17.38], [79.60, 17.05], [80.64, 16.50]])),
    )
}

// ============================================================================
// Geometry properties
// ============================================================================

#[test]
fn distance_is_symmetric() {
    let points = [
        hyderabad(),
        nalgonda(),
        vijayawada(),
        GeoPoint::new(28.61, 77.21),
    ];
    for a in &points {
        for b in &points {
            let d1 = haversine_distance_km(a, b);
            let d2 = haversine_distance_km(b, a);
            assert!((d1 - d2).abs() < 1e-9);
        }
    }
}

#[test]
fn segment_distance_never_exceeds_endpoint_distance() {
    let probes = (0..20)
        .map(|i| GeoPoint::from_lon_lat(77.5 + i as f64 * 0.2, 16.0 + (i % 5) as f64 * 0.5));
    for p in probes {
        let d = distance_to_segment_km(&p, &hyderabad(), &vijayawada());
        let bound = haversine_distance_km(&p, &hyderabad())
            .min(haversine_distance_km(&p, &vijayawada()));
        assert!(d <= bound);
    }
}

#[test]
fn slerp_hits_both_endpoints() {
    let start = slerp(&hyderabad(), &vijayawada(), 0.0);
    let end = slerp(&hyderabad(), &vijayawada(), 1.0);
    assert!(haversine_distance_km(&start, &hyderabad()) < 1e-6);
    assert!(haversine_distance_km(&end, &vijayawada()) < 1e-6);
}

#[test]
fn synthetic_polyline_keeps_exact_endpoints() {
    for n in 1..=25 {
        let polyline = build_synthetic_polyline(&hyderabad(), &vijayawada(), n);
        assert_eq!(polyline.first(), Some(&hyderabad()));
        assert_eq!(polyline.last(), Some(&vijayawada()));
    }
}

#[test]
fn forward_vertex_pairs_are_in_order() {
    let route = Polyline::from_points(
        (0..12)
            .map(|i| GeoPoint::from_lon_lat(78.0 + i as f64 * 0.25, 17.0))
            .collect(),
    );
    let config = MatchConfig::default();
    for s in 0..route.len() {
        for d in (s + 1)..route.len() {
            let src = route.points()[s];
            let dst = route.points()[d];
            assert!(is_in_route_order(&route, &src, &dst, Some(s), Some(d), &config));
        }
    }
}

// ============================================================================
// Matching scenarios
// ============================================================================

#[test]
fn direct_match() {
    init_logging();
    let search = PassengerSearch::new(hyderabad(), vijayawada());
    let result = match_ride(&direct_ride(), &search, &MatchConfig::default()).unwrap();

    assert!(result.is_match);
    assert_eq!(result.tier, Some(MatchTier::StoredGeometry));
    assert!(result.source_distance_meters < 1.0);
    assert!(result.destination_distance_meters < 1.0);
}

#[test]
fn partial_mid_route_match() {
    init_logging();
    let search = PassengerSearch::new(GeoPoint::from_lon_lat(79.61, 17.06), vijayawada());
    let result = match_ride(&via_nalgonda_ride(), &search, &MatchConfig::default()).unwrap();

    assert!(result.is_match);
    assert_eq!(result.tier, Some(MatchTier::StoredGeometry));
    assert_eq!(result.source_index, Some(1));
    assert_eq!(result.destination_index, Some(2));
    assert!(result.source_distance_meters < 50_000.0);
}

#[test]
fn off_route_rejected() {
    init_logging();
    let search = PassengerSearch::new(
        GeoPoint::from_lon_lat(79.0, 18.0),
        GeoPoint::from_lon_lat(80.3, 17.25),
    );

    for ride in [direct_ride(), via_nalgonda_ride()] {
        let result = match_ride(&ride, &search, &MatchConfig::default()).unwrap();
        assert!(!result.is_match, "ride {} matched", ride.ride_id);
        assert!(result.source_distance_meters > 50_000.0);
        assert!(result.destination_distance_meters > 50_000.0);
    }
}

#[test]
fn missing_geometry_falls_back_to_synthetic() {
    init_logging();
    let ride = driver_ride("no-geometry", None);
    let search = PassengerSearch::new(GeoPoint::from_lon_lat(79.55, 16.95), vijayawada());
    let config = MatchConfig::default();

    let query = RouteMatchQuery::for_ride(&ride, &search, &config).unwrap();
    assert!(query.driver_polyline.is_empty());

    let synthetic = query.synthetic_polyline().unwrap();
    assert_eq!(synthetic.first(), Some(&ride.source_coordinate));
    assert_eq!(synthetic.last(), Some(&ride.destination_coordinate));

    let result = evaluate_match(&query, &config);
    assert_eq!(result.tier, Some(MatchTier::SyntheticPolyline));
    assert!(result.is_match);
}

#[test]
fn malformed_geometry_is_not_an_error() {
    init_logging();
    let ride = driver_ride("garbage", Some(json!({"encoded": "_p~iF~ps|U"})));
    let search = PassengerSearch::new(hyderabad(), vijayawada());
    let result = match_ride(&ride, &search, &MatchConfig::default()).unwrap();
    assert_eq!(result.tier, Some(MatchTier::SyntheticPolyline));
    assert!(result.is_match);
}

#[test]
fn evaluation_is_idempotent() {
    let search = PassengerSearch::new(GeoPoint::from_lon_lat(79.61, 17.06), vijayawada());
    let config = MatchConfig::default();
    let first = match_ride(&via_nalgonda_ride(), &search, &config).unwrap();
    let second = match_ride(&via_nalgonda_ride(), &search, &config).unwrap();
    assert_eq!(first, second);
}

#[test]
fn coordinates_outside_service_area_rejected() {
    let search = PassengerSearch::new(GeoPoint::new(51.5074, -0.1278), vijayawada());
    let err = match_ride(&direct_ride(), &search, &MatchConfig::default()).unwrap_err();
    assert!(matches!(err, RouteMatchError::InvalidCoordinate { .. }));

    // Without a service area the same point is only off-route
    let config = MatchConfig {
        service_area: None,
        ..MatchConfig::default()
    };
    let result = match_ride(&direct_ride(), &search, &config).unwrap();
    assert!(!result.is_match);
}

#[test]
fn search_across_rides() {
    init_logging();
    let mut rides = vec![
        direct_ride(),
        via_nalgonda_ride(),
        driver_ride("synthetic", None),
    ];
    rides.push(DriverRide {
        ride_id: "delhi-jaipur".to_string(),
        source_coordinate: GeoPoint::new(28.61, 77.21),
        destination_coordinate: GeoPoint::new(26.91, 75.79),
        route_geometry: None,
        geometry_order: CoordinateOrder::Unknown,
    });

    let search = PassengerSearch::new(GeoPoint::from_lon_lat(79.61, 17.06), vijayawada());
    let matches = match_rides(&rides, &search, &MatchConfig::default()).unwrap();

    let ids: Vec<&str> = matches.iter().map(|m| m.ride_id.as_str()).collect();
    assert_eq!(ids.len(), 3);
    assert_eq!(ids[0], "via-nalgonda");
    assert!(!ids.contains(&"delhi-jaipur"));
}
