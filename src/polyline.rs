//! Driver route polylines.
//!
//! A [`Polyline`] is an ordered list of points whose order is the direction of
//! travel. It comes either from a driver's stored road geometry or from the
//! synthetic builder. Stored geometry arrives as JSON-like `[[a, b], ...]`
//! pairs whose axis order is only sometimes declared by the producer, so each
//! polyline records how its orientation was established.
//!
//! Parsing is lenient by default: malformed geometry becomes an empty polyline,
//! which callers treat as "geometry unavailable".

use geo::{algorithm::simplify::Simplify, Coord, LineString};
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{OptionExt, Result, RouteMatchError};
use crate::geo_utils::{distance_to_segment_km, haversine_distance, polyline_length};
use crate::{Bounds, GeoPoint};

/// Axis order of raw coordinate pairs, as declared by whoever produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinateOrder {
    /// `[longitude, latitude]` (GeoJSON order)
    LonLat,
    /// `[latitude, longitude]`
    LatLon,
    /// Not declared; inferred from magnitudes at parse time
    #[default]
    Unknown,
}

/// How a polyline's axis order was established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrientationSource {
    /// The producer declared the order, or the points were built in code
    Declared,
    /// A component above 90 in magnitude could only be a longitude
    Inferred,
    /// Every component was within ±90; lon/lat was assumed without evidence
    Assumed,
}

/// An ordered route geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polyline {
    points: Vec<GeoPoint>,
    orientation: OrientationSource,
}

impl Default for Polyline {
    fn default() -> Self {
        Self::empty()
    }
}

impl Polyline {
    /// Create a polyline from points already in travel order.
    pub fn from_points(points: Vec<GeoPoint>) -> Self {
        Self {
            points,
            orientation: OrientationSource::Declared,
        }
    }

    /// A polyline with no geometry.
    pub fn empty() -> Self {
        Self::from_points(Vec::new())
    }

    /// Parse raw route geometry, yielding an empty polyline if it is malformed.
    ///
    /// # Example
    /// ```
    /// use ride_route_matcher::{CoordinateOrder, Polyline};
    ///
    /// let raw = serde_json::json!([[78.47, 17.38], [80.64, 16.50]]);
    /// let polyline = Polyline::parse(&raw, CoordinateOrder::LonLat);
    /// assert_eq!(polyline.len(), 2);
    ///
    /// let broken = serde_json::json!({"type": "LineString"});
    /// assert!(Polyline::parse(&broken, CoordinateOrder::Unknown).is_empty());
    /// ```
    pub fn parse(raw: &Value, order: CoordinateOrder) -> Self {
        Self::try_parse(raw, order).unwrap_or_else(|e| {
            debug!("[Polyline] Treating geometry as unavailable: {}", e);
            Self::empty()
        })
    }

    /// Parse raw route geometry from a JSON string, leniently.
    pub fn parse_json_str(raw: &str, order: CoordinateOrder) -> Self {
        match serde_json::from_str::<Value>(raw) {
            Ok(value) => Self::parse(&value, order),
            Err(e) => {
                debug!("[Polyline] Route geometry is not valid JSON: {}", e);
                Self::empty()
            }
        }
    }

    /// Parse raw route geometry, reporting why it is malformed.
    ///
    /// Geometry must be an array of 2-element numeric arrays. Pairs that decode
    /// to out-of-range coordinates are dropped rather than failing the parse.
    pub fn try_parse(raw: &Value, order: CoordinateOrder) -> Result<Self> {
        let items = raw
            .as_array()
            .ok_or_malformed("route geometry is not an array")?;

        let mut pairs = Vec::with_capacity(items.len());
        for item in items {
            let pair = item
                .as_array()
                .filter(|p| p.len() == 2)
                .ok_or_malformed("coordinate is not a 2-element array")?;
            let a = pair[0]
                .as_f64()
                .ok_or_malformed("coordinate component is not a number")?;
            let b = pair[1]
                .as_f64()
                .ok_or_malformed("coordinate component is not a number")?;
            pairs.push([a, b]);
        }

        Self::try_from_pairs(&pairs, order)
    }

    /// Build a polyline from raw coordinate pairs.
    pub fn try_from_pairs(pairs: &[[f64; 2]], order: CoordinateOrder) -> Result<Self> {
        let (order, orientation) = match order {
            CoordinateOrder::Unknown => detect_order(pairs)?,
            declared => (declared, OrientationSource::Declared),
        };

        let points: Vec<GeoPoint> = pairs
            .iter()
            .map(|&[a, b]| match order {
                CoordinateOrder::LatLon => GeoPoint::new(a, b),
                _ => GeoPoint::new(b, a),
            })
            .filter(|p| p.is_valid())
            .collect();

        if points.len() < pairs.len() {
            debug!(
                "[Polyline] Dropped {} of {} out-of-range coordinates",
                pairs.len() - points.len(),
                pairs.len()
            );
        }

        Ok(Self {
            points,
            orientation,
        })
    }

    /// The points in travel order.
    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&GeoPoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&GeoPoint> {
        self.points.last()
    }

    pub fn orientation(&self) -> OrientationSource {
        self.orientation
    }

    /// Total length in meters.
    pub fn length_meters(&self) -> f64 {
        polyline_length(&self.points)
    }

    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::from_points(&self.points)
    }

    /// See [`min_distance_to_polyline_meters`].
    pub fn min_distance_meters(&self, point: &GeoPoint) -> f64 {
        min_distance_to_polyline_meters(point, &self.points)
    }

    /// See [`nearest_vertex_index`].
    pub fn nearest_vertex_index(&self, point: &GeoPoint) -> Option<usize> {
        nearest_vertex_index(point, &self.points)
    }

    /// See [`approx_distance_along_polyline_meters`].
    pub fn approx_distance_along_meters(&self, point: &GeoPoint) -> f64 {
        approx_distance_along_polyline_meters(point, &self.points)
    }

    /// Douglas-Peucker simplification, tolerance in degrees.
    ///
    /// Endpoints are always kept and the orientation tag carries over.
    pub fn simplified(&self, tolerance: f64) -> Self {
        if self.points.len() < 3 {
            return self.clone();
        }
        let simplified = LineString::from(self).simplify(&tolerance);
        Self {
            points: simplified
                .coords()
                .map(|c| GeoPoint::new(c.y, c.x))
                .collect(),
            orientation: self.orientation,
        }
    }
}

impl From<&Polyline> for LineString<f64> {
    fn from(polyline: &Polyline) -> Self {
        LineString::new(
            polyline
                .points
                .iter()
                .map(|p| Coord {
                    x: p.longitude,
                    y: p.latitude,
                })
                .collect(),
        )
    }
}

impl From<LineString<f64>> for Polyline {
    fn from(line: LineString<f64>) -> Self {
        Self::from_points(line.coords().map(|c| GeoPoint::new(c.y, c.x)).collect())
    }
}

/// Decide the axis order of undeclared pairs from coordinate magnitudes.
fn detect_order(pairs: &[[f64; 2]]) -> Result<(CoordinateOrder, OrientationSource)> {
    let first_is_lng = pairs.iter().any(|p| p[0].abs() > 90.0);
    let second_is_lng = pairs.iter().any(|p| p[1].abs() > 90.0);

    match (first_is_lng, second_is_lng) {
        (true, true) => Err(RouteMatchError::MalformedGeometry {
            message: "values above 90 in both coordinate positions".to_string(),
        }),
        (true, false) => Ok((CoordinateOrder::LonLat, OrientationSource::Inferred)),
        (false, true) => Ok((CoordinateOrder::LatLon, OrientationSource::Inferred)),
        (false, false) => Ok((CoordinateOrder::LonLat, OrientationSource::Assumed)),
    }
}

/// Index of the segment nearest to `point`, with its distance in km.
fn nearest_segment(point: &GeoPoint, points: &[GeoPoint]) -> Option<(usize, f64)> {
    points
        .windows(2)
        .enumerate()
        .map(|(i, w)| (i, distance_to_segment_km(point, &w[0], &w[1])))
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

/// Minimum distance in meters from `point` to any segment of the polyline.
///
/// Returns `f64::INFINITY` for fewer than two points.
pub fn min_distance_to_polyline_meters(point: &GeoPoint, points: &[GeoPoint]) -> f64 {
    nearest_segment(point, points)
        .map(|(_, km)| km * 1000.0)
        .unwrap_or(f64::INFINITY)
}

/// Index of the vertex nearest to `point`, or `None` for an empty polyline.
///
/// Vertex-based rather than segment-based so that indices of points further
/// along the route never decrease.
pub fn nearest_vertex_index(point: &GeoPoint, points: &[GeoPoint]) -> Option<usize> {
    points
        .iter()
        .enumerate()
        .map(|(i, v)| (i, haversine_distance(point, v)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)
}

/// Approximate distance travelled along the polyline to reach `point`, in meters.
///
/// Sums full segment lengths up to the segment nearest `point`, then adds the
/// straight-line distance from that segment's start to `point`. The projected
/// point is not backed out, so this is only suitable for comparing two points
/// that sit near each other on the route.
pub fn approx_distance_along_polyline_meters(point: &GeoPoint, points: &[GeoPoint]) -> f64 {
    match nearest_segment(point, points) {
        Some((idx, _)) => polyline_length(&points[..=idx]) + haversine_distance(&points[idx], point),
        None => points
            .first()
            .map(|p| haversine_distance(p, point))
            .unwrap_or(0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn hyd_vja() -> Polyline {
        Polyline::from_points(vec![
            GeoPoint::from_lon_lat(78.47, 17.38),
            GeoPoint::from_lon_lat(79.60, 17.05),
            GeoPoint::from_lon_lat(80.64, 16.50),
        ])
    }

    #[test]
    fn test_parse_declared_lon_lat() {
        let raw = json!([[78.47, 17.38], [80.64, 16.50]]);
        let polyline = Polyline::parse(&raw, CoordinateOrder::LonLat);
        assert_eq!(polyline.len(), 2);
        assert_eq!(polyline.points()[0], GeoPoint::new(17.38, 78.47));
        assert_eq!(polyline.orientation(), OrientationSource::Declared);
    }

    #[test]
    fn test_parse_declared_lat_lon() {
        let raw = json!([[17.38, 78.47], [16.50, 80.64]]);
        let polyline = Polyline::parse(&raw, CoordinateOrder::LatLon);
        assert_eq!(polyline.points()[1], GeoPoint::new(16.50, 80.64));
    }

    #[test]
    fn test_parse_infers_order_from_magnitude() {
        // Longitudes above 90 can only be longitude
        let lon_first = json!([[100.5, 13.75], [100.6, 13.8]]);
        let polyline = Polyline::parse(&lon_first, CoordinateOrder::Unknown);
        assert_eq!(polyline.orientation(), OrientationSource::Inferred);
        assert_eq!(polyline.points()[0].longitude, 100.5);

        let lat_first = json!([[13.75, 100.5], [13.8, 100.6]]);
        let polyline = Polyline::parse(&lat_first, CoordinateOrder::Unknown);
        assert_eq!(polyline.orientation(), OrientationSource::Inferred);
        assert_eq!(polyline.points()[0].longitude, 100.5);
    }

    #[test]
    fn test_parse_ambiguous_defaults_to_lon_lat() {
        let raw = json!([[78.47, 17.38], [80.64, 16.50]]);
        let polyline = Polyline::parse(&raw, CoordinateOrder::Unknown);
        assert_eq!(polyline.orientation(), OrientationSource::Assumed);
        assert_eq!(polyline.points()[0].longitude, 78.47);
    }

    #[test]
    fn test_parse_malformed_is_empty() {
        for raw in [
            json!(null),
            json!("78.47,17.38"),
            json!([[78.47]]),
            json!([[78.47, "17.38"]]),
            json!([[120.0, 100.0], [121.0, 101.0]]),
        ] {
            assert!(Polyline::parse(&raw, CoordinateOrder::Unknown).is_empty());
        }
        assert!(Polyline::parse_json_str("not json", CoordinateOrder::Unknown).is_empty());
        assert!(matches!(
            Polyline::try_parse(&json!({}), CoordinateOrder::Unknown),
            Err(RouteMatchError::MalformedGeometry { .. })
        ));
    }

    #[test]
    fn test_parse_drops_out_of_range_points() {
        let raw = json!([[78.47, 17.38], [200.0, 17.0], [80.64, 16.50]]);
        let polyline = Polyline::parse(&raw, CoordinateOrder::LonLat);
        assert_eq!(polyline.len(), 2);
    }

    #[test]
    fn test_min_distance() {
        let polyline = hyd_vja();
        let on_vertex = GeoPoint::from_lon_lat(79.60, 17.05);
        assert!(polyline.min_distance_meters(&on_vertex) < 1.0);

        let single = Polyline::from_points(vec![on_vertex]);
        assert_eq!(single.min_distance_meters(&on_vertex), f64::INFINITY);
        assert_eq!(Polyline::empty().min_distance_meters(&on_vertex), f64::INFINITY);
    }

    #[test]
    fn test_nearest_vertex_index() {
        let polyline = hyd_vja();
        assert_eq!(
            polyline.nearest_vertex_index(&GeoPoint::from_lon_lat(79.61, 17.06)),
            Some(1)
        );
        assert_eq!(
            polyline.nearest_vertex_index(&GeoPoint::from_lon_lat(80.60, 16.52)),
            Some(2)
        );
        assert_eq!(
            Polyline::empty().nearest_vertex_index(&GeoPoint::from_lon_lat(80.0, 17.0)),
            None
        );
    }

    #[test]
    fn test_distance_along_increases_with_travel() {
        let polyline = hyd_vja();
        let start = polyline.approx_distance_along_meters(&GeoPoint::from_lon_lat(78.47, 17.38));
        let middle = polyline.approx_distance_along_meters(&GeoPoint::from_lon_lat(79.60, 17.05));
        let end = polyline.approx_distance_along_meters(&GeoPoint::from_lon_lat(80.64, 16.50));

        assert!(start < 1.0);
        assert!(start < middle && middle < end);
        assert!((end - polyline.length_meters()).abs() < 1.0);
    }

    #[test]
    fn test_simplified_keeps_endpoints() {
        let points: Vec<GeoPoint> = (0..50)
            .map(|i| GeoPoint::new(17.0, 78.0 + i as f64 * 0.01))
            .collect();
        let polyline = Polyline::from_points(points.clone());
        let simplified = polyline.simplified(0.0001);

        assert!(simplified.len() < polyline.len());
        assert_eq!(simplified.first(), points.first());
        assert_eq!(simplified.last(), points.last());
    }

    #[test]
    fn test_line_string_round_trip() {
        let polyline = hyd_vja();
        let line = LineString::from(&polyline);
        assert_eq!(line.0[0].x, 78.47);
        assert_eq!(Polyline::from(line), polyline);
    }
}
