//! Records handed to the matcher by the booking layer.
//!
//! These mirror what the ride store and search endpoint expose. Field names
//! follow their camelCase JSON so records can be deserialized directly.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::polyline::{CoordinateOrder, Polyline};
use crate::GeoPoint;

/// A driver's posted ride.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverRide {
    pub ride_id: String,
    pub source_coordinate: GeoPoint,
    pub destination_coordinate: GeoPoint,
    /// Road-following polyline from the router: an array of 2-element arrays.
    /// Kept raw because its shape is not guaranteed.
    #[serde(default)]
    pub route_geometry: Option<Value>,
    /// Axis order of `route_geometry`, when the router declared it
    #[serde(default)]
    pub geometry_order: CoordinateOrder,
}

impl DriverRide {
    /// The ride's stored geometry, empty when missing or malformed.
    pub fn route_polyline(&self) -> Polyline {
        match &self.route_geometry {
            Some(raw) => Polyline::parse(raw, self.geometry_order),
            None => Polyline::empty(),
        }
    }
}

/// A passenger's search request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassengerSearch {
    #[serde(default)]
    pub source_coordinate: Option<GeoPoint>,
    #[serde(default)]
    pub destination_coordinate: Option<GeoPoint>,
}

impl PassengerSearch {
    pub fn new(source: GeoPoint, destination: GeoPoint) -> Self {
        Self {
            source_coordinate: Some(source),
            destination_coordinate: Some(destination),
        }
    }

    /// Both endpoints, or `None` if either is missing.
    ///
    /// Without both, route matching does not apply and the caller falls back
    /// to matching on place names.
    pub fn coordinates(&self) -> Option<(GeoPoint, GeoPoint)> {
        Some((self.source_coordinate?, self.destination_coordinate?))
    }
}
