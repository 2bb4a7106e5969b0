//! Direction-of-travel check for a passenger trip against a driver route.
//!
//! Both passenger endpoints have already been found close enough to the
//! route; this decides whether the pickup comes before the drop-off.
//!
//! Rules, in order:
//! 1. A missing vertex index means the geometry is too sparse to judge: accept.
//! 2. Indices further apart than `close_index_window`: accept iff the source
//!    index is lower.
//! 3. Indices within the window: compare approximate distance along the route,
//!    accepting if the source is no more than `order_tolerance_meters` past the
//!    destination.
//! 4. A trip rejected by 2 or 3 is still accepted when it is a short hop, both
//!    relative to the route length and in absolute terms. Vertex snapping on a
//!    road that briefly doubles back can flip a short trip's indices.

use serde::{Deserialize, Serialize};

use crate::geo_utils::haversine_distance;
use crate::polyline::Polyline;
use crate::{GeoPoint, MatchConfig};

/// Outcome of the direction check, naming the rule that decided it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderCheck {
    /// No vertex index available; accepted without an ordering decision
    Unadjudicated,
    /// Source vertex clearly precedes destination vertex
    IndexOrder,
    /// Indices too close to call; accepted by distance along the route
    AlongRoute,
    /// Reversed, but short enough to be vertex-snapping noise
    ShortReverseHop,
    Rejected,
}

impl OrderCheck {
    pub fn is_accepted(self) -> bool {
        self != OrderCheck::Rejected
    }
}

/// Decide whether `source` precedes `destination` along `polyline`.
///
/// `source_index` and `destination_index` are the nearest vertex indices of
/// the two points (see [`Polyline::nearest_vertex_index`]).
pub fn check_route_order(
    polyline: &Polyline,
    source: &GeoPoint,
    destination: &GeoPoint,
    source_index: Option<usize>,
    destination_index: Option<usize>,
    config: &MatchConfig,
) -> OrderCheck {
    let (Some(src_idx), Some(dst_idx)) = (source_index, destination_index) else {
        return OrderCheck::Unadjudicated;
    };

    if src_idx.abs_diff(dst_idx) > config.close_index_window as usize {
        if src_idx < dst_idx {
            return OrderCheck::IndexOrder;
        }
    } else {
        let src_along = polyline.approx_distance_along_meters(source);
        let dst_along = polyline.approx_distance_along_meters(destination);
        if src_along < dst_along + config.order_tolerance_meters {
            return OrderCheck::AlongRoute;
        }
    }

    let hop = haversine_distance(source, destination);
    let route_length = polyline.length_meters();
    if hop < config.reverse_segment_fraction_limit * route_length
        && hop < config.reverse_segment_absolute_limit_meters
    {
        OrderCheck::ShortReverseHop
    } else {
        OrderCheck::Rejected
    }
}

/// Boolean form of [`check_route_order`].
pub fn is_in_route_order(
    polyline: &Polyline,
    source: &GeoPoint,
    destination: &GeoPoint,
    source_index: Option<usize>,
    destination_index: Option<usize>,
    config: &MatchConfig,
) -> bool {
    check_route_order(
        polyline,
        source,
        destination,
        source_index,
        destination_index,
        config,
    )
    .is_accepted()
}
