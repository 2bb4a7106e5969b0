//! Unified error handling for the ride route matcher.
//!
//! Matching itself never fails: degenerate or missing geometry demotes a
//! candidate to a lower tier. Errors only surface at the boundary, when
//! coordinates handed to the matcher are unusable or configuration is invalid.

use thiserror::Error;

/// Why a coordinate was rejected at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CoordinateFault {
    /// Latitude or longitude is NaN or infinite
    #[error("not a finite number")]
    NonFinite,
    /// Outside [-90, 90] latitude or [-180, 180] longitude
    #[error("outside latitude/longitude range")]
    OutOfRange,
    /// Valid on the globe but outside the configured service area
    #[error("outside the service area")]
    OutsideServiceArea,
}

/// Unified error type for route matching operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RouteMatchError {
    /// A coordinate failed boundary validation
    #[error("{role} coordinate ({latitude}, {longitude}) is {reason}")]
    InvalidCoordinate {
        role: String,
        latitude: f64,
        longitude: f64,
        reason: CoordinateFault,
    },
    /// Route geometry could not be read as an ordered list of coordinate pairs
    #[error("Malformed route geometry: {message}")]
    MalformedGeometry { message: String },
    /// The passenger search did not carry both a source and a destination
    #[error("Search request is missing source or destination coordinates")]
    MissingSearchCoordinates,
    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError { message: String },
}

/// Result type alias for route matching operations.
pub type Result<T> = std::result::Result<T, RouteMatchError>;

/// Extension trait for converting Option to RouteMatchError.
pub trait OptionExt<T> {
    /// Convert Option to Result with a malformed geometry error.
    fn ok_or_malformed(self, message: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_malformed(self, message: &str) -> Result<T> {
        self.ok_or_else(|| RouteMatchError::MalformedGeometry {
            message: message.to_string(),
        })
    }
}
