//! Geolocation contract
//!
//! Device positioning is an external collaborator behind [`LocationProvider`];
//! the engine only consumes the resulting fix. Location failures are expected
//! (denied permission, indoors, airplane mode) and never disturb the marker
//! reconciliation, which keeps working from the last viewport.

use crate::surface::{FlyTo, MapSurface, SurfaceResult};
use geo::Point;
use std::time::Duration;

/// Zoom level after flying to the user's position
pub const LOCATION_FLY_ZOOM: f64 = 16.0;

/// Fly animation duration towards the user's position
pub const LOCATION_FLY_DURATION_MS: u64 = 3000;

/// Display radius bounds for the accuracy circle, in pixels
const ACCURACY_RADIUS_MIN_PX: f64 = 20.0;
const ACCURACY_RADIUS_MAX_PX: f64 = 100.0;

/// A position fix from the device
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UserLocation {
    /// Position as (lng, lat) in WGS84 degrees
    pub position: Point<f64>,
    /// Reported accuracy radius in meters, when the provider supplies one
    pub accuracy_m: Option<f64>,
}

/// Options forwarded to the positioning collaborator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationOptions {
    pub high_accuracy: bool,
    /// Give up waiting for a fix after this long
    pub timeout: Duration,
    /// Accept a cached fix no older than this
    pub max_age: Duration,
}

impl Default for LocationOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout: Duration::from_secs(10),
            max_age: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Clone, Copy, thiserror::Error, PartialEq, Eq)]
pub enum GeolocationError {
    #[error("location permission denied")]
    PermissionDenied,

    #[error("position unavailable")]
    Unavailable,

    #[error("timed out waiting for a position fix")]
    Timeout,

    #[error("geolocation is not supported on this device")]
    Unsupported,
}

/// Source of device position fixes (an external collaborator)
pub trait LocationProvider {
    fn current_location(
        &mut self,
        options: &LocationOptions,
    ) -> Result<UserLocation, GeolocationError>;
}

/// Display radius in pixels for the accuracy circle around the user dot.
///
/// One tenth of the reported accuracy in meters, clamped so a very precise fix
/// still shows a visible circle and a very poor one does not flood the map.
#[inline]
pub fn accuracy_radius_px(accuracy_m: f64) -> f64 {
    (accuracy_m / 10.0).clamp(ACCURACY_RADIUS_MIN_PX, ACCURACY_RADIUS_MAX_PX)
}

/// Fly the camera to a position fix at the location zoom
pub fn fly_to_location(surface: &mut dyn MapSurface, location: &UserLocation) -> SurfaceResult<()> {
    surface.fly_to(FlyTo {
        center: location.position,
        zoom: Some(LOCATION_FLY_ZOOM),
        duration_ms: Some(LOCATION_FLY_DURATION_MS),
    })
}
