//! Café Map Library - Clustering and Reconciliation Engine for POI Maps
//!
//! This library takes a set of geo-tagged café listings and keeps an interactive
//! map surface in sync with it: points inside the current viewport are rendered
//! as individual markers at high zoom, merged into distance-based clusters at
//! low zoom, and the displayed set is reconciled incrementally (minimal
//! add/remove operations) on every pan or zoom so that nothing flickers and no
//! marker handle leaks.
//!
//! # Architecture
//!
//! - **[`CafeStore`]**: Immutable store for validated café points
//! - **[`cluster_cafes`]**: Deterministic greedy distance clustering per zoom level
//! - **[`visible_cafes`]**: Viewport bounding-box filter
//! - **[`MarkerReconciler`]**: Owner of the rendered-handle mapping; diffs desired
//!   vs. live markers on every trigger
//! - **[`SelectionController`]**: Single selected café plus the one transient popup
//! - **[`MapSurface`]**: Capability boundary to the actual map rendering engine
//!
//! The map surface itself (tiles, projection, input handling) is an external
//! collaborator; [`HeadlessSurface`] is an in-memory implementation for tests
//! and headless runs.

mod cafe;
mod cluster;
mod geolocation;
mod position;
mod reconciler;
mod selection;
mod storage;
mod store;
mod surface;
pub mod text;
pub mod utils;
mod viewport;

// Public API exports
pub use cafe::{Cafe, CafeRecord};
pub use cluster::{Cluster, cluster_cafes, cluster_distance_for_zoom};
pub use geolocation::{
    GeolocationError, LOCATION_FLY_DURATION_MS, LOCATION_FLY_ZOOM, LocationOptions,
    LocationProvider, UserLocation, accuracy_radius_px, fly_to_location,
};
pub use position::{DEFAULT_FOCUS_ZOOM, NARROW_VIEWPORT_PX, focus_center, is_narrow_viewport};
pub use reconciler::{
    DEFAULT_ZOOM_THRESHOLD, MarkerReconciler, ReconcileOutcome, ReconcileStatus, RenderMode,
    RenderedEntity,
};
pub use selection::SelectionController;
pub use storage::{
    FileStorage, MAP_STATE_KEY, MemoryStorage, SavedMapState, StorageBackend, StorageError,
    StorageResult, load_map_state, now_ms, save_map_state,
};
pub use store::{CafeStore, StoreInfo};
pub use surface::{
    FlyTo, HeadlessSurface, MapSurface, MarkerDescriptor, MarkerHandle, PopupHandle, SurfaceError,
    SurfaceOps, SurfaceResult,
};
pub use viewport::{BoundingBox, Viewport, visible_cafes};

/// Error types for the café map engine
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid dataset: {0}")]
    InvalidData(String),

    #[error("map surface error: {0}")]
    Surface(#[from] SurfaceError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MapError>;
