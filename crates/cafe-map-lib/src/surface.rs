//! Map surface capability boundary
//!
//! The actual map rendering engine (tiles, projection, input handling) is an
//! external collaborator. This module defines the narrow capability trait the
//! engine consumes — atomic viewport sampling, marker placement, fly-to and a
//! single transient popup — plus [`HeadlessSurface`], an in-memory
//! implementation used by tests and the headless CLI driver.

use crate::viewport::{BoundingBox, Viewport};
use geo::Point;
use std::collections::BTreeMap;

#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
    #[error("map surface is not ready")]
    NotReady,

    #[error("map surface has been torn down")]
    TornDown,

    #[error("unknown marker handle: {0}")]
    UnknownHandle(u64),
}

pub type SurfaceResult<T> = Result<T, SurfaceError>;

/// Opaque reference to a live marker on the surface.
///
/// Returned by [`MapSurface::add_marker`] and required later to remove it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerHandle(pub(crate) u64);

/// Opaque reference to the transient popup/label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PopupHandle(pub(crate) u64);

/// What to draw for a marker. Individual cafés and clusters share one marker
/// namespace on the surface, keyed by the entity id.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkerDescriptor {
    Cafe {
        id: String,
        position: Point<f64>,
        label: Option<String>,
        thumbnail_url: Option<String>,
    },
    Cluster {
        id: String,
        position: Point<f64>,
        count: usize,
    },
}

impl MarkerDescriptor {
    #[inline]
    pub fn id(&self) -> &str {
        match self {
            Self::Cafe { id, .. } | Self::Cluster { id, .. } => id,
        }
    }

    #[inline]
    pub fn position(&self) -> Point<f64> {
        match self {
            Self::Cafe { position, .. } | Self::Cluster { position, .. } => *position,
        }
    }

    #[inline]
    pub fn is_cluster(&self) -> bool {
        matches!(self, Self::Cluster { .. })
    }
}

/// Fly-to request. Animations are fire-and-forget; a later fly supersedes an
/// earlier one (last-wins), so no cancel API exists.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlyTo {
    /// Target center as (lng, lat)
    pub center: Point<f64>,
    /// Target zoom; None keeps the current zoom
    pub zoom: Option<f64>,
    /// Animation duration; None uses the surface default
    pub duration_ms: Option<u64>,
}

/// Capability interface the engine requires from a map rendering surface.
///
/// `viewport()` must return bounds and zoom from a single consistent snapshot
/// so a reconcile pass never sees two different boxes.
pub trait MapSurface {
    /// Current bounds and zoom, sampled atomically
    fn viewport(&self) -> SurfaceResult<Viewport>;

    /// Width of the map container in pixels
    fn width_px(&self) -> SurfaceResult<f64>;

    /// Place a marker; the returned handle must later be passed to
    /// `remove_marker` exactly once.
    fn add_marker(&mut self, descriptor: &MarkerDescriptor) -> SurfaceResult<MarkerHandle>;

    /// Remove a previously added marker
    fn remove_marker(&mut self, handle: MarkerHandle) -> SurfaceResult<()>;

    /// Animate the camera to a new center (and optionally zoom)
    fn fly_to(&mut self, target: FlyTo) -> SurfaceResult<()>;

    /// Show a transient popup/label at a coordinate
    fn show_popup(&mut self, position: Point<f64>, text: &str) -> SurfaceResult<PopupHandle>;

    /// Remove a previously shown popup
    fn remove_popup(&mut self, handle: PopupHandle) -> SurfaceResult<()>;
}

/// Operation counters maintained by [`HeadlessSurface`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SurfaceOps {
    pub markers_added: usize,
    pub markers_removed: usize,
    pub popups_shown: usize,
    pub popups_removed: usize,
    pub fly_to_calls: usize,
}

/// In-memory map surface for tests and headless runs.
///
/// Markers and popups live in handle arenas; `fly_to` moves the scripted
/// viewport (scaling the visible span by powers of two on zoom changes) so a
/// headless session behaves like a real camera.
pub struct HeadlessSurface {
    viewport: Viewport,
    width_px: f64,
    next_handle: u64,
    markers: BTreeMap<MarkerHandle, MarkerDescriptor>,
    popups: BTreeMap<PopupHandle, (Point<f64>, String)>,
    last_fly_to: Option<FlyTo>,
    ops: SurfaceOps,
    torn_down: bool,
    /// Remaining add_marker calls before the surface reports failure
    /// (None = unlimited); lets tests exercise mid-pass abort paths.
    marker_add_budget: Option<usize>,
}

impl HeadlessSurface {
    pub fn new(viewport: Viewport, width_px: f64) -> Self {
        Self {
            viewport,
            width_px,
            next_handle: 1,
            markers: BTreeMap::new(),
            popups: BTreeMap::new(),
            last_fly_to: None,
            ops: SurfaceOps::default(),
            torn_down: false,
            marker_add_budget: None,
        }
    }

    /// Replace the scripted viewport (simulates a pan/zoom settling)
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Simulate the embedding tearing the map down mid-session
    pub fn tear_down(&mut self) {
        self.torn_down = true;
    }

    /// Allow only `n` further successful `add_marker` calls
    pub fn limit_marker_adds(&mut self, n: Option<usize>) {
        self.marker_add_budget = n;
    }

    pub fn markers(&self) -> impl Iterator<Item = &MarkerDescriptor> {
        self.markers.values()
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    pub fn popup_count(&self) -> usize {
        self.popups.len()
    }

    /// Text of the currently shown popups (normally zero or one)
    pub fn popup_texts(&self) -> Vec<&str> {
        self.popups.values().map(|(_, text)| text.as_str()).collect()
    }

    pub fn last_fly_to(&self) -> Option<FlyTo> {
        self.last_fly_to
    }

    pub fn ops(&self) -> SurfaceOps {
        self.ops
    }

    fn check_ready(&self) -> SurfaceResult<()> {
        if self.torn_down {
            Err(SurfaceError::TornDown)
        } else {
            Ok(())
        }
    }

    fn issue_handle(&mut self) -> u64 {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }
}

impl MapSurface for HeadlessSurface {
    fn viewport(&self) -> SurfaceResult<Viewport> {
        self.check_ready()?;
        Ok(self.viewport)
    }

    fn width_px(&self) -> SurfaceResult<f64> {
        self.check_ready()?;
        Ok(self.width_px)
    }

    fn add_marker(&mut self, descriptor: &MarkerDescriptor) -> SurfaceResult<MarkerHandle> {
        self.check_ready()?;
        if let Some(budget) = self.marker_add_budget.as_mut() {
            if *budget == 0 {
                return Err(SurfaceError::NotReady);
            }
            *budget -= 1;
        }
        let handle = MarkerHandle(self.issue_handle());
        self.markers.insert(handle, descriptor.clone());
        self.ops.markers_added += 1;
        Ok(handle)
    }

    fn remove_marker(&mut self, handle: MarkerHandle) -> SurfaceResult<()> {
        self.check_ready()?;
        self.markers
            .remove(&handle)
            .ok_or(SurfaceError::UnknownHandle(handle.0))?;
        self.ops.markers_removed += 1;
        Ok(())
    }

    fn fly_to(&mut self, target: FlyTo) -> SurfaceResult<()> {
        self.check_ready()?;
        // Keep the visible span coherent with the zoom change: each zoom
        // level halves the span.
        let old_zoom = self.viewport.zoom;
        let new_zoom = target.zoom.unwrap_or(old_zoom);
        let scale = (old_zoom - new_zoom).exp2();
        let bounds = BoundingBox::around(
            target.center,
            self.viewport.bounds.lng_span() * scale,
            self.viewport.bounds.lat_span() * scale,
        );
        self.viewport = Viewport {
            bounds,
            zoom: new_zoom,
        };
        self.last_fly_to = Some(target);
        self.ops.fly_to_calls += 1;
        Ok(())
    }

    fn show_popup(&mut self, position: Point<f64>, text: &str) -> SurfaceResult<PopupHandle> {
        self.check_ready()?;
        let handle = PopupHandle(self.issue_handle());
        self.popups.insert(handle, (position, text.to_string()));
        self.ops.popups_shown += 1;
        Ok(handle)
    }

    fn remove_popup(&mut self, handle: PopupHandle) -> SurfaceResult<()> {
        self.check_ready()?;
        self.popups
            .remove(&handle)
            .ok_or(SurfaceError::UnknownHandle(handle.0))?;
        self.ops.popups_removed += 1;
        Ok(())
    }
}
