//! Selection and popup controller
//!
//! At most one café is selected at a time and at most one popup exists on the
//! surface. Selecting a new café removes the previous popup before showing the
//! next one; re-selecting the current café is a no-op, so repeated clicks on
//! the same marker never stack popups or re-fly the camera.

use crate::position::{DEFAULT_FOCUS_ZOOM, focus_center};
use crate::store::CafeStore;
use crate::surface::{FlyTo, MapSurface, PopupHandle, SurfaceResult};
use crate::{Cafe, Cluster};

use std::sync::Arc;

/// Popup label when the café carries no store name
const UNNAMED_CAFE_LABEL: &str = "カフェ";

/// Clicking a multi-member cluster zooms in by this many levels
const CLUSTER_ZOOM_STEP: f64 = 2.0;

/// Owner of the current selection and the single transient popup.
pub struct SelectionController {
    selected: Option<Arc<Cafe>>,
    popup: Option<PopupHandle>,
}

impl SelectionController {
    pub fn new() -> Self {
        Self {
            selected: None,
            popup: None,
        }
    }

    /// Currently selected café, if any
    pub fn selected(&self) -> Option<&Arc<Cafe>> {
        self.selected.as_ref()
    }

    pub fn has_popup(&self) -> bool {
        self.popup.is_some()
    }

    /// Select a café: fly the camera so the point sits clear of the detail
    /// panel, then show its popup.
    ///
    /// Re-selecting the already-selected café is a no-op. `maintain_zoom`
    /// keeps the current zoom instead of snapping to the focus zoom.
    pub fn select(
        &mut self,
        cafe: Arc<Cafe>,
        surface: &mut dyn MapSurface,
        maintain_zoom: bool,
    ) -> SurfaceResult<()> {
        if self
            .selected
            .as_ref()
            .is_some_and(|current| current.id() == cafe.id())
            && self.popup.is_some()
        {
            return Ok(());
        }

        self.remove_popup(surface)?;

        let viewport = surface.viewport()?;
        let width_px = surface.width_px()?;
        let center = focus_center(cafe.position(), &viewport.bounds, width_px);
        surface.fly_to(FlyTo {
            center,
            zoom: if maintain_zoom {
                None
            } else {
                Some(DEFAULT_FOCUS_ZOOM)
            },
            duration_ms: None,
        })?;

        let label = cafe.store_name().unwrap_or(UNNAMED_CAFE_LABEL);
        let handle = surface.show_popup(cafe.position(), label)?;
        self.popup = Some(handle);
        self.selected = Some(cafe);

        tracing::debug!(
            id = self.selected.as_ref().map(|c| c.id()),
            "selected café"
        );
        Ok(())
    }

    /// Drop the selection and its popup (background click)
    pub fn clear(&mut self, surface: &mut dyn MapSurface) -> SurfaceResult<()> {
        self.remove_popup(surface)?;
        self.selected = None;
        Ok(())
    }

    /// Handle a click on a cluster marker.
    ///
    /// A singleton cluster behaves like clicking its only café. A larger
    /// cluster zooms the camera in two levels (capped at `max_zoom`) towards
    /// the cluster position without selecting anything, letting the cluster
    /// break apart on the next reconcile.
    pub fn activate_cluster(
        &mut self,
        cluster: &Cluster,
        surface: &mut dyn MapSurface,
        max_zoom: f64,
    ) -> SurfaceResult<()> {
        if cluster.is_singleton() {
            return self.select(cluster.representative().clone(), surface, false);
        }

        let zoom = surface.viewport()?.zoom;
        surface.fly_to(FlyTo {
            center: cluster.position(),
            zoom: Some((zoom + CLUSTER_ZOOM_STEP).min(max_zoom)),
            duration_ms: None,
        })
    }

    /// Search the store and select the first match; an empty result set
    /// clears the current selection.
    pub fn search_and_select(
        &mut self,
        query: &str,
        store: &CafeStore,
        surface: &mut dyn MapSurface,
    ) -> SurfaceResult<Option<Arc<Cafe>>> {
        let matches = store.search(query);
        match matches.into_iter().next() {
            Some(cafe) => {
                self.select(cafe.clone(), surface, false)?;
                Ok(Some(cafe))
            }
            None => {
                tracing::debug!(query, "search found no cafés");
                self.clear(surface)?;
                Ok(None)
            }
        }
    }

    fn remove_popup(&mut self, surface: &mut dyn MapSurface) -> SurfaceResult<()> {
        if let Some(handle) = self.popup.take() {
            surface.remove_popup(handle)?;
        }
        Ok(())
    }
}

impl Default for SelectionController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::cluster_cafes;
    use crate::surface::HeadlessSurface;
    use crate::viewport::BoundingBox;
    use crate::{CafeRecord, Viewport};

    fn cafe(id: &str, lat: f64, lng: f64, name: Option<&str>) -> Arc<Cafe> {
        let record = CafeRecord {
            id: id.to_string(),
            lat,
            lng,
            store_name: name.map(str::to_string),
            ..CafeRecord::default()
        };
        Arc::new(Cafe::from_record(&record).unwrap())
    }

    fn surface() -> HeadlessSurface {
        HeadlessSurface::new(
            Viewport {
                bounds: BoundingBox::new(130.55, 31.58, 130.56, 31.60),
                zoom: 15.0,
            },
            1000.0,
        )
    }

    #[test]
    fn test_select_shows_popup_and_flies() {
        let mut surface = surface();
        let mut selection = SelectionController::new();
        let mocha = cafe("a", 31.59, 130.555, Some("喫茶モカ"));

        selection.select(mocha.clone(), &mut surface, false).unwrap();

        assert_eq!(selection.selected().unwrap().id(), "a");
        assert_eq!(surface.popup_texts(), vec!["喫茶モカ"]);
        let fly = surface.last_fly_to().unwrap();
        assert_eq!(fly.zoom, Some(DEFAULT_FOCUS_ZOOM));
        // 0.01° span at 1000 px: center shifted +0.0025° east of the café
        assert!((fly.center.x() - (130.555 + 0.0025)).abs() < 1e-12);
    }

    #[test]
    fn test_reselect_same_cafe_is_a_noop() {
        let mut surface = surface();
        let mut selection = SelectionController::new();
        let mocha = cafe("a", 31.59, 130.555, Some("喫茶モカ"));

        selection.select(mocha.clone(), &mut surface, false).unwrap();
        let ops_before = surface.ops();

        selection.select(mocha, &mut surface, false).unwrap();
        assert_eq!(surface.ops(), ops_before);
        assert_eq!(surface.popup_count(), 1);
    }

    #[test]
    fn test_switching_selection_leaves_one_popup() {
        let mut surface = surface();
        let mut selection = SelectionController::new();

        selection
            .select(cafe("a", 31.59, 130.555, Some("喫茶モカ")), &mut surface, false)
            .unwrap();
        selection
            .select(cafe("b", 31.591, 130.556, Some("Latte Lab")), &mut surface, false)
            .unwrap();

        assert_eq!(surface.popup_count(), 1);
        assert_eq!(surface.popup_texts(), vec!["Latte Lab"]);
        assert_eq!(selection.selected().unwrap().id(), "b");
    }

    #[test]
    fn test_unnamed_cafe_gets_fallback_label() {
        let mut surface = surface();
        let mut selection = SelectionController::new();

        selection
            .select(cafe("a", 31.59, 130.555, None), &mut surface, false)
            .unwrap();
        assert_eq!(surface.popup_texts(), vec!["カフェ"]);
    }

    #[test]
    fn test_maintain_zoom_keeps_current_zoom() {
        let mut surface = surface();
        let mut selection = SelectionController::new();

        selection
            .select(cafe("a", 31.59, 130.555, None), &mut surface, true)
            .unwrap();
        assert_eq!(surface.last_fly_to().unwrap().zoom, None);
        assert_eq!(surface.viewport().unwrap().zoom, 15.0);
    }

    #[test]
    fn test_clear_drops_selection_and_popup() {
        let mut surface = surface();
        let mut selection = SelectionController::new();

        selection
            .select(cafe("a", 31.59, 130.555, None), &mut surface, false)
            .unwrap();
        selection.clear(&mut surface).unwrap();

        assert!(selection.selected().is_none());
        assert!(!selection.has_popup());
        assert_eq!(surface.popup_count(), 0);
    }

    #[test]
    fn test_singleton_cluster_selects_its_member() {
        let mut surface = surface();
        let mut selection = SelectionController::new();
        let clusters = cluster_cafes(&[cafe("a", 31.59, 130.555, Some("喫茶モカ"))], 12.0);

        selection
            .activate_cluster(&clusters[0], &mut surface, 18.0)
            .unwrap();
        assert_eq!(selection.selected().unwrap().id(), "a");
        assert_eq!(surface.popup_count(), 1);
    }

    #[test]
    fn test_multi_cluster_zooms_in_without_selecting() {
        let mut surface = surface();
        let mut selection = SelectionController::new();
        let clusters = cluster_cafes(
            &[
                cafe("a", 31.590, 130.555, None),
                cafe("b", 31.591, 130.556, None),
            ],
            12.0,
        );
        assert_eq!(clusters[0].count(), 2);

        selection
            .activate_cluster(&clusters[0], &mut surface, 18.0)
            .unwrap();
        assert!(selection.selected().is_none());
        assert_eq!(surface.popup_count(), 0);
        // Zoom 15 + 2 step
        assert_eq!(surface.last_fly_to().unwrap().zoom, Some(17.0));
    }

    #[test]
    fn test_cluster_zoom_capped_at_max() {
        let mut surface = surface();
        surface.set_viewport(Viewport {
            bounds: BoundingBox::new(130.55, 31.58, 130.56, 31.60),
            zoom: 17.5,
        });
        let mut selection = SelectionController::new();
        let clusters = cluster_cafes(
            &[
                cafe("a", 31.590, 130.555, None),
                cafe("b", 31.591, 130.556, None),
            ],
            12.0,
        );

        selection
            .activate_cluster(&clusters[0], &mut surface, 18.0)
            .unwrap();
        assert_eq!(surface.last_fly_to().unwrap().zoom, Some(18.0));
    }

    #[test]
    fn test_search_selects_first_match() {
        let mut surface = surface();
        let mut selection = SelectionController::new();
        let store = CafeStore::from_records(vec![
            CafeRecord {
                id: "a".to_string(),
                lat: 31.59,
                lng: 130.555,
                store_name: Some("喫茶モカ".to_string()),
                ..CafeRecord::default()
            },
            CafeRecord {
                id: "b".to_string(),
                lat: 31.591,
                lng: 130.556,
                store_name: Some("Latte Lab".to_string()),
                ..CafeRecord::default()
            },
        ])
        .unwrap();

        let found = selection
            .search_and_select("latte", &store, &mut surface)
            .unwrap();
        assert_eq!(found.unwrap().id(), "b");
        assert_eq!(selection.selected().unwrap().id(), "b");

        // No match clears the previous selection
        let found = selection
            .search_and_select("ラーメン", &store, &mut surface)
            .unwrap();
        assert!(found.is_none());
        assert!(selection.selected().is_none());
        assert_eq!(surface.popup_count(), 0);
    }
}
