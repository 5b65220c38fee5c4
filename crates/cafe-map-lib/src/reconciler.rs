//! Marker/Cluster reconciler - converges drawn markers to the desired set
//!
//! The reconciler owns the single source of truth for "what is currently
//! drawn": a mapping from entity id (café id or cluster id) to the live marker
//! handle on the map surface. On every trigger (initial load, move-end,
//! zoom-end, data update) it computes the desired rendering set and applies
//! the minimal diff — removals first, then additions, untouched keys left
//! alone. Re-running with no underlying change performs zero surface
//! operations; marker churn is visible flicker.

use crate::cluster::cluster_cafes;
use crate::store::CafeStore;
use crate::surface::{MapSurface, MarkerDescriptor, MarkerHandle};
use crate::viewport::visible_cafes;
use crate::{Cafe, Cluster};

use std::collections::HashMap;
use std::sync::Arc;

/// At or below this zoom the map shows clusters; above it, individual markers.
pub const DEFAULT_ZOOM_THRESHOLD: f64 = 14.0;

/// Which key space the rendered mapping currently holds. The two are never
/// mixed: a zoom-threshold crossing removes every outgoing-mode handle before
/// any incoming-mode marker is added.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Individual café markers, viewport-filtered
    Markers,
    /// Aggregate cluster markers computed over the entire dataset
    Clusters,
}

/// An entity currently rendered on the surface. Kept alongside the handle so
/// a marker activation (click) can be resolved without recomputing clusters.
#[derive(Debug, Clone)]
pub enum RenderedEntity {
    Cafe(Arc<Cafe>),
    Cluster(Cluster),
}

impl RenderedEntity {
    pub fn id(&self) -> &str {
        match self {
            Self::Cafe(cafe) => cafe.id(),
            Self::Cluster(cluster) => cluster.id(),
        }
    }

    fn descriptor(&self) -> MarkerDescriptor {
        match self {
            Self::Cafe(cafe) => MarkerDescriptor::Cafe {
                id: cafe.id().to_string(),
                position: cafe.position(),
                label: cafe.store_name().map(str::to_string),
                thumbnail_url: cafe.thumbnail_url().map(str::to_string),
            },
            Self::Cluster(cluster) => MarkerDescriptor::Cluster {
                id: cluster.id().to_string(),
                position: cluster.position(),
                count: cluster.count(),
            },
        }
    }
}

/// How a reconcile pass ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReconcileStatus {
    /// Desired set computed and fully applied
    Applied,
    /// Nothing to do: no data attached yet, or already disposed
    #[default]
    Skipped,
    /// A surface call failed; the pass stopped and will be retried in full
    /// on the next trigger
    Aborted,
}

/// Result of one reconcile pass
#[derive(Debug, Clone, Copy, Default)]
pub struct ReconcileOutcome {
    pub status: ReconcileStatus,
    /// Render mode after the pass (None while uninitialized/disposed)
    pub mode: Option<RenderMode>,
    /// Markers added during this pass
    pub added: usize,
    /// Markers removed during this pass
    pub removed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Point data not loaded yet; a valid input state, not an error
    Uninitialized,
    Active,
    /// All handles released; further triggers are ignored
    Disposed,
}

struct Rendered {
    handle: MarkerHandle,
    entity: RenderedEntity,
}

/// Stateful owner of the rendered-handle mapping.
///
/// Every handle added to the surface is paired with exactly one eventual
/// removal: when its entity leaves the desired set, or at [`dispose`].
///
/// [`dispose`]: MarkerReconciler::dispose
pub struct MarkerReconciler {
    zoom_threshold: f64,
    store: Option<Arc<CafeStore>>,
    rendered: HashMap<String, Rendered>,
    mode: Option<RenderMode>,
    phase: Phase,
}

impl MarkerReconciler {
    pub fn new() -> Self {
        Self::with_zoom_threshold(DEFAULT_ZOOM_THRESHOLD)
    }

    pub fn with_zoom_threshold(zoom_threshold: f64) -> Self {
        Self {
            zoom_threshold,
            store: None,
            rendered: HashMap::new(),
            mode: None,
            phase: Phase::Uninitialized,
        }
    }

    /// Attach the loaded point data. Transitions Uninitialized → Active; a
    /// later call replaces the dataset (data-update trigger). No-op after
    /// disposal.
    pub fn attach_store(&mut self, store: Arc<CafeStore>) {
        if self.phase == Phase::Disposed {
            return;
        }
        self.store = Some(store);
        if self.phase == Phase::Uninitialized {
            self.phase = Phase::Active;
        }
    }

    /// Entity currently rendered under the given id, for activation dispatch
    pub fn resolve(&self, id: &str) -> Option<&RenderedEntity> {
        self.rendered.get(id).map(|r| &r.entity)
    }

    /// Number of live marker handles
    pub fn rendered_count(&self) -> usize {
        self.rendered.len()
    }

    /// Ids of all currently rendered entities
    pub fn rendered_ids(&self) -> Vec<&str> {
        self.rendered.keys().map(String::as_str).collect()
    }

    /// Render mode after the last applied pass
    pub fn mode(&self) -> Option<RenderMode> {
        self.mode
    }

    pub fn is_disposed(&self) -> bool {
        self.phase == Phase::Disposed
    }

    /// Run one reconcile pass against the surface.
    ///
    /// Never panics or propagates surface failures: a failed surface call
    /// aborts the remaining diff operations for this pass (the mapping stays
    /// consistent with what actually succeeded) and the pass is retried in
    /// full on the next trigger.
    pub fn reconcile(&mut self, surface: &mut dyn MapSurface) -> ReconcileOutcome {
        #[cfg(feature = "profiling")]
        profiling::scope!("reconciler::reconcile");

        if self.phase != Phase::Active {
            return ReconcileOutcome {
                mode: self.mode,
                ..ReconcileOutcome::default()
            };
        }
        // Active implies a store is attached
        let Some(store) = self.store.clone() else {
            return ReconcileOutcome {
                mode: self.mode,
                ..ReconcileOutcome::default()
            };
        };

        // Sample bounds and zoom in one call so the filter and the clustering
        // never see two different boxes.
        let viewport = match surface.viewport() {
            Ok(viewport) => viewport,
            Err(error) => {
                tracing::warn!("Reconcile aborted: could not sample viewport: {error}");
                return self.aborted(0, 0);
            }
        };

        let (mode, desired) = self.desired_set(&store, viewport.zoom, &viewport);

        let mut desired_map: HashMap<&str, &RenderedEntity> = HashMap::with_capacity(desired.len());
        for entity in &desired {
            desired_map.insert(entity.id(), entity);
        }

        // Removals first. On a mode crossing nothing survives the diff, so
        // every outgoing-mode handle is gone before the first incoming-mode
        // marker is added and the two key spaces never coexist.
        let stale: Vec<String> = self
            .rendered
            .keys()
            .filter(|id| !desired_map.contains_key(id.as_str()))
            .cloned()
            .collect();

        let mut removed = 0;
        for id in stale {
            let handle = self.rendered[&id].handle;
            match surface.remove_marker(handle) {
                Ok(()) => {
                    self.rendered.remove(&id);
                    removed += 1;
                }
                Err(error) => {
                    tracing::warn!("Reconcile aborted while removing {id}: {error}");
                    return self.aborted(0, removed);
                }
            }
        }

        // Additions. A handle is only recorded once the surface confirms the
        // create; a failed add is never assumed to exist.
        let mut added = 0;
        for entity in desired {
            if self.rendered.contains_key(entity.id()) {
                continue;
            }
            let descriptor = entity.descriptor();
            match surface.add_marker(&descriptor) {
                Ok(handle) => {
                    self.rendered
                        .insert(entity.id().to_string(), Rendered { handle, entity });
                    added += 1;
                }
                Err(error) => {
                    tracing::warn!(
                        "Reconcile aborted while adding {}: {error}",
                        descriptor.id()
                    );
                    return self.aborted(added, removed);
                }
            }
        }

        self.mode = Some(mode);
        tracing::debug!(
            zoom = viewport.zoom,
            ?mode,
            added,
            removed,
            live = self.rendered.len(),
            "reconciled markers"
        );

        ReconcileOutcome {
            status: ReconcileStatus::Applied,
            mode: Some(mode),
            added,
            removed,
        }
    }

    /// Remove every live handle and stop processing triggers.
    pub fn dispose(&mut self, surface: &mut dyn MapSurface) {
        for (id, rendered) in self.rendered.drain() {
            if let Err(error) = surface.remove_marker(rendered.handle) {
                tracing::warn!("Failed to remove marker {id} during dispose: {error}");
            }
        }
        self.mode = None;
        self.phase = Phase::Disposed;
    }

    /// Compute the desired rendering set for the sampled viewport.
    ///
    /// Clusters are computed over the entire dataset, not the viewport, so
    /// cluster membership and counts stay stable while the user pans.
    fn desired_set(
        &self,
        store: &CafeStore,
        zoom: f64,
        viewport: &crate::Viewport,
    ) -> (RenderMode, Vec<RenderedEntity>) {
        if zoom <= self.zoom_threshold {
            let clusters = cluster_cafes(store.cafes(), zoom)
                .into_iter()
                .map(RenderedEntity::Cluster)
                .collect();
            (RenderMode::Clusters, clusters)
        } else {
            // The feed is most-recent-last; reversing renders the newest
            // cafés first so they end up on top.
            let mut visible = visible_cafes(store.cafes(), &viewport.bounds);
            visible.reverse();
            let cafes = visible.into_iter().map(RenderedEntity::Cafe).collect();
            (RenderMode::Markers, cafes)
        }
    }

    fn aborted(&self, added: usize, removed: usize) -> ReconcileOutcome {
        ReconcileOutcome {
            status: ReconcileStatus::Aborted,
            mode: self.mode,
            added,
            removed,
        }
    }
}

impl Default for MarkerReconciler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::HeadlessSurface;
    use crate::viewport::BoundingBox;
    use crate::{CafeRecord, Viewport};

    fn record(id: &str, lat: f64, lng: f64) -> CafeRecord {
        CafeRecord {
            id: id.to_string(),
            lat,
            lng,
            ..CafeRecord::default()
        }
    }

    /// Five cafés around central Kagoshima, two of them within 2 km of each
    /// other pairwise groups at zoom 12.
    fn store() -> Arc<CafeStore> {
        let records = vec![
            record("a", 31.5900, 130.5550),
            record("b", 31.5910, 130.5560),
            record("c", 31.5960, 130.5620),
            record("d", 31.7000, 130.7000),
            record("e", 31.7010, 130.7010),
        ];
        Arc::new(CafeStore::from_records(records).unwrap())
    }

    fn viewport(zoom: f64) -> Viewport {
        Viewport {
            // Wide enough to contain all five cafés
            bounds: BoundingBox::new(130.50, 31.50, 130.80, 31.80),
            zoom,
        }
    }

    fn active_reconciler() -> MarkerReconciler {
        let mut reconciler = MarkerReconciler::new();
        reconciler.attach_store(store());
        reconciler
    }

    #[test]
    fn test_uninitialized_reconcile_is_a_noop() {
        let mut surface = HeadlessSurface::new(viewport(17.0), 1000.0);
        let mut reconciler = MarkerReconciler::new();

        let outcome = reconciler.reconcile(&mut surface);
        assert_eq!(outcome.status, ReconcileStatus::Skipped);
        assert_eq!(surface.marker_count(), 0);
    }

    #[test]
    fn test_initial_reconcile_adds_visible_markers() {
        let mut surface = HeadlessSurface::new(viewport(17.0), 1000.0);
        let mut reconciler = active_reconciler();

        let outcome = reconciler.reconcile(&mut surface);
        assert_eq!(outcome.status, ReconcileStatus::Applied);
        assert_eq!(outcome.mode, Some(RenderMode::Markers));
        assert_eq!(outcome.added, 5);
        assert_eq!(outcome.removed, 0);
        assert_eq!(surface.marker_count(), 5);
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let mut surface = HeadlessSurface::new(viewport(17.0), 1000.0);
        let mut reconciler = active_reconciler();

        reconciler.reconcile(&mut surface);
        let ops_before = surface.ops();

        let outcome = reconciler.reconcile(&mut surface);
        assert_eq!(outcome.status, ReconcileStatus::Applied);
        assert_eq!(outcome.added, 0);
        assert_eq!(outcome.removed, 0);
        // Zero surface operations on the unchanged pass
        assert_eq!(surface.ops(), ops_before);
    }

    #[test]
    fn test_pan_applies_minimal_diff() {
        let mut surface = HeadlessSurface::new(viewport(17.0), 1000.0);
        let mut reconciler = active_reconciler();
        reconciler.reconcile(&mut surface);

        // Pan east so only the d/e pair stays visible
        surface.set_viewport(Viewport {
            bounds: BoundingBox::new(130.65, 31.65, 130.80, 31.80),
            zoom: 17.0,
        });
        let outcome = reconciler.reconcile(&mut surface);

        assert_eq!(outcome.removed, 3);
        assert_eq!(outcome.added, 0);
        let mut ids = reconciler.rendered_ids();
        ids.sort();
        assert_eq!(ids, vec!["d", "e"]);
    }

    #[test]
    fn test_zoom_threshold_crossing_swaps_key_spaces() {
        let mut surface = HeadlessSurface::new(viewport(17.0), 1000.0);
        let mut reconciler = active_reconciler();
        reconciler.reconcile(&mut surface);
        assert_eq!(reconciler.mode(), Some(RenderMode::Markers));
        assert_eq!(surface.marker_count(), 5);

        // Zoom-end lands at 12: all five individual handles must go, replaced
        // by cluster handles only
        surface.set_viewport(viewport(12.0));
        let outcome = reconciler.reconcile(&mut surface);

        assert_eq!(outcome.status, ReconcileStatus::Applied);
        assert_eq!(outcome.mode, Some(RenderMode::Clusters));
        assert_eq!(outcome.removed, 5);
        assert!(outcome.added > 0);
        assert!(
            reconciler
                .rendered_ids()
                .iter()
                .all(|id| id.starts_with("cluster-")),
            "no individual marker may remain after the crossing"
        );
        assert!(surface.markers().all(MarkerDescriptor::is_cluster));
    }

    #[test]
    fn test_cluster_mode_ignores_viewport_box() {
        // A viewport that excludes d/e still renders their cluster: clustering
        // runs over the whole dataset so counts stay stable while panning
        let mut surface = HeadlessSurface::new(
            Viewport {
                bounds: BoundingBox::new(130.54, 31.58, 130.58, 31.61),
                zoom: 12.0,
            },
            1000.0,
        );
        let mut reconciler = active_reconciler();
        reconciler.reconcile(&mut surface);

        let total_members: usize = reconciler
            .rendered_ids()
            .iter()
            .map(|id| match reconciler.resolve(id).unwrap() {
                RenderedEntity::Cluster(cluster) => cluster.count(),
                RenderedEntity::Cafe(_) => panic!("unexpected café in cluster mode"),
            })
            .sum();
        assert_eq!(total_members, 5);
    }

    #[test]
    fn test_cluster_ids_stable_across_pans() {
        let mut surface = HeadlessSurface::new(viewport(12.0), 1000.0);
        let mut reconciler = active_reconciler();
        reconciler.reconcile(&mut surface);

        let mut before = reconciler.rendered_ids().into_iter().map(str::to_string).collect::<Vec<_>>();
        before.sort();

        // Pan; same zoom, same dataset: zero operations expected
        surface.set_viewport(Viewport {
            bounds: BoundingBox::new(130.52, 31.52, 130.82, 31.82),
            zoom: 12.0,
        });
        let outcome = reconciler.reconcile(&mut surface);
        assert_eq!(outcome.added, 0);
        assert_eq!(outcome.removed, 0);

        let mut after = reconciler.rendered_ids().into_iter().map(str::to_string).collect::<Vec<_>>();
        after.sort();
        assert_eq!(before, after);
    }

    #[test]
    fn test_failed_add_is_not_recorded_and_pass_retries() {
        let mut surface = HeadlessSurface::new(viewport(17.0), 1000.0);
        let mut reconciler = active_reconciler();

        surface.limit_marker_adds(Some(2));
        let outcome = reconciler.reconcile(&mut surface);
        assert_eq!(outcome.status, ReconcileStatus::Aborted);
        assert_eq!(outcome.added, 2);
        // Mapping reflects only what the surface confirmed
        assert_eq!(reconciler.rendered_count(), 2);
        assert_eq!(surface.marker_count(), 2);

        // Next trigger retries the remainder
        surface.limit_marker_adds(None);
        let outcome = reconciler.reconcile(&mut surface);
        assert_eq!(outcome.status, ReconcileStatus::Applied);
        assert_eq!(outcome.added, 3);
        assert_eq!(reconciler.rendered_count(), 5);
    }

    #[test]
    fn test_torn_down_surface_aborts_pass() {
        let mut surface = HeadlessSurface::new(viewport(17.0), 1000.0);
        let mut reconciler = active_reconciler();
        reconciler.reconcile(&mut surface);

        surface.tear_down();
        surface.set_viewport(viewport(12.0));
        let outcome = reconciler.reconcile(&mut surface);
        assert_eq!(outcome.status, ReconcileStatus::Aborted);
        // Mapping untouched; will be retried when the surface comes back
        assert_eq!(reconciler.rendered_count(), 5);
    }

    #[test]
    fn test_resolve_rendered_entities() {
        let mut surface = HeadlessSurface::new(viewport(17.0), 1000.0);
        let mut reconciler = active_reconciler();
        reconciler.reconcile(&mut surface);

        match reconciler.resolve("a") {
            Some(RenderedEntity::Cafe(cafe)) => assert_eq!(cafe.id(), "a"),
            other => panic!("expected café entity, got {other:?}"),
        }
        assert!(reconciler.resolve("nope").is_none());
    }

    #[test]
    fn test_dispose_releases_every_handle() {
        let mut surface = HeadlessSurface::new(viewport(17.0), 1000.0);
        let mut reconciler = active_reconciler();
        reconciler.reconcile(&mut surface);
        assert_eq!(surface.marker_count(), 5);

        reconciler.dispose(&mut surface);
        assert!(reconciler.is_disposed());
        assert_eq!(surface.marker_count(), 0);
        assert_eq!(reconciler.rendered_count(), 0);

        // Triggers after disposal are ignored
        let outcome = reconciler.reconcile(&mut surface);
        assert_eq!(outcome.status, ReconcileStatus::Skipped);
        assert_eq!(surface.marker_count(), 0);
    }

    #[test]
    fn test_data_update_triggers_rerender() {
        let mut surface = HeadlessSurface::new(viewport(17.0), 1000.0);
        let mut reconciler = active_reconciler();
        reconciler.reconcile(&mut surface);

        // New dataset with one café removed
        let records = vec![
            record("a", 31.5900, 130.5550),
            record("b", 31.5910, 130.5560),
            record("c", 31.5960, 130.5620),
            record("d", 31.7000, 130.7000),
        ];
        reconciler.attach_store(Arc::new(CafeStore::from_records(records).unwrap()));
        let outcome = reconciler.reconcile(&mut surface);

        assert_eq!(outcome.removed, 1);
        assert_eq!(outcome.added, 0);
        assert_eq!(reconciler.rendered_count(), 4);
    }
}
