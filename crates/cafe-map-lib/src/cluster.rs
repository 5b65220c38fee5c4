//! Greedy distance-based clustering of cafés per zoom level
//!
//! At low zoom the map would drown in overlapping markers, so nearby cafés
//! merge into clusters. Clusters are recomputed from scratch on every run and
//! must be deterministic: for the same input set and zoom, ids, membership and
//! representative coordinates are identical, so the reconciler sees no
//! spurious diffs between runs.

use crate::{Cafe, utils};
use geo::Point;
use smallvec::SmallVec;
use std::sync::Arc;

/// Distance threshold in meters for merging cafés at a given zoom level.
///
/// Coarser zoom shows a wider area, so clusters merge more aggressively.
/// The thresholds are design parameters; the ordering property (non-increasing
/// as zoom increases) is what the reconciler depends on.
#[inline]
pub fn cluster_distance_for_zoom(zoom: f64) -> f64 {
    if zoom <= 10.0 {
        5000.0
    } else if zoom <= 12.0 {
        2000.0
    } else if zoom <= 14.0 {
        1000.0
    } else {
        500.0
    }
}

/// A group of nearby cafés rendered as a single aggregate marker.
///
/// Ephemeral and derived: recomputed on every clustering run. The identity and
/// displayed coordinate come from the representative member (smallest id), so
/// a cluster keeps its id and does not drift while its membership trembles
/// slightly between runs at the same zoom.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    id: String,
    position: Point<f64>,
    members: SmallVec<[Arc<Cafe>; 4]>,
}

impl Cluster {
    /// Deterministic cluster id: `cluster-<representative id>`
    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Coordinate of the representative member as (lng, lat)
    #[inline]
    pub fn position(&self) -> Point<f64> {
        self.position
    }

    /// Members ordered by id ascending; never empty
    #[inline]
    pub fn members(&self) -> &[Arc<Cafe>] {
        &self.members
    }

    /// The member with the smallest id
    #[inline]
    pub fn representative(&self) -> &Arc<Cafe> {
        &self.members[0]
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.members.len()
    }

    #[inline]
    pub fn is_singleton(&self) -> bool {
        self.members.len() == 1
    }
}

/// Partition cafés into clusters using greedy distance-threshold grouping.
///
/// Points are visited in id order; each unassigned point seeds a cluster and
/// absorbs every remaining unassigned point within the zoom's threshold
/// (pairwise haversine distance). Because iteration follows the id order, the
/// seed is always the lexicographically smallest member, which makes it the
/// representative.
///
/// Invariants: every input café lands in exactly one cluster, and the output
/// is byte-identical across runs for the same input set and zoom. O(n²),
/// acceptable for point sets in the low thousands.
pub fn cluster_cafes(cafes: &[Arc<Cafe>], zoom: f64) -> Vec<Cluster> {
    #[cfg(feature = "profiling")]
    profiling::scope!("cluster_cafes");

    let threshold = cluster_distance_for_zoom(zoom);

    let mut sorted: Vec<&Arc<Cafe>> = cafes.iter().collect();
    sorted.sort_by(|a, b| a.id().cmp(b.id()));

    let mut assigned = vec![false; sorted.len()];
    let mut clusters = Vec::new();

    for i in 0..sorted.len() {
        if assigned[i] {
            continue;
        }
        assigned[i] = true;

        let seed = sorted[i];
        let mut members: SmallVec<[Arc<Cafe>; 4]> = SmallVec::new();
        members.push(seed.clone());

        for j in (i + 1)..sorted.len() {
            if assigned[j] {
                continue;
            }
            let distance = utils::haversine_distance(seed.position(), sorted[j].position());
            if distance <= threshold {
                assigned[j] = true;
                // Scanning in sorted order keeps members id-ascending
                members.push(sorted[j].clone());
            }
        }

        clusters.push(Cluster {
            id: format!("cluster-{}", seed.id()),
            position: seed.position(),
            members,
        });
    }

    clusters
}
