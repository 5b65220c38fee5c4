//! CafeStore - Immutable store for validated café points
//!
//! The store is built once when the upstream data collaborator resolves and is
//! shared read-only with the reconciler and selection controller. Invalid
//! records are skipped (and counted) at build time; the rest of the engine can
//! assume every stored café has valid coordinates.

use crate::viewport::BoundingBox;
use crate::{Cafe, CafeRecord, MapError, Result, text};

use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

/// Inputs below this size are converted sequentially; rayon overhead only
/// pays off for larger datasets.
const PARALLEL_INGEST_THRESHOLD: usize = 512;

/// Summary information about the store
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreInfo {
    /// Number of cafés accepted into the store
    pub cafe_count: usize,
    /// Number of records rejected for invalid coordinates
    pub skipped_records: usize,
    /// Bounding box of all accepted cafés (None if empty)
    pub bounding_box: Option<BoundingBox>,
}

/// Cached statistics, computed once at build time
#[derive(Debug, Clone, Default)]
struct CachedStats {
    skipped_records: usize,
    bounding_box: Option<BoundingBox>,
}

/// Immutable collection of café points with id lookup, detail pass-through
/// and normalized search.
pub struct CafeStore {
    /// Accepted cafés in input order (the upstream feed is most-recent-last)
    cafes: Vec<Arc<Cafe>>,
    /// Index from café id into `cafes`
    by_id: HashMap<String, usize>,
    /// Full records kept for detail lookups, keyed by id
    records: HashMap<String, CafeRecord>,
    /// Statistics computed at build time
    cached_stats: CachedStats,
}

impl CafeStore {
    /// Build a store from raw JSON bytes (an array of café records)
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self> {
        let records: Vec<CafeRecord> = serde_json::from_slice(bytes)?;
        Self::from_records(records)
    }

    /// Build a store from already-parsed records.
    ///
    /// Records with non-finite or out-of-range coordinates are skipped with a
    /// warning and counted in [`StoreInfo::skipped_records`]. Duplicate ids
    /// are a data-integrity error since the id is the reconciliation key.
    pub fn from_records(records: Vec<CafeRecord>) -> Result<Self> {
        #[cfg(feature = "profiling")]
        profiling::scope!("store::from_records");

        // Conversion is pure per record; parallelize for large feeds while
        // preserving input order.
        let converted: Vec<(Option<Cafe>, CafeRecord)> =
            if records.len() >= PARALLEL_INGEST_THRESHOLD {
                records
                    .into_par_iter()
                    .map(|record| (Cafe::from_record(&record), record))
                    .collect()
            } else {
                records
                    .into_iter()
                    .map(|record| (Cafe::from_record(&record), record))
                    .collect()
            };

        let mut cafes = Vec::with_capacity(converted.len());
        let mut by_id = HashMap::with_capacity(converted.len());
        let mut record_map = HashMap::with_capacity(converted.len());
        let mut stats = CachedStats::default();

        for (cafe, record) in converted {
            let Some(cafe) = cafe else {
                stats.skipped_records += 1;
                continue;
            };

            if by_id.contains_key(cafe.id()) {
                return Err(MapError::InvalidData(format!(
                    "duplicate café id: {}",
                    cafe.id()
                )));
            }

            stats.bounding_box = Some(match stats.bounding_box {
                Some(bbox) => bbox.expanded_to(cafe.position()),
                None => BoundingBox::from_point(cafe.position()),
            });

            by_id.insert(cafe.id().to_string(), cafes.len());
            record_map.insert(cafe.id().to_string(), record);
            cafes.push(Arc::new(cafe));
        }

        if stats.skipped_records > 0 {
            tracing::warn!(
                "Skipped {} café records with invalid coordinates",
                stats.skipped_records
            );
        }

        Ok(Self {
            cafes,
            by_id,
            records: record_map,
            cached_stats: stats,
        })
    }

    /// All cafés in input order
    #[inline]
    pub fn cafes(&self) -> &[Arc<Cafe>] {
        &self.cafes
    }

    /// Look up a café by id
    #[inline]
    pub fn get(&self, id: &str) -> Option<&Arc<Cafe>> {
        self.by_id.get(id).map(|&index| &self.cafes[index])
    }

    /// Full upstream record for a café, passed through opaquely to detail
    /// consumers (caption, permalink, like counts and so on).
    #[inline]
    pub fn detail(&self, id: &str) -> Option<&CafeRecord> {
        self.records.get(id)
    }

    /// Number of accepted cafés
    #[inline]
    pub fn len(&self) -> usize {
        self.cafes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cafes.is_empty()
    }

    /// Summary information (all values cached at build time)
    pub fn info(&self) -> StoreInfo {
        StoreInfo {
            cafe_count: self.cafes.len(),
            skipped_records: self.cached_stats.skipped_records,
            bounding_box: self.cached_stats.bounding_box,
        }
    }

    /// Bounding box of all cafés (None if the store is empty)
    #[inline]
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        self.cached_stats.bounding_box
    }

    /// Search cafés by normalized substring match on store name or address.
    ///
    /// A blank query returns every café. Normalization folds hiragana to
    /// katakana and fullwidth to halfwidth, so spelling variants match.
    pub fn search(&self, query: &str) -> Vec<Arc<Cafe>> {
        if query.trim().is_empty() {
            return self.cafes.clone();
        }

        let needle = text::normalize(query);
        self.cafes
            .iter()
            .filter(|cafe| {
                cafe.store_name()
                    .is_some_and(|name| text::normalize(name).contains(&needle))
                    || cafe
                        .address()
                        .is_some_and(|address| text::normalize(address).contains(&needle))
            })
            .cloned()
            .collect()
    }
}
