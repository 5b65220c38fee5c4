//! Café input records and the immutable point entity
//!
//! The upstream data collaborator delivers an array of JSON records. Only a
//! light subset of each record is needed on the map itself; the full record is
//! kept around for detail lookups and handed through opaquely.

use crate::utils;
use geo::Point;
use serde::{Deserialize, Serialize};

/// Raw record shape delivered by the upstream data collaborator.
///
/// All fields except `id`, `lat` and `lng` are optional and tolerated as
/// absent or null; rendering degrades gracefully instead of failing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CafeRecord {
    pub id: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub store_name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub media_url: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub permalink: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub media_type: Option<String>,
    #[serde(default)]
    pub like_count: Option<u64>,
    #[serde(default)]
    pub comments_count: Option<u64>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Immutable café entity as used by the clustering and reconciliation engine.
///
/// Created once when the data collaborator resolves and never mutated for the
/// lifetime of a map session. The `id` is the reconciliation key and must be
/// unique and stable across reloads.
#[derive(Debug, Clone, PartialEq)]
pub struct Cafe {
    id: String,
    /// Position as (lng, lat) in WGS84 degrees
    position: Point<f64>,
    store_name: Option<String>,
    address: Option<String>,
    thumbnail_url: Option<String>,
}

impl Cafe {
    /// Build the light map entity from a raw record.
    ///
    /// Returns `None` (with a warning) when the coordinates are non-finite or
    /// out of range; such records are a data-integrity problem for the
    /// upstream layer to fix, never a fatal error for the map.
    pub fn from_record(record: &CafeRecord) -> Option<Self> {
        if !utils::is_valid_coordinate(record.lat, record.lng) {
            tracing::warn!(
                "Skipping café with invalid coordinates: id={} ({}, {})",
                record.id,
                record.lat,
                record.lng
            );
            return None;
        }

        // Video posts carry their preview in thumbnail_url, everything else
        // uses the primary media_url.
        let thumbnail_url = if record.media_type.as_deref() == Some("VIDEO") {
            record.thumbnail_url.clone()
        } else {
            record.media_url.clone()
        };

        Some(Self {
            id: record.id.clone(),
            position: Point::new(record.lng, record.lat),
            store_name: record.store_name.clone(),
            address: record.address.clone(),
            thumbnail_url,
        })
    }

    /// Unique, stable identifier (reconciliation key)
    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Position as (lng, lat) in WGS84 degrees
    #[inline]
    pub fn position(&self) -> Point<f64> {
        self.position
    }

    /// Longitude in degrees
    #[inline]
    pub fn lng(&self) -> f64 {
        self.position.x()
    }

    /// Latitude in degrees
    #[inline]
    pub fn lat(&self) -> f64 {
        self.position.y()
    }

    pub fn store_name(&self) -> Option<&str> {
        self.store_name.as_deref()
    }

    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    pub fn thumbnail_url(&self) -> Option<&str> {
        self.thumbnail_url.as_deref()
    }
}
