//! Viewport value types and the bounding-box filter

use crate::Cafe;
use geo::Point;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Geographic bounding box in WGS84 degrees.
///
/// Bounds are inclusive on all four sides. Boxes do not wrap across the
/// antimeridian: a box with `west > east` contains nothing. This is a known
/// limitation inherited from the upstream map usage, which never produces
/// wrapped boxes at the zoom levels this engine targets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl BoundingBox {
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// Inclusive containment test for a (lng, lat) point
    #[inline]
    pub fn contains(&self, position: Point<f64>) -> bool {
        position.x() >= self.west
            && position.x() <= self.east
            && position.y() >= self.south
            && position.y() <= self.north
    }

    /// Longitude span in degrees (east - west)
    #[inline]
    pub fn lng_span(&self) -> f64 {
        self.east - self.west
    }

    /// Latitude span in degrees (north - south)
    #[inline]
    pub fn lat_span(&self) -> f64 {
        self.north - self.south
    }

    /// Center of the box as (lng, lat)
    #[inline]
    pub fn center(&self) -> Point<f64> {
        Point::new(
            (self.west + self.east) / 2.0,
            (self.south + self.north) / 2.0,
        )
    }

    /// Box of the given spans centered on a point
    pub fn around(center: Point<f64>, lng_span: f64, lat_span: f64) -> Self {
        Self {
            west: center.x() - lng_span / 2.0,
            east: center.x() + lng_span / 2.0,
            south: center.y() - lat_span / 2.0,
            north: center.y() + lat_span / 2.0,
        }
    }

    /// Smallest box containing both `self` and the given point
    pub fn expanded_to(mut self, position: Point<f64>) -> Self {
        self.west = self.west.min(position.x());
        self.east = self.east.max(position.x());
        self.south = self.south.min(position.y());
        self.north = self.north.max(position.y());
        self
    }

    /// Degenerate box containing exactly one point
    pub fn from_point(position: Point<f64>) -> Self {
        Self {
            west: position.x(),
            east: position.x(),
            south: position.y(),
            north: position.y(),
        }
    }
}

/// The map's current visible bounding box plus zoom level.
///
/// Supplied by the map surface and sampled in a single call per reconcile
/// pass, so that the filter and the clustering never observe two different
/// boxes under rapid move events.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub bounds: BoundingBox,
    pub zoom: f64,
}

/// Filter cafés to those inside the bounding box.
///
/// The original relative order is preserved; the reconciler relies on this
/// only for its most-recent-first rendering preference, not for correctness.
pub fn visible_cafes(cafes: &[Arc<Cafe>], bounds: &BoundingBox) -> Vec<Arc<Cafe>> {
    cafes
        .iter()
        .filter(|cafe| bounds.contains(cafe.position()))
        .cloned()
        .collect()
}
