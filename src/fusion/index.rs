//! Region Index: the skeleton stream's regions behind an R-tree.
//!
//! Regions keep their ingestion order; spatial lookups go through envelope
//! candidates from the tree and are confirmed with the exact buffered
//! polygon test. Areas are computed once at build time.

use std::collections::HashMap;

use rstar::{RTree, RTreeObject, AABB};
use tracing::warn;

use crate::core::error::{FusionError, Notice, Result};
use crate::core::geometry::{self, BBox, Point};
use crate::core::model::{GeometricRegion, RegionId};

#[derive(Debug, Clone)]
struct RegionEnvelope {
    slot: usize,
    bbox: BBox,
}

impl PartialEq for RegionEnvelope {
    fn eq(&self, other: &Self) -> bool {
        self.slot == other.slot
    }
}

impl RTreeObject for RegionEnvelope {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners([self.bbox.x0, self.bbox.y0], [self.bbox.x1, self.bbox.y1])
    }
}

#[derive(Debug)]
pub struct RegionIndex {
    /// Regions in ingestion order (slot == position).
    regions: Vec<GeometricRegion>,
    areas: Vec<f64>,
    degenerate: Vec<bool>,
    slots: HashMap<RegionId, usize>,
    tree: RTree<RegionEnvelope>,
    notices: Vec<Notice>,
}

impl RegionIndex {
    /// Builds the index. Malformed outlines do not fail the build: the region
    /// is kept with zero area, never matches a query, and a notice is
    /// recorded. Repeated identifiers are rejected.
    pub fn build(regions: Vec<GeometricRegion>) -> Result<Self> {
        let mut slots = HashMap::with_capacity(regions.len());
        let mut areas = Vec::with_capacity(regions.len());
        let mut degenerate = Vec::with_capacity(regions.len());
        let mut envelopes = Vec::with_capacity(regions.len());
        let mut notices = Vec::new();

        for (slot, region) in regions.iter().enumerate() {
            if slots.insert(region.id.clone(), slot).is_some() {
                return Err(FusionError::DuplicateRegion(region.id.clone()));
            }

            match geometry::validate_region_polygon(&region.polygon) {
                Ok(()) => {
                    areas.push(geometry::polygon_area(&region.polygon));
                    degenerate.push(false);
                    if let Some(bbox) = BBox::from_points(&region.polygon) {
                        envelopes.push(RegionEnvelope { slot, bbox });
                    }
                }
                Err(err) => {
                    warn!(region = %region.id, reason = err.code(), "malformed region geometry");
                    areas.push(0.0);
                    degenerate.push(true);
                    notices.push(Notice::malformed_region(region.id.clone(), err));
                }
            }
        }

        Ok(Self {
            regions,
            areas,
            degenerate,
            slots,
            tree: RTree::bulk_load(envelopes),
            notices,
        })
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Regions in ingestion order.
    pub fn iter(&self) -> impl Iterator<Item = &GeometricRegion> {
        self.regions.iter()
    }

    pub fn area(&self, id: &RegionId) -> Option<f64> {
        self.slots.get(id).map(|&slot| self.areas[slot])
    }

    pub fn is_degenerate(&self, id: &RegionId) -> bool {
        self.slots
            .get(id)
            .map(|&slot| self.degenerate[slot])
            .unwrap_or(false)
    }

    /// Notices raised while building (malformed region outlines).
    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    /// Regions whose outline grown by `buffer` contains `point`, smallest
    /// area first. Equal areas keep ingestion order.
    pub fn query(&self, point: Point, buffer: f64) -> Vec<&RegionId> {
        let buffer = buffer.max(0.0);
        let mut hits: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&search_box(point, buffer))
            .map(|env| env.slot)
            .filter(|&slot| geometry::buffered_contains(&self.regions[slot].polygon, point, buffer))
            .collect();
        hits.sort_by(|&a, &b| self.areas[a].total_cmp(&self.areas[b]).then(a.cmp(&b)));
        hits.into_iter().map(|slot| &self.regions[slot].id).collect()
    }

    /// Region whose buffered outline is nearest to `point`, provided the gap
    /// is at most `rescue`. Ties go to the smaller region, then ingestion
    /// order.
    pub fn nearest(&self, point: Point, buffer: f64, rescue: f64) -> Option<&RegionId> {
        let buffer = buffer.max(0.0);
        let rescue = rescue.max(0.0);
        self.tree
            .locate_in_envelope_intersecting(&search_box(point, buffer + rescue))
            .map(|env| {
                let gap = geometry::buffered_distance(&self.regions[env.slot].polygon, point, buffer);
                (gap, env.slot)
            })
            .filter(|(gap, _)| *gap <= rescue)
            .min_by(|(gap_a, a), (gap_b, b)| {
                gap_a
                    .total_cmp(gap_b)
                    .then(self.areas[*a].total_cmp(&self.areas[*b]))
                    .then(a.cmp(b))
            })
            .map(|(_, slot)| &self.regions[slot].id)
    }
}

fn search_box(point: Point, reach: f64) -> AABB<[f64; 2]> {
    AABB::from_corners(
        [point.x - reach, point.y - reach],
        [point.x + reach, point.y + reach],
    )
}
