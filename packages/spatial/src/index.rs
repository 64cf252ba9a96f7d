//! R-tree backed facility index with one tree per [`FacilityType`].
//!
//! Nearest lookups order candidates by [`distance_sphere_meters`] with the
//! facility id as a secondary key, matching
//! `ORDER BY coordinates::geography <-> point::geography, id` in `PostGIS`.

use std::collections::BTreeMap;

use rstar::{AABB, RTree, RTreeObject};
use safe_map_facility_models::{Facility, FacilityType, GeoPoint};

use crate::{BoundingBox, distance_sphere_meters};

/// Half-width, in degrees, of the first square probed by a nearest search.
const INITIAL_SEARCH_DEGREES: f64 = 0.01;

/// A square this wide covers every valid WGS84 point from any origin.
const MAX_SEARCH_DEGREES: f64 = 360.0;

/// Added to the widening radius so candidates exactly on its boundary are
/// not lost to rounding in the box computation.
const WIDEN_SLACK_METERS: f64 = 1.0;

/// A facility position stored in the R-tree, pointing back into the
/// catalog vector.
struct IndexEntry {
    slot: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Immutable in-memory catalog of facilities with per-type spatial
/// indexes.
///
/// The catalog is kept sorted newest-first (`created_at` descending, then
/// id) so [`Self::facilities`] can be served as-is.
pub struct FacilityIndex {
    facilities: Vec<Facility>,
    by_type: BTreeMap<FacilityType, RTree<IndexEntry>>,
}

impl FacilityIndex {
    /// Builds the index. Facilities with invalid coordinates are dropped.
    #[must_use]
    pub fn new(mut facilities: Vec<Facility>) -> Self {
        facilities.retain(|facility| {
            let valid = facility.point().is_valid();
            if !valid {
                log::warn!(
                    "Skipping facility {} with invalid coordinates ({}, {})",
                    facility.id,
                    facility.longitude,
                    facility.latitude
                );
            }
            valid
        });

        facilities.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });

        let mut entries: BTreeMap<FacilityType, Vec<IndexEntry>> = BTreeMap::new();
        for (slot, facility) in facilities.iter().enumerate() {
            entries
                .entry(facility.facility_type)
                .or_default()
                .push(IndexEntry {
                    slot,
                    envelope: AABB::from_point([facility.longitude, facility.latitude]),
                });
        }

        let by_type = entries
            .into_iter()
            .map(|(facility_type, entries)| (facility_type, RTree::bulk_load(entries)))
            .collect();

        Self {
            facilities,
            by_type,
        }
    }

    /// All facilities, newest first.
    #[must_use]
    pub fn facilities(&self) -> &[Facility] {
        &self.facilities
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.facilities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.facilities.is_empty()
    }

    /// Number of facilities of the given type.
    #[must_use]
    pub fn count_of_type(&self, facility_type: FacilityType) -> usize {
        self.by_type.get(&facility_type).map_or(0, RTree::size)
    }

    /// Returns up to `limit` facilities of `facility_type` closest to
    /// `origin` on the sphere, ordered by distance and then id.
    ///
    /// Probes squares of doubling size around the origin until enough
    /// candidates turn up. The furthest kept candidate bounds the answer, so
    /// a final pass collects everything inside the sphere-derived box of
    /// that radius before ranking.
    #[must_use]
    pub fn nearest_of_type(
        &self,
        origin: GeoPoint,
        facility_type: FacilityType,
        limit: usize,
    ) -> Vec<&Facility> {
        let Some(tree) = self.by_type.get(&facility_type) else {
            return Vec::new();
        };

        let limit = limit.min(tree.size());
        if limit == 0 {
            return Vec::new();
        }

        let mut half_width = INITIAL_SEARCH_DEGREES;
        let mut candidates = self.ranked_in(tree, origin, square(origin, half_width));
        while candidates.len() < limit && half_width < MAX_SEARCH_DEGREES {
            half_width *= 2.0;
            candidates = self.ranked_in(tree, origin, square(origin, half_width));
        }

        if let Some((furthest, _)) = candidates.get(limit - 1) {
            let bbox = BoundingBox::around(origin, furthest + WIDEN_SLACK_METERS);
            candidates = self.ranked_in(tree, origin, envelope(bbox));
        }

        candidates
            .into_iter()
            .take(limit)
            .map(|(_, facility)| facility)
            .collect()
    }

    /// Returns every facility within `radius_meters` (great-circle) of
    /// `origin`, optionally restricted to one type, paired with its
    /// distance and ordered by distance and then id.
    #[must_use]
    pub fn within_radius(
        &self,
        origin: GeoPoint,
        radius_meters: f64,
        facility_type: Option<FacilityType>,
    ) -> Vec<(&Facility, f64)> {
        let search = envelope(BoundingBox::around(origin, radius_meters));

        let trees: Vec<&RTree<IndexEntry>> = match facility_type {
            Some(facility_type) => self.by_type.get(&facility_type).into_iter().collect(),
            None => self.by_type.values().collect(),
        };

        let mut hits: Vec<(&Facility, f64)> = trees
            .into_iter()
            .flat_map(|tree| tree.locate_in_envelope_intersecting(&search))
            .filter_map(|entry| self.facilities.get(entry.slot))
            .map(|facility| (facility, distance_sphere_meters(origin, facility.point())))
            .filter(|(_, distance)| *distance <= radius_meters)
            .collect();

        hits.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.id.cmp(&b.0.id)));
        hits
    }

    fn ranked_in(
        &self,
        tree: &RTree<IndexEntry>,
        origin: GeoPoint,
        envelope: AABB<[f64; 2]>,
    ) -> Vec<(f64, &Facility)> {
        let mut ranked: Vec<(f64, &Facility)> = tree
            .locate_in_envelope_intersecting(&envelope)
            .filter_map(|entry| self.facilities.get(entry.slot))
            .map(|facility| (distance_sphere_meters(origin, facility.point()), facility))
            .collect();

        ranked.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.id.cmp(&b.1.id)));
        ranked
    }
}

fn square(center: GeoPoint, half_width: f64) -> AABB<[f64; 2]> {
    AABB::from_corners(
        [center.longitude - half_width, center.latitude - half_width],
        [center.longitude + half_width, center.latitude + half_width],
    )
}

fn envelope(bbox: BoundingBox) -> AABB<[f64; 2]> {
    AABB::from_corners([bbox.west, bbox.south], [bbox.east, bbox.north])
}
