#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Geodesic distance helpers and an in-memory nearest-facility index.
//!
//! Every distance here is measured on the sphere `PostGIS` uses for
//! `ST_DistanceSphere`, so candidate ordering and the distance reported to
//! users agree.

pub mod index;

use geo::{Distance as _, HaversineMeasure, Point};
use safe_map_facility_models::GeoPoint;

pub use index::FacilityIndex;

/// Sphere radius used by `PostGIS` `ST_DistanceSphere`, in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_370_986.0;

/// Great-circle distance between two points on the sphere, in meters.
#[must_use]
pub fn distance_sphere_meters(a: GeoPoint, b: GeoPoint) -> f64 {
    HaversineMeasure::new(EARTH_RADIUS_METERS).distance(to_point(a), to_point(b))
}

fn to_point(point: GeoPoint) -> Point<f64> {
    Point::new(point.longitude, point.latitude)
}

/// Rounds a distance to whole meters. Negative and non-finite inputs
/// clamp to zero.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn rounded_meters(distance: f64) -> u64 {
    if distance.is_finite() && distance > 0.0 {
        distance.round() as u64
    } else {
        0
    }
}

/// A geographic bounding box in WGS84 coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Western longitude boundary.
    pub west: f64,
    /// Southern latitude boundary.
    pub south: f64,
    /// Eastern longitude boundary.
    pub east: f64,
    /// Northern latitude boundary.
    pub north: f64,
}

impl BoundingBox {
    /// Creates a new bounding box from the given coordinates.
    #[must_use]
    pub const fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// Smallest box that contains every point within `radius_meters` of
    /// `center` on the sphere.
    ///
    /// Falls back to the full longitude range near the poles and when the
    /// box would cross the antimeridian.
    #[must_use]
    pub fn around(center: GeoPoint, radius_meters: f64) -> Self {
        let d_lat = (radius_meters / EARTH_RADIUS_METERS).to_degrees();
        let south = (center.latitude - d_lat).max(-90.0);
        let north = (center.latitude + d_lat).min(90.0);

        let max_abs_lat = south.abs().max(north.abs());
        if max_abs_lat >= 90.0 {
            return Self::new(-180.0, south, 180.0, north);
        }

        let d_lon = d_lat / max_abs_lat.to_radians().cos();
        let west = center.longitude - d_lon;
        let east = center.longitude + d_lon;

        if west < -180.0 || east > 180.0 {
            Self::new(-180.0, south, 180.0, north)
        } else {
            Self::new(west, south, east, north)
        }
    }
}
