#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Facility type taxonomy, safety ratings, and WGS84 point types.
//!
//! This crate defines the canonical facility classification used across
//! the safe-map system. Every facility carries exactly one
//! [`FacilityType`] and exactly one [`GeoPoint`]; nearest-facility queries
//! are always scoped to a single type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Center of Almaty, the default map center for the application.
pub const ALMATY_CENTER: GeoPoint = GeoPoint {
    longitude: 76.889_709,
    latitude: 43.238_949,
};

/// Classification of a facility.
///
/// Closed set. Used as an exact-match filter in nearest-facility queries.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum FacilityType {
    /// Hospitals, clinics, and medical centers
    Hospital,
    /// District police departments
    #[default]
    PoliceStation,
    /// Fire stations
    FireStation,
    /// Sightseeing destinations
    TouristSpot,
    /// Monitored areas with enhanced security
    SafeZone,
    /// Designated earthquake evacuation points
    EvacuationPoint,
    /// Mountain huts for hikers
    MountainShelter,
    /// Mountain rescue bases and safety posts
    RescuePoint,
    /// Restaurants
    Restaurant,
    /// Hotels
    Hotel,
    /// Stations, airports, and bus terminals
    TransportHub,
    /// Mountain recreation areas
    MountainArea,
    /// City districts
    CityArea,
    /// Anything not fitting the other types
    Other,
}

impl FacilityType {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Hospital,
            Self::PoliceStation,
            Self::FireStation,
            Self::TouristSpot,
            Self::SafeZone,
            Self::EvacuationPoint,
            Self::MountainShelter,
            Self::RescuePoint,
            Self::Restaurant,
            Self::Hotel,
            Self::TransportHub,
            Self::MountainArea,
            Self::CityArea,
            Self::Other,
        ]
    }

    /// Human-readable English label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Hospital => "Hospital",
            Self::PoliceStation => "Police Station",
            Self::FireStation => "Fire Station",
            Self::TouristSpot => "Tourist Spot",
            Self::SafeZone => "Safe Zone",
            Self::EvacuationPoint => "Evacuation Point",
            Self::MountainShelter => "Mountain Shelter",
            Self::RescuePoint => "Rescue Point",
            Self::Restaurant => "Restaurant",
            Self::Hotel => "Hotel",
            Self::TransportHub => "Transport Hub",
            Self::MountainArea => "Mountain Area",
            Self::CityArea => "City Area",
            Self::Other => "Other",
        }
    }
}

/// Ordinal safety rating of a facility, from very safe to unsafe.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SafetyRating {
    /// Staffed, well-lit, and monitored around the clock
    VerySafe,
    /// No known concerns
    #[default]
    Safe,
    /// Generally fine, some care advised
    Moderate,
    /// Known hazards, visit with caution
    Caution,
    /// Avoid unless necessary
    Unsafe,
}

impl SafetyRating {
    /// Human-readable English label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::VerySafe => "Very Safe",
            Self::Safe => "Safe",
            Self::Moderate => "Moderate",
            Self::Caution => "Caution",
            Self::Unsafe => "Unsafe",
        }
    }
}

/// Error returned when a coordinate pair is not a valid WGS84 point.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
#[error("invalid coordinate ({longitude}, {latitude}): expected lon in [-180, 180], lat in [-90, 90]")]
pub struct InvalidCoordinateError {
    /// Rejected longitude.
    pub longitude: f64,
    /// Rejected latitude.
    pub latitude: f64,
}

/// A point in WGS84 (SRID 4326) coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Longitude (X), decimal degrees.
    pub longitude: f64,
    /// Latitude (Y), decimal degrees.
    pub latitude: f64,
}

impl GeoPoint {
    /// Creates a point, rejecting non-finite or out-of-range values.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidCoordinateError`] if the longitude is outside
    /// `[-180, 180]` or the latitude is outside `[-90, 90]`.
    pub fn new(longitude: f64, latitude: f64) -> Result<Self, InvalidCoordinateError> {
        let point = Self {
            longitude,
            latitude,
        };
        if point.is_valid() {
            Ok(point)
        } else {
            Err(InvalidCoordinateError {
                longitude,
                latitude,
            })
        }
    }

    /// Whether both components are finite and within WGS84 bounds.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.longitude.is_finite()
            && self.latitude.is_finite()
            && (-180.0..=180.0).contains(&self.longitude)
            && (-90.0..=90.0).contains(&self.latitude)
    }
}

/// A point of interest as stored in the catalog.
///
/// Only [`Self::facility_type`] and the coordinates participate in query
/// semantics; everything else is payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Facility {
    /// Opaque unique identifier.
    pub id: String,
    /// Default (English) name.
    pub name: String,
    /// Kazakh name.
    #[serde(default)]
    pub name_kz: Option<String>,
    /// Russian name.
    #[serde(default)]
    pub name_ru: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub description_kz: Option<String>,
    #[serde(default)]
    pub description_ru: Option<String>,
    /// Longitude (WGS84).
    pub longitude: f64,
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Facility classification.
    #[serde(rename = "type")]
    pub facility_type: FacilityType,
    #[serde(default)]
    pub safety_rating: SafetyRating,
    /// Entry cost in local currency, if any.
    #[serde(default)]
    pub entry_cost: Option<f64>,
    #[serde(default)]
    pub is_free: bool,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub address_kz: Option<String>,
    #[serde(default)]
    pub address_ru: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub opening_hours: Option<String>,
    #[serde(default)]
    pub is_24_hours: bool,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub verified: bool,
    /// When the facility was created.
    pub created_at: DateTime<Utc>,
    /// When the facility was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Facility {
    /// The facility's location as a [`GeoPoint`].
    #[must_use]
    pub const fn point(&self) -> GeoPoint {
        GeoPoint {
            longitude: self.longitude,
            latitude: self.latitude,
        }
    }
}
