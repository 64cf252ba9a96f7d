#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the safe map server.
//!
//! These types are serialized to JSON for the REST API and consumed
//! verbatim by the map front-end. They are separate from
//! [`safe_map_facility_models::Facility`] so the storage shape and the API
//! contract can evolve independently.

use chrono::{DateTime, SecondsFormat, Utc};
use safe_map_facility_models::{Facility, FacilityType, SafetyRating};
use serde::{Deserialize, Serialize};

/// A facility as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiFacility {
    /// Opaque facility ID.
    pub id: String,
    pub name: String,
    pub name_kz: Option<String>,
    pub name_ru: Option<String>,
    pub description: Option<String>,
    pub description_kz: Option<String>,
    pub description_ru: Option<String>,
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
    /// Facility type, e.g. `HOSPITAL`.
    #[serde(rename = "type")]
    pub facility_type: FacilityType,
    pub safety_rating: SafetyRating,
    pub entry_cost: Option<f64>,
    pub is_free: bool,
    pub address: Option<String>,
    pub address_kz: Option<String>,
    pub address_ru: Option<String>,
    pub phone_number: Option<String>,
    pub website: Option<String>,
    pub email: Option<String>,
    pub opening_hours: Option<String>,
    pub is_24_hours: bool,
    pub image_url: Option<String>,
    pub tags: Vec<String>,
    pub verified: bool,
    /// Creation time, ISO 8601 with millisecond precision.
    pub created_at: String,
    /// Last update time, ISO 8601 with millisecond precision.
    pub updated_at: String,
}

impl From<Facility> for ApiFacility {
    fn from(facility: Facility) -> Self {
        Self {
            id: facility.id,
            name: facility.name,
            name_kz: facility.name_kz,
            name_ru: facility.name_ru,
            description: facility.description,
            description_kz: facility.description_kz,
            description_ru: facility.description_ru,
            latitude: facility.latitude,
            longitude: facility.longitude,
            facility_type: facility.facility_type,
            safety_rating: facility.safety_rating,
            entry_cost: facility.entry_cost,
            is_free: facility.is_free,
            address: facility.address,
            address_kz: facility.address_kz,
            address_ru: facility.address_ru,
            phone_number: facility.phone_number,
            website: facility.website,
            email: facility.email,
            opening_hours: facility.opening_hours,
            is_24_hours: facility.is_24_hours,
            image_url: facility.image_url,
            tags: facility.tags,
            verified: facility.verified,
            created_at: iso_millis(facility.created_at),
            updated_at: iso_millis(facility.updated_at),
        }
    }
}

/// Formats a timestamp like `2025-01-01T00:00:00.000Z`.
fn iso_millis(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// A facility paired with its great-circle distance from the query point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiFacilityDistance {
    /// The matched facility.
    pub location: ApiFacility,
    /// Distance from the query point, rounded to whole meters.
    pub distance_meters: u64,
}

/// Query parameters for the nearest-facility endpoint.
///
/// Values are kept as raw strings so that absent, empty, and unparseable
/// coordinates are all reported with the same validation error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NearestQueryParams {
    /// Latitude in decimal degrees.
    pub lat: Option<String>,
    /// Longitude in decimal degrees.
    pub lng: Option<String>,
    /// Facility type name. Defaults to `POLICE_STATION`.
    #[serde(rename = "type")]
    pub facility_type: Option<String>,
}

/// Query parameters for the radius search endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithinQueryParams {
    /// Latitude in decimal degrees.
    pub lat: Option<String>,
    /// Longitude in decimal degrees.
    pub lng: Option<String>,
    /// Search radius in kilometers.
    pub radius_km: Option<String>,
    /// Optional facility type name filter.
    #[serde(rename = "type")]
    pub facility_type: Option<String>,
}

/// An entry in the facility type taxonomy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiFacilityTypeNode {
    /// Enum name, e.g. `EVACUATION_POINT`.
    pub name: String,
    /// Human-readable label, e.g. `Evacuation Point`.
    pub label: String,
}

/// Health check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the service is healthy.
    pub healthy: bool,
    /// Service version.
    pub version: String,
}
