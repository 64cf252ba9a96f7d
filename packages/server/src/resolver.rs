//! Request validation and nearest/radius resolution on top of a
//! [`FacilityStore`].
//!
//! Every query is validated completely before the store is touched, so a
//! rejected request never costs a storage round trip. Candidate ordering is
//! left to the store; the distance reported to the client is always the
//! sphere great-circle distance, computed here.

use safe_map_database::DbError;
use safe_map_database::store::FacilityStore;
use safe_map_facility_models::{Facility, FacilityType, GeoPoint};
use safe_map_server_models::{NearestQueryParams, WithinQueryParams};
use safe_map_spatial::{distance_sphere_meters, rounded_meters};

use crate::config::CoordinatePolicy;

/// Largest radius accepted by the radius search, in kilometers.
pub const MAX_RADIUS_KM: f64 = 50.0;

/// Why a query could not be answered.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("Latitude and longitude are required")]
    MissingCoordinates,

    #[error("Latitude and longitude are out of range")]
    OutOfRange,

    #[error("Unknown location type: {0}")]
    UnknownType(String),

    #[error("Radius must be a positive number of kilometers")]
    InvalidRadius,

    #[error("No {0} found nearby")]
    NotFound(FacilityType),

    #[error(transparent)]
    Storage(#[from] DbError),
}

impl ResolveError {
    /// Whether the error is the client's fault.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::MissingCoordinates | Self::OutOfRange | Self::UnknownType(_) | Self::InvalidRadius
        )
    }
}

/// A facility with its rounded great-circle distance from the query point.
#[derive(Debug, Clone)]
pub struct RankedFacility {
    pub facility: Facility,
    pub distance_meters: u64,
}

/// A validated nearest-facility query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearestQuery {
    pub origin: GeoPoint,
    pub facility_type: FacilityType,
}

impl NearestQuery {
    /// Validates raw query parameters. `type` defaults to
    /// [`FacilityType::PoliceStation`] when absent or empty.
    ///
    /// # Errors
    ///
    /// * [`ResolveError::MissingCoordinates`] if `lat`/`lng` are absent or
    ///   unparseable, or zero under [`CoordinatePolicy::RejectZero`]
    /// * [`ResolveError::OutOfRange`] if the point is outside WGS-84 bounds
    /// * [`ResolveError::UnknownType`] if `type` is not a known facility type
    pub fn parse(
        params: &NearestQueryParams,
        policy: CoordinatePolicy,
    ) -> Result<Self, ResolveError> {
        let origin = parse_origin(params.lat.as_deref(), params.lng.as_deref(), policy)?;
        let facility_type = parse_type(params.facility_type.as_deref())?.unwrap_or_default();

        Ok(Self {
            origin,
            facility_type,
        })
    }
}

/// A validated radius query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WithinQuery {
    pub origin: GeoPoint,
    pub radius_meters: f64,
    pub facility_type: Option<FacilityType>,
}

impl WithinQuery {
    /// Validates raw query parameters. Radii above [`MAX_RADIUS_KM`] are
    /// clamped.
    ///
    /// # Errors
    ///
    /// Same coordinate and type errors as [`NearestQuery::parse`], plus
    /// [`ResolveError::InvalidRadius`] if `radiusKm` is absent, not a finite
    /// number, or not positive.
    pub fn parse(
        params: &WithinQueryParams,
        policy: CoordinatePolicy,
    ) -> Result<Self, ResolveError> {
        let origin = parse_origin(params.lat.as_deref(), params.lng.as_deref(), policy)?;

        let radius_km = parse_number(params.radius_km.as_deref())
            .filter(|r| r.is_finite() && *r > 0.0)
            .ok_or(ResolveError::InvalidRadius)?;

        let facility_type = parse_type(params.facility_type.as_deref())?;

        Ok(Self {
            origin,
            radius_meters: radius_km.min(MAX_RADIUS_KM) * 1_000.0,
            facility_type,
        })
    }
}

/// Returns the whole catalog, newest first.
///
/// # Errors
///
/// Returns [`ResolveError::Storage`] if the store fails.
pub async fn list_catalog(store: &dyn FacilityStore) -> Result<Vec<Facility>, ResolveError> {
    Ok(store.list_facilities().await?)
}

/// Finds the single closest facility of the query's type.
///
/// # Errors
///
/// * [`ResolveError::NotFound`] if no facility of that type exists
/// * [`ResolveError::Storage`] if the store fails
pub async fn resolve_nearest(
    store: &dyn FacilityStore,
    query: NearestQuery,
) -> Result<RankedFacility, ResolveError> {
    let facility = store
        .nearest_of_type(query.origin, query.facility_type, 1)
        .await?
        .into_iter()
        .next()
        .ok_or(ResolveError::NotFound(query.facility_type))?;

    let distance = distance_sphere_meters(query.origin, facility.point());
    log::debug!(
        "Nearest {} to ({}, {}) is {} at {distance:.1}m",
        query.facility_type,
        query.origin.latitude,
        query.origin.longitude,
        facility.id
    );

    Ok(RankedFacility {
        facility,
        distance_meters: rounded_meters(distance),
    })
}

/// Finds every facility within the query radius, closest first with the
/// facility id breaking ties.
///
/// # Errors
///
/// Returns [`ResolveError::Storage`] if the store fails.
pub async fn resolve_within(
    store: &dyn FacilityStore,
    query: WithinQuery,
) -> Result<Vec<RankedFacility>, ResolveError> {
    let candidates = store
        .within_radius(query.origin, query.radius_meters, query.facility_type)
        .await?;

    let mut ranked: Vec<(f64, Facility)> = candidates
        .into_iter()
        .map(|facility| (distance_sphere_meters(query.origin, facility.point()), facility))
        .filter(|(distance, _)| *distance <= query.radius_meters)
        .collect();

    ranked.sort_by(|(da, a), (db, b)| da.total_cmp(db).then_with(|| a.id.cmp(&b.id)));

    Ok(ranked
        .into_iter()
        .map(|(distance, facility)| RankedFacility {
            facility,
            distance_meters: rounded_meters(distance),
        })
        .collect())
}

fn parse_origin(
    lat: Option<&str>,
    lng: Option<&str>,
    policy: CoordinatePolicy,
) -> Result<GeoPoint, ResolveError> {
    let (Some(latitude), Some(longitude)) = (parse_number(lat), parse_number(lng)) else {
        return Err(ResolveError::MissingCoordinates);
    };

    if policy == CoordinatePolicy::RejectZero && (latitude == 0.0 || longitude == 0.0) {
        return Err(ResolveError::MissingCoordinates);
    }

    GeoPoint::new(longitude, latitude).map_err(|_| ResolveError::OutOfRange)
}

/// Parses a query number. `NaN` counts as absent.
fn parse_number(raw: Option<&str>) -> Option<f64> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|n| !n.is_nan())
}

fn parse_type(raw: Option<&str>) -> Result<Option<FacilityType>, ResolveError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(name) => name
            .parse()
            .map(Some)
            .map_err(|_| ResolveError::UnknownType(name.to_string())),
    }
}
