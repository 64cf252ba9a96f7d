//! HTTP handler functions for the safe map API.

use actix_web::error::{InternalError, QueryPayloadError};
use actix_web::{HttpRequest, HttpResponse, web};
use safe_map_facility_models::FacilityType;
use safe_map_server_models::{
    ApiFacility, ApiFacilityDistance, ApiFacilityTypeNode, ApiHealth, NearestQueryParams,
    WithinQueryParams,
};

use crate::AppState;
use crate::resolver::{self, NearestQuery, RankedFacility, ResolveError, WithinQuery};

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/location-types`
///
/// Returns every facility type with its display label.
pub async fn location_types() -> HttpResponse {
    let types: Vec<ApiFacilityTypeNode> = FacilityType::all()
        .iter()
        .map(|t| ApiFacilityTypeNode {
            name: t.to_string(),
            label: t.label().to_string(),
        })
        .collect();

    HttpResponse::Ok().json(types)
}

/// `GET /api/locations`
///
/// Returns the full catalog, newest first.
pub async fn locations(state: web::Data<AppState>) -> HttpResponse {
    match resolver::list_catalog(state.store.as_ref()).await {
        Ok(facilities) => {
            let api_facilities: Vec<ApiFacility> =
                facilities.into_iter().map(ApiFacility::from).collect();
            HttpResponse::Ok().json(api_facilities)
        }
        Err(e) => error_response(&e, "Failed to fetch locations"),
    }
}

/// `GET /api/locations/nearest`
///
/// Finds the closest facility of one type to `lat`/`lng`.
pub async fn nearest(
    state: web::Data<AppState>,
    params: web::Query<NearestQueryParams>,
) -> HttpResponse {
    let query = match NearestQuery::parse(&params, state.config.coordinate_policy) {
        Ok(query) => query,
        Err(e) => return error_response(&e, "Failed to find nearest location"),
    };

    match resolver::resolve_nearest(state.store.as_ref(), query).await {
        Ok(ranked) => HttpResponse::Ok().json(to_api(ranked)),
        Err(e) => error_response(&e, "Failed to find nearest location"),
    }
}

/// `GET /api/locations/within`
///
/// Lists facilities within `radiusKm` of `lat`/`lng`, closest first.
pub async fn within(
    state: web::Data<AppState>,
    params: web::Query<WithinQueryParams>,
) -> HttpResponse {
    let query = match WithinQuery::parse(&params, state.config.coordinate_policy) {
        Ok(query) => query,
        Err(e) => return error_response(&e, "Failed to find locations within radius"),
    };

    match resolver::resolve_within(state.store.as_ref(), query).await {
        Ok(ranked) => {
            let results: Vec<ApiFacilityDistance> = ranked.into_iter().map(to_api).collect();
            HttpResponse::Ok().json(results)
        }
        Err(e) => error_response(&e, "Failed to find locations within radius"),
    }
}

fn to_api(ranked: RankedFacility) -> ApiFacilityDistance {
    ApiFacilityDistance {
        location: ApiFacility::from(ranked.facility),
        distance_meters: ranked.distance_meters,
    }
}

/// Maps a [`ResolveError`] to its JSON response. Storage causes are logged
/// and replaced with `storage_message`.
fn error_response(error: &ResolveError, storage_message: &str) -> HttpResponse {
    match error {
        ResolveError::Storage(e) => {
            log::error!("{storage_message}: {e}");
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": storage_message
            }))
        }
        _ if error.is_validation() => HttpResponse::BadRequest().json(serde_json::json!({
            "error": error.to_string()
        })),
        _ => HttpResponse::NotFound().json(serde_json::json!({
            "error": error.to_string()
        })),
    }
}

/// Rejects query strings that cannot be deserialized at all (e.g. a
/// repeated key) with the same JSON error shape as every other failure.
pub fn query_error(error: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    log::debug!("Rejected query string: {error}");
    let response = HttpResponse::BadRequest().json(serde_json::json!({
        "error": "Invalid query parameters"
    }));
    InternalError::from_response(error, response).into()
}
