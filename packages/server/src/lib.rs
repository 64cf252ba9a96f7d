#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the safe map facility service.
//!
//! Serves the facility catalog feeding the map and the nearest-facility
//! lookup behind the "closest hospital / police station" buttons. Requests
//! are answered by a [`FacilityStore`] chosen at startup: `PostGIS` in
//! production or an in-memory R-tree loaded from a JSON fixture.

pub mod config;
mod handlers;
pub mod resolver;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use safe_map_database::store::{FacilityStore, MemoryStore, PostgisStore};
use safe_map_database::{db, run_migrations};

use crate::config::{ServerConfig, StoreBackend};

/// Shared application state.
pub struct AppState {
    /// Facility storage backend.
    pub store: Arc<dyn FacilityStore>,
    /// Startup configuration.
    pub config: ServerConfig,
}

/// Registers the `/api` routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .app_data(web::QueryConfig::default().error_handler(handlers::query_error))
            .route("/health", web::get().to(handlers::health))
            .route("/location-types", web::get().to(handlers::location_types))
            .route("/locations", web::get().to(handlers::locations))
            .route("/locations/nearest", web::get().to(handlers::nearest))
            .route("/locations/within", web::get().to(handlers::within)),
    );
}

/// Opens the configured facility store. For `PostGIS` this connects and
/// runs pending migrations.
///
/// # Errors
///
/// Returns an error if the database connection, migrations, or fixture
/// load fail.
#[allow(clippy::future_not_send)]
pub async fn open_store(
    config: &ServerConfig,
) -> Result<Arc<dyn FacilityStore>, Box<dyn std::error::Error>> {
    match config.store {
        StoreBackend::Postgis => {
            log::info!("Connecting to database...");
            let db_conn = db::connect(&config.database_url).await?;

            log::info!("Running migrations...");
            run_migrations(db_conn.as_ref()).await?;

            Ok(Arc::new(PostgisStore::new(Arc::from(db_conn))))
        }
        StoreBackend::Memory => {
            log::info!(
                "Loading facilities from {}...",
                config.facilities_path.display()
            );
            let store = MemoryStore::load(&config.facilities_path).await?;
            if store.is_empty() {
                log::warn!("Facility fixture is empty");
            }
            Ok(Arc::new(store))
        }
    }
}

/// Starts the safe map API server.
///
/// Reads [`ServerConfig`] from the environment, opens the facility store,
/// and starts the Actix-Web HTTP server. The caller provides the async
/// runtime (e.g. via `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an `std::io::Result` error if the store cannot be opened, the
/// HTTP server fails to bind, or it encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let config = ServerConfig::from_env();
    log::debug!("Server config: {config:?}");

    let store = open_store(&config).await.map_err(|e| {
        log::error!("Failed to open facility store: {e}");
        std::io::Error::other(e.to_string())
    })?;

    let bind_addr = config.bind_addr.clone();
    let port = config.port;
    let state = web::Data::new(AppState { store, config });

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((bind_addr, port))?
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use actix_web::http::StatusCode;
    use actix_web::test;
    use async_trait::async_trait;
    use safe_map_database::DbError;
    use safe_map_facility_models::{Facility, FacilityType, GeoPoint};
    use serde_json::{Value, json};

    use super::*;
    use crate::config::CoordinatePolicy;

    /// Wraps a [`MemoryStore`] and counts every storage call.
    struct CountingStore {
        inner: MemoryStore,
        calls: AtomicUsize,
    }

    impl CountingStore {
        fn new(facilities: Vec<Facility>) -> Self {
            Self {
                inner: MemoryStore::new(facilities),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl FacilityStore for CountingStore {
        async fn list_facilities(&self) -> Result<Vec<Facility>, DbError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.list_facilities().await
        }

        async fn nearest_of_type(
            &self,
            origin: GeoPoint,
            facility_type: FacilityType,
            limit: u32,
        ) -> Result<Vec<Facility>, DbError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.nearest_of_type(origin, facility_type, limit).await
        }

        async fn within_radius(
            &self,
            origin: GeoPoint,
            radius_meters: f64,
            facility_type: Option<FacilityType>,
        ) -> Result<Vec<Facility>, DbError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner
                .within_radius(origin, radius_meters, facility_type)
                .await
        }
    }

    /// Fails every call, like a database that went away.
    struct BrokenStore;

    fn broken() -> DbError {
        DbError::Conversion {
            message: "connection reset by peer".to_string(),
        }
    }

    #[async_trait]
    impl FacilityStore for BrokenStore {
        async fn list_facilities(&self) -> Result<Vec<Facility>, DbError> {
            Err(broken())
        }

        async fn nearest_of_type(
            &self,
            _origin: GeoPoint,
            _facility_type: FacilityType,
            _limit: u32,
        ) -> Result<Vec<Facility>, DbError> {
            Err(broken())
        }

        async fn within_radius(
            &self,
            _origin: GeoPoint,
            _radius_meters: f64,
            _facility_type: Option<FacilityType>,
        ) -> Result<Vec<Facility>, DbError> {
            Err(broken())
        }
    }

    fn facility(id: &str, facility_type: &str, lat: f64, lng: f64, created_at: &str) -> Facility {
        serde_json::from_value(json!({
            "id": id,
            "name": format!("Facility {id}"),
            "latitude": lat,
            "longitude": lng,
            "type": facility_type,
            "createdAt": created_at,
            "updatedAt": created_at,
        }))
        .unwrap()
    }

    fn almaty() -> Vec<Facility> {
        vec![
            facility("h1", "HOSPITAL", 43.25, 76.90, "2025-01-02T00:00:00Z"),
            facility("h2", "HOSPITAL", 43.30, 76.95, "2025-01-03T00:00:00Z"),
            facility("p1", "POLICE_STATION", 43.20, 76.85, "2025-01-01T00:00:00Z"),
            facility("e1", "EVACUATION_POINT", 43.241, 76.911, "2025-01-04T00:00:00Z"),
        ]
    }

    fn state(store: Arc<dyn FacilityStore>, policy: CoordinatePolicy) -> web::Data<AppState> {
        web::Data::new(AppState {
            store,
            config: ServerConfig {
                coordinate_policy: policy,
                ..ServerConfig::default()
            },
        })
    }

    async fn get_json(state: web::Data<AppState>, uri: &str) -> (StatusCode, Value) {
        let app = test::init_service(App::new().app_data(state).configure(configure)).await;
        let req = test::TestRequest::get().uri(uri).to_request();
        let resp = test::call_service(&app, req).await;
        let status = resp.status();
        let body: Value = test::read_body_json(resp).await;
        (status, body)
    }

    #[actix_web::test]
    async fn nearest_hospital_with_distance() {
        let store = Arc::new(CountingStore::new(almaty()));
        let (status, body) = get_json(
            state(store.clone(), CoordinatePolicy::RejectZero),
            "/api/locations/nearest?lat=43.24&lng=76.91&type=HOSPITAL",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["location"]["id"], "h1");
        assert_eq!(body["location"]["type"], "HOSPITAL");
        let distance = body["distanceMeters"].as_u64().unwrap();
        assert!((1_370..=1_380).contains(&distance), "distance {distance}");
        assert_eq!(store.calls(), 1);
    }

    #[actix_web::test]
    async fn nearest_defaults_to_police_station() {
        let store = Arc::new(CountingStore::new(almaty()));
        let (status, body) = get_json(
            state(store, CoordinatePolicy::RejectZero),
            "/api/locations/nearest?lat=43.24&lng=76.91",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["location"]["id"], "p1");
    }

    #[actix_web::test]
    async fn nearest_never_returns_another_type() {
        let store = Arc::new(CountingStore::new(almaty()));
        let (status, body) = get_json(
            state(store, CoordinatePolicy::RejectZero),
            "/api/locations/nearest?lat=43.241&lng=76.911&type=HOSPITAL",
        )
        .await;

        // e1 sits on the query point but is an evacuation point.
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["location"]["id"], "h1");
    }

    #[actix_web::test]
    async fn nearest_coincident_point_is_zero_meters() {
        let store = Arc::new(CountingStore::new(almaty()));
        let (status, body) = get_json(
            state(store, CoordinatePolicy::RejectZero),
            "/api/locations/nearest?lat=43.241&lng=76.911&type=EVACUATION_POINT",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["location"]["id"], "e1");
        assert_eq!(body["distanceMeters"], 0);
    }

    #[actix_web::test]
    async fn nearest_missing_type_is_not_found() {
        let store = Arc::new(CountingStore::new(almaty()));
        let (status, body) = get_json(
            state(store.clone(), CoordinatePolicy::RejectZero),
            "/api/locations/nearest?lat=43.24&lng=76.91&type=FIRE_STATION",
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "error": "No FIRE_STATION found nearby" }));
        assert_eq!(store.calls(), 1);
    }

    #[actix_web::test]
    async fn nearest_rejects_zero_and_missing_without_storage() {
        for uri in [
            "/api/locations/nearest?lat=0&lng=76.91",
            "/api/locations/nearest?lat=43.24&lng=0",
            "/api/locations/nearest?lng=76.91",
            "/api/locations/nearest",
        ] {
            let store = Arc::new(CountingStore::new(almaty()));
            let (status, body) =
                get_json(state(store.clone(), CoordinatePolicy::RejectZero), uri).await;

            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(
                body,
                json!({ "error": "Latitude and longitude are required" }),
                "{uri}"
            );
            assert_eq!(store.calls(), 0, "{uri}");
        }
    }

    #[actix_web::test]
    async fn nearest_accepts_zero_when_allowed() {
        let store = Arc::new(CountingStore::new(vec![facility(
            "null-island",
            "SAFE_ZONE",
            0.01,
            0.01,
            "2025-01-01T00:00:00Z",
        )]));
        let (status, body) = get_json(
            state(store.clone(), CoordinatePolicy::RequirePresent),
            "/api/locations/nearest?lat=0&lng=0&type=SAFE_ZONE",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["location"]["id"], "null-island");
        assert_eq!(store.calls(), 1);
    }

    #[actix_web::test]
    async fn nearest_rejects_bad_type_and_range_without_storage() {
        let cases = [
            (
                "/api/locations/nearest?lat=43.24&lng=76.91&type=CASINO",
                "Unknown location type: CASINO",
            ),
            (
                "/api/locations/nearest?lat=95&lng=76.91",
                "Latitude and longitude are out of range",
            ),
        ];

        for (uri, message) in cases {
            let store = Arc::new(CountingStore::new(almaty()));
            let (status, body) =
                get_json(state(store.clone(), CoordinatePolicy::RejectZero), uri).await;

            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(body, json!({ "error": message }), "{uri}");
            assert_eq!(store.calls(), 0, "{uri}");
        }
    }

    #[actix_web::test]
    async fn malformed_query_string_gets_a_json_error() {
        let store = Arc::new(CountingStore::new(almaty()));
        let (status, body) = get_json(
            state(store.clone(), CoordinatePolicy::RejectZero),
            "/api/locations/nearest?lat=43.24&lat=43.25&lng=76.91",
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "Invalid query parameters" }));
        assert_eq!(store.calls(), 0);
    }

    #[actix_web::test]
    async fn nearest_nan_coordinate_is_missing() {
        let store = Arc::new(CountingStore::new(almaty()));
        let (status, body) = get_json(
            state(store.clone(), CoordinatePolicy::RejectZero),
            "/api/locations/nearest?lat=NaN&lng=76.91",
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "Latitude and longitude are required" }));
        assert_eq!(store.calls(), 0);
    }

    #[actix_web::test]
    async fn nearest_picks_the_closest_on_the_ground() {
        // "north" is nearer in raw degrees, "east" is nearer in meters.
        let store = Arc::new(CountingStore::new(vec![
            facility("north", "HOSPITAL", 43.01, 77.0, "2025-01-01T00:00:00Z"),
            facility("east", "HOSPITAL", 43.0, 77.012, "2025-01-01T00:00:00Z"),
        ]));
        let (status, body) = get_json(
            state(store, CoordinatePolicy::RejectZero),
            "/api/locations/nearest?lat=43&lng=77&type=HOSPITAL",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["location"]["id"], "east");
        assert_eq!(body["distanceMeters"], 976);
    }

    #[actix_web::test]
    async fn nearest_equidistant_is_deterministic() {
        let north = facility("p-north", "POLICE_STATION", 43.5, 77.0, "2025-01-01T00:00:00Z");
        let south = facility("p-south", "POLICE_STATION", 42.5, 77.0, "2025-01-01T00:00:00Z");

        for facilities in [
            vec![north.clone(), south.clone()],
            vec![south.clone(), north.clone()],
        ] {
            let store: Arc<dyn FacilityStore> = Arc::new(CountingStore::new(facilities));
            for _ in 0..2 {
                let (status, body) = get_json(
                    state(store.clone(), CoordinatePolicy::RejectZero),
                    "/api/locations/nearest?lat=43&lng=77&type=POLICE_STATION",
                )
                .await;
                assert_eq!(status, StatusCode::OK);
                assert_eq!(body["location"]["id"], "p-north");
            }
        }
    }

    #[actix_web::test]
    async fn nearest_storage_fault_is_opaque() {
        let (status, body) = get_json(
            state(Arc::new(BrokenStore), CoordinatePolicy::RejectZero),
            "/api/locations/nearest?lat=43.24&lng=76.91",
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "Failed to find nearest location" }));
    }

    #[actix_web::test]
    async fn catalog_is_complete_and_newest_first() {
        let store = Arc::new(CountingStore::new(almaty()));
        let (status, body) =
            get_json(state(store.clone(), CoordinatePolicy::RejectZero), "/api/locations").await;

        assert_eq!(status, StatusCode::OK);
        let ids: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["e1", "h2", "h1", "p1"]);
        assert_eq!(body[0]["latitude"], 43.241);
        assert_eq!(body[0]["longitude"], 76.911);
        assert_eq!(body[0]["createdAt"], "2025-01-04T00:00:00.000Z");
        assert!(body[0]["entryCost"].is_null());
        assert_eq!(store.calls(), 1);
    }

    #[actix_web::test]
    async fn empty_catalog_is_an_empty_array() {
        let store = Arc::new(CountingStore::new(Vec::new()));
        let (status, body) =
            get_json(state(store, CoordinatePolicy::RejectZero), "/api/locations").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }

    #[actix_web::test]
    async fn catalog_storage_fault_is_opaque() {
        let (status, body) = get_json(
            state(Arc::new(BrokenStore), CoordinatePolicy::RejectZero),
            "/api/locations",
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "Failed to fetch locations" }));
    }

    #[actix_web::test]
    async fn within_sorts_by_distance() {
        let store = Arc::new(CountingStore::new(almaty()));
        let (status, body) = get_json(
            state(store, CoordinatePolicy::RejectZero),
            "/api/locations/within?lat=43.24&lng=76.91&radiusKm=3",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let ids: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["location"]["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["e1", "h1"]);
        let first = body[0]["distanceMeters"].as_u64().unwrap();
        let second = body[1]["distanceMeters"].as_u64().unwrap();
        assert!(first < second);
    }

    #[actix_web::test]
    async fn within_filters_by_type() {
        let store = Arc::new(CountingStore::new(almaty()));
        let (status, body) = get_json(
            state(store, CoordinatePolicy::RejectZero),
            "/api/locations/within?lat=43.24&lng=76.91&radiusKm=20&type=HOSPITAL",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let ids: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["location"]["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["h1", "h2"]);
    }

    #[actix_web::test]
    async fn within_rejects_bad_radius_without_storage() {
        let store = Arc::new(CountingStore::new(almaty()));
        let (status, body) = get_json(
            state(store.clone(), CoordinatePolicy::RejectZero),
            "/api/locations/within?lat=43.24&lng=76.91&radiusKm=-1",
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({ "error": "Radius must be a positive number of kilometers" })
        );
        assert_eq!(store.calls(), 0);
    }

    #[actix_web::test]
    async fn within_storage_fault_is_opaque() {
        let (status, body) = get_json(
            state(Arc::new(BrokenStore), CoordinatePolicy::RejectZero),
            "/api/locations/within?lat=43.24&lng=76.91&radiusKm=1",
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            json!({ "error": "Failed to find locations within radius" })
        );
    }

    #[actix_web::test]
    async fn location_types_in_enum_order() {
        let (status, body) = get_json(
            state(Arc::new(BrokenStore), CoordinatePolicy::RejectZero),
            "/api/location-types",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let types = body.as_array().unwrap();
        assert_eq!(types.len(), FacilityType::all().len());
        assert_eq!(types[0], json!({ "name": "HOSPITAL", "label": "Hospital" }));
        assert_eq!(types[1]["name"], "POLICE_STATION");
    }

    #[actix_web::test]
    async fn health_reports_version() {
        let (status, body) = get_json(
            state(Arc::new(BrokenStore), CoordinatePolicy::RejectZero),
            "/api/health",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["healthy"], true);
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }
}
