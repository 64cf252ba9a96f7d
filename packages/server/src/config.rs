//! Server configuration read from environment variables at startup.

use std::path::PathBuf;

use safe_map_database::db::DEFAULT_DATABASE_URL;

/// Fixture used by the in-memory store when `FACILITIES_PATH` is unset.
pub const DEFAULT_FACILITIES_PATH: &str = "data/facilities.json";

/// Which [`safe_map_database::store::FacilityStore`] implementation serves
/// requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreBackend {
    /// `PostGIS` via `DATABASE_URL`.
    #[default]
    Postgis,
    /// In-memory R-tree loaded from `FACILITIES_PATH`.
    Memory,
}

impl StoreBackend {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "postgis" | "postgres" => Some(Self::Postgis),
            "memory" => Some(Self::Memory),
            _ => None,
        }
    }
}

/// How query coordinates equal to exactly zero are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoordinatePolicy {
    /// A latitude or longitude of `0` counts as missing.
    #[default]
    RejectZero,
    /// Only absent or unparseable values count as missing.
    RequirePresent,
}

/// Startup configuration for the API server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub port: u16,
    pub database_url: String,
    pub store: StoreBackend,
    pub facilities_path: PathBuf,
    pub coordinate_policy: CoordinatePolicy,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".to_string(),
            port: 8080,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            store: StoreBackend::default(),
            facilities_path: PathBuf::from(DEFAULT_FACILITIES_PATH),
            coordinate_policy: CoordinatePolicy::default(),
        }
    }
}

impl ServerConfig {
    /// Reads configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`, falling back to defaults for
    /// unset or unparseable values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let store = match lookup("FACILITY_STORE") {
            Some(value) => StoreBackend::parse(&value).unwrap_or_else(|| {
                log::warn!("Unknown FACILITY_STORE '{value}', using postgis");
                StoreBackend::Postgis
            }),
            None => defaults.store,
        };

        let coordinate_policy = match lookup("ALLOW_ZERO_COORDINATES").as_deref().map(str::trim) {
            Some("true" | "1") => CoordinatePolicy::RequirePresent,
            _ => CoordinatePolicy::RejectZero,
        };

        Self {
            bind_addr: lookup("BIND_ADDR").unwrap_or(defaults.bind_addr),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            database_url: lookup("DATABASE_URL").unwrap_or(defaults.database_url),
            store,
            facilities_path: lookup("FACILITIES_PATH")
                .map_or(defaults.facilities_path, PathBuf::from),
            coordinate_policy,
        }
    }
}
