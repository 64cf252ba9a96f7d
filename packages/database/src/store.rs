//! Storage-layer seam for the facility catalog.
//!
//! [`FacilityStore`] is the narrow, parameterized interface the server
//! talks to. [`PostgisStore`] answers it with `PostGIS` queries;
//! [`MemoryStore`] answers it from an R-tree index loaded from a JSON
//! fixture. Both order nearest candidates by great-circle distance with
//! the facility id as tie-breaker.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use safe_map_facility_models::{Facility, FacilityType, GeoPoint};
use safe_map_spatial::FacilityIndex;
use switchy_database::Database;

use crate::{DbError, queries};

/// Read-only access to the facility catalog.
#[async_trait]
pub trait FacilityStore: Send + Sync {
    /// Every facility, newest first.
    async fn list_facilities(&self) -> Result<Vec<Facility>, DbError>;

    /// Up to `limit` facilities of exactly `facility_type`, closest first.
    async fn nearest_of_type(
        &self,
        origin: GeoPoint,
        facility_type: FacilityType,
        limit: u32,
    ) -> Result<Vec<Facility>, DbError>;

    /// Facilities within `radius_meters` of `origin`, in no particular
    /// order.
    async fn within_radius(
        &self,
        origin: GeoPoint,
        radius_meters: f64,
        facility_type: Option<FacilityType>,
    ) -> Result<Vec<Facility>, DbError>;
}

/// [`FacilityStore`] backed by a `PostGIS` database.
pub struct PostgisStore {
    db: Arc<dyn Database>,
}

impl PostgisStore {
    #[must_use]
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl FacilityStore for PostgisStore {
    async fn list_facilities(&self) -> Result<Vec<Facility>, DbError> {
        queries::list_facilities(self.db.as_ref()).await
    }

    async fn nearest_of_type(
        &self,
        origin: GeoPoint,
        facility_type: FacilityType,
        limit: u32,
    ) -> Result<Vec<Facility>, DbError> {
        queries::nearest_facilities_of_type(self.db.as_ref(), origin, facility_type, limit).await
    }

    async fn within_radius(
        &self,
        origin: GeoPoint,
        radius_meters: f64,
        facility_type: Option<FacilityType>,
    ) -> Result<Vec<Facility>, DbError> {
        queries::facilities_within_radius(self.db.as_ref(), origin, radius_meters, facility_type)
            .await
    }
}

/// [`FacilityStore`] backed by an immutable in-memory R-tree index.
pub struct MemoryStore {
    index: FacilityIndex,
}

impl MemoryStore {
    /// Builds a store from an explicit facility list.
    #[must_use]
    pub fn new(facilities: Vec<Facility>) -> Self {
        Self {
            index: FacilityIndex::new(facilities),
        }
    }

    /// Loads a JSON array of facilities (camelCase fields, same shape as
    /// the `/api/locations` response).
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the file cannot be read or parsed.
    pub async fn load(path: &Path) -> Result<Self, DbError> {
        let contents = tokio::fs::read_to_string(path).await?;
        let facilities: Vec<Facility> = serde_json::from_str(&contents)?;
        let store = Self::new(facilities);
        log::info!(
            "Loaded {} facilities from {}",
            store.index.len(),
            path.display()
        );
        for facility_type in FacilityType::all() {
            log::debug!(
                "  {facility_type}: {}",
                store.index.count_of_type(*facility_type)
            );
        }
        Ok(store)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

#[async_trait]
impl FacilityStore for MemoryStore {
    async fn list_facilities(&self) -> Result<Vec<Facility>, DbError> {
        Ok(self.index.facilities().to_vec())
    }

    async fn nearest_of_type(
        &self,
        origin: GeoPoint,
        facility_type: FacilityType,
        limit: u32,
    ) -> Result<Vec<Facility>, DbError> {
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(self
            .index
            .nearest_of_type(origin, facility_type, limit)
            .into_iter()
            .cloned()
            .collect())
    }

    async fn within_radius(
        &self,
        origin: GeoPoint,
        radius_meters: f64,
        facility_type: Option<FacilityType>,
    ) -> Result<Vec<Facility>, DbError> {
        Ok(self
            .index
            .within_radius(origin, radius_meters, facility_type)
            .into_iter()
            .map(|(facility, _)| facility.clone())
            .collect())
    }
}
