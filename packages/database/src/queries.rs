//! `PostGIS` query functions for the facility catalog.
//!
//! Facility coordinates live in a `geometry(Point, 4326)` column with a
//! GIST index on its `geography` cast. Nearest lookups order by the `<->`
//! operator over `geography`, which measures on the sphere and lets the
//! index answer "closest of type X" without scanning every row of that
//! type. Distances reported to users are computed separately (see
//! `safe_map_spatial::distance_sphere_meters`).

use moosicbox_json_utils::database::ToValue as _;
use safe_map_facility_models::{Facility, FacilityType, GeoPoint, SafetyRating};
use switchy_database::{Database, DatabaseValue, Row};

use crate::DbError;

/// Column projection shared by every facility query. Enum columns are cast
/// to text, the decimal cost to `float8`, and the point decomposed into
/// longitude/latitude scalars.
const FACILITY_COLUMNS: &str = "id, name, name_kz, name_ru,
        description, description_kz, description_ru,
        type::text AS facility_type,
        safety_rating::text AS safety_rating,
        entry_cost::float8 AS entry_cost,
        is_free, address, address_kz, address_ru,
        phone_number, website, email, opening_hours,
        is_24_hours, image_url,
        COALESCE(array_to_json(tags)::text, '[]') AS tags_json,
        verified, created_at, updated_at,
        ST_X(coordinates) AS longitude,
        ST_Y(coordinates) AS latitude";

/// Returns every facility, newest first. No pagination.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails or a row cannot be converted.
pub async fn list_facilities(db: &dyn Database) -> Result<Vec<Facility>, DbError> {
    let sql = format!(
        "SELECT {FACILITY_COLUMNS}
         FROM locations
         ORDER BY created_at DESC, id"
    );

    let rows = db.query_raw_params(&sql, &[]).await?;
    rows.iter().map(facility_from_row).collect()
}

/// Returns up to `limit` facilities of one type ordered by great-circle
/// proximity to `origin`, with the facility id as a secondary key so exact
/// ties resolve the same way on every call.
///
/// The type is bound as a text parameter and cast to the enum inside the
/// query; callers can only pass validated [`FacilityType`] values.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails or a row cannot be converted.
pub async fn nearest_facilities_of_type(
    db: &dyn Database,
    origin: GeoPoint,
    facility_type: FacilityType,
    limit: u32,
) -> Result<Vec<Facility>, DbError> {
    let rows = db
        .query_raw_params(
            &nearest_sql(),
            &[
                DatabaseValue::Real64(origin.longitude),
                DatabaseValue::Real64(origin.latitude),
                DatabaseValue::String(facility_type.as_ref().to_string()),
                DatabaseValue::Int64(i64::from(limit)),
            ],
        )
        .await?;

    rows.iter().map(facility_from_row).collect()
}

/// Builds the nearest-of-type query. `$1`/`$2` are the origin longitude and
/// latitude, `$3` the type name, `$4` the limit.
fn nearest_sql() -> String {
    format!(
        "SELECT {FACILITY_COLUMNS}
         FROM locations
         WHERE type = CAST($3::text AS \"LocationType\")
         ORDER BY coordinates::geography <-> ST_SetSRID(ST_MakePoint($1, $2), 4326)::geography, id
         LIMIT $4"
    )
}

/// Returns facilities within `radius_meters` of `origin` on the sphere,
/// optionally restricted to one type. Rows come back unordered; callers
/// rank them by their own distance computation.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails or a row cannot be converted.
pub async fn facilities_within_radius(
    db: &dyn Database,
    origin: GeoPoint,
    radius_meters: f64,
    facility_type: Option<FacilityType>,
) -> Result<Vec<Facility>, DbError> {
    let sql = within_radius_sql(facility_type.is_some());

    let mut params = vec![
        DatabaseValue::Real64(origin.longitude),
        DatabaseValue::Real64(origin.latitude),
        DatabaseValue::Real64(radius_meters),
    ];
    if let Some(facility_type) = facility_type {
        params.push(DatabaseValue::String(facility_type.as_ref().to_string()));
    }

    let rows = db.query_raw_params(&sql, &params).await?;
    rows.iter().map(facility_from_row).collect()
}

/// Builds the radius query. `ST_DWithin` over `geography` with
/// `use_spheroid = false` measures on the same sphere family as the
/// reported distance.
fn within_radius_sql(with_type: bool) -> String {
    let mut sql = format!(
        "SELECT {FACILITY_COLUMNS}
         FROM locations
         WHERE ST_DWithin(
             coordinates::geography,
             ST_SetSRID(ST_MakePoint($1, $2), 4326)::geography,
             $3,
             false
         )"
    );

    if with_type {
        sql.push_str(" AND type = CAST($4::text AS \"LocationType\")");
    }

    sql
}

/// Converts one projected row into a [`Facility`].
fn facility_from_row(row: &Row) -> Result<Facility, DbError> {
    let id: String = row.to_value("id").map_err(|e| DbError::Conversion {
        message: format!("Failed to parse facility id: {e}"),
    })?;

    let type_name: String = row.to_value("facility_type").unwrap_or_default();
    let facility_type = type_name
        .parse::<FacilityType>()
        .map_err(|_| DbError::Conversion {
            message: format!("Unknown location type '{type_name}' for facility {id}"),
        })?;

    let rating_name: String = row.to_value("safety_rating").unwrap_or_default();
    let safety_rating = rating_name.parse::<SafetyRating>().unwrap_or_else(|_| {
        log::warn!("Unknown safety rating '{rating_name}' for facility {id}, using default");
        SafetyRating::default()
    });

    let longitude: f64 = row.to_value("longitude").map_err(|e| DbError::Conversion {
        message: format!("Failed to parse longitude for facility {id}: {e}"),
    })?;
    let latitude: f64 = row.to_value("latitude").map_err(|e| DbError::Conversion {
        message: format!("Failed to parse latitude for facility {id}: {e}"),
    })?;

    let tags_json: String = row.to_value("tags_json").unwrap_or_default();
    let tags = parse_tags(&tags_json)?;

    let name: String = row.to_value("name").map_err(|e| DbError::Conversion {
        message: format!("Failed to parse name for facility {id}: {e}"),
    })?;
    let created_at: chrono::NaiveDateTime =
        row.to_value("created_at").map_err(|e| DbError::Conversion {
            message: format!("Failed to parse created_at for facility {id}: {e}"),
        })?;
    let updated_at: chrono::NaiveDateTime =
        row.to_value("updated_at").map_err(|e| DbError::Conversion {
            message: format!("Failed to parse updated_at for facility {id}: {e}"),
        })?;

    Ok(Facility {
        name,
        name_kz: row.to_value("name_kz").unwrap_or(None),
        name_ru: row.to_value("name_ru").unwrap_or(None),
        description: row.to_value("description").unwrap_or(None),
        description_kz: row.to_value("description_kz").unwrap_or(None),
        description_ru: row.to_value("description_ru").unwrap_or(None),
        longitude,
        latitude,
        facility_type,
        safety_rating,
        entry_cost: row.to_value("entry_cost").unwrap_or(None),
        is_free: row.to_value("is_free").unwrap_or(false),
        address: row.to_value("address").unwrap_or(None),
        address_kz: row.to_value("address_kz").unwrap_or(None),
        address_ru: row.to_value("address_ru").unwrap_or(None),
        phone_number: row.to_value("phone_number").unwrap_or(None),
        website: row.to_value("website").unwrap_or(None),
        email: row.to_value("email").unwrap_or(None),
        opening_hours: row.to_value("opening_hours").unwrap_or(None),
        is_24_hours: row.to_value("is_24_hours").unwrap_or(false),
        image_url: row.to_value("image_url").unwrap_or(None),
        tags,
        verified: row.to_value("verified").unwrap_or(false),
        created_at: created_at.and_utc(),
        updated_at: updated_at.and_utc(),
        id,
    })
}

/// Parses the JSON text produced by `array_to_json(tags)`.
fn parse_tags(json: &str) -> Result<Vec<String>, DbError> {
    if json.trim().is_empty() {
        return Ok(Vec::new());
    }
    let tags: Option<Vec<String>> = serde_json::from_str(json)?;
    Ok(tags.unwrap_or_default())
}
