// src/db/repository.rs
// DOCUMENTATION: Database access layer - all SQL queries
// PURPOSE: PostgreSQL implementation of PlaceStore

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use std::collections::BTreeSet;
use std::future::Future;
use std::time::Duration;

use crate::db::PlaceStore;
use crate::errors::PlacesError;
use crate::models::{Category, Coordinates, Place, WorkingHours};
use crate::services::distance::BoundingBox;

/// Fixed statements for one category table
struct TableQueries {
    upsert: &'static str,
    select_all: &'static str,
    select_by_id: &'static str,
    delete: &'static str,
    search_service: &'static str,
    select_box: &'static str,
    select_band: &'static str,
}

/// Expands to the statement set for a literal table name, so table names
/// are fixed at compile time and never come from caller input
macro_rules! table_queries {
    ($table:literal) => {
        TableQueries {
            upsert: concat!(
                "INSERT INTO ", $table, " (
                    id, name, lat, lon, address, phone,
                    services, working_days, working_hours, is_24_7,
                    created_at, updated_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NOW(), NOW())
                ON CONFLICT (id) DO UPDATE SET
                    name = EXCLUDED.name,
                    lat = EXCLUDED.lat,
                    lon = EXCLUDED.lon,
                    address = EXCLUDED.address,
                    phone = EXCLUDED.phone,
                    services = EXCLUDED.services,
                    working_days = EXCLUDED.working_days,
                    working_hours = EXCLUDED.working_hours,
                    is_24_7 = EXCLUDED.is_24_7,
                    updated_at = NOW()
                RETURNING
                    id, name, lat, lon, address, phone,
                    services, working_days, working_hours, is_24_7,
                    created_at, updated_at,
                    (xmax = 0) AS inserted"
            ),
            select_all: concat!(
                "SELECT id, name, lat, lon, address, phone,
                        services, working_days, working_hours, is_24_7,
                        created_at, updated_at
                 FROM ", $table
            ),
            select_by_id: concat!(
                "SELECT id, name, lat, lon, address, phone,
                        services, working_days, working_hours, is_24_7,
                        created_at, updated_at
                 FROM ", $table, " WHERE id = $1"
            ),
            delete: concat!("DELETE FROM ", $table, " WHERE id = $1"),
            search_service: concat!(
                "SELECT id, name, lat, lon, address, phone,
                        services, working_days, working_hours, is_24_7,
                        created_at, updated_at
                 FROM ", $table, " WHERE services @> $1::jsonb"
            ),
            select_box: concat!(
                "SELECT id, name, lat, lon, address, phone,
                        services, working_days, working_hours, is_24_7,
                        created_at, updated_at
                 FROM ", $table, "
                 WHERE lat BETWEEN $1 AND $2 AND lon BETWEEN $3 AND $4"
            ),
            select_band: concat!(
                "SELECT id, name, lat, lon, address, phone,
                        services, working_days, working_hours, is_24_7,
                        created_at, updated_at
                 FROM ", $table, "
                 WHERE lat BETWEEN $1 AND $2"
            ),
        }
    };
}

static AUTOSERVICE_QUERIES: TableQueries = table_queries!("autoservice");
static CARWASH_QUERIES: TableQueries = table_queries!("carwash");

fn queries(category: Category) -> &'static TableQueries {
    match category {
        Category::Autoservice => &AUTOSERVICE_QUERIES,
        Category::Carwash => &CARWASH_QUERIES,
    }
}

/// Internal struct for mapping database rows to Place struct
/// DOCUMENTATION: JSONB and array columns are nullable in the legacy data
#[derive(Debug, FromRow)]
struct PlaceRow {
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub services: Option<Value>,
    pub working_days: Option<Vec<i32>>,
    pub working_hours: Option<Value>,
    pub is_24_7: Option<bool>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, FromRow)]
struct UpsertedRow {
    #[sqlx(flatten)]
    pub place: PlaceRow,
    pub inserted: bool,
}

/// Services column read leniently: non-string entries and non-array
/// values are logged and skipped rather than failing the whole row
fn services_from_json(place_id: &str, value: Option<Value>) -> BTreeSet<String> {
    match value {
        None | Some(Value::Null) => BTreeSet::new(),
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(service) => Some(service),
                other => {
                    log::warn!("Dropping service entry {} on place {}", other, place_id);
                    None
                }
            })
            .collect(),
        Some(other) => {
            log::warn!("Ignoring malformed services {} on place {}", other, place_id);
            BTreeSet::new()
        }
    }
}

impl PlaceRow {
    /// Convert PlaceRow to Place model
    fn to_place(self) -> Place {
        let working_days = self
            .working_days
            .unwrap_or_default()
            .into_iter()
            .filter_map(|d| match u8::try_from(d) {
                Ok(day) if day <= 6 => Some(day),
                _ => {
                    log::warn!("Dropping weekday {} on place {}", d, self.id);
                    None
                }
            })
            .collect::<BTreeSet<u8>>();

        // legacy rows store '{}' when no hours were given
        let working_hours = self
            .working_hours
            .and_then(|v| serde_json::from_value::<WorkingHours>(v).ok());

        let services = services_from_json(&self.id, self.services);

        Place {
            id: self.id,
            name: self.name,
            coordinates: Coordinates::new(self.lat, self.lon),
            address: self.address,
            phone: self.phone,
            services,
            working_days,
            working_hours,
            is_24_7: self.is_24_7.unwrap_or(false),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// PlaceStore over PostgreSQL
/// DOCUMENTATION: Every statement is bounded by `query_timeout`; a timeout
/// is reported as DatabaseError like any other backend failure.
#[derive(Clone)]
pub struct PgPlaceStore {
    pool: PgPool,
    query_timeout: Duration,
}

impl PgPlaceStore {
    pub fn new(pool: PgPool, query_timeout: Duration) -> Self {
        Self {
            pool,
            query_timeout,
        }
    }

    async fn run<T, F>(&self, what: &str, fut: F) -> Result<T, PlacesError>
    where
        F: Future<Output = Result<T, sqlx::Error>> + Send,
    {
        match tokio::time::timeout(self.query_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                log::error!("Failed to {}: {}", what, e);
                Err(PlacesError::DatabaseError(e.to_string()))
            }
            Err(_) => {
                log::error!("Timed out after {:?} trying to {}", self.query_timeout, what);
                Err(PlacesError::DatabaseError(format!("{} timed out", what)))
            }
        }
    }

    async fn fetch_rows(
        &self,
        what: &str,
        query: sqlx::query::QueryAs<'_, sqlx::Postgres, PlaceRow, sqlx::postgres::PgArguments>,
    ) -> Result<Vec<Place>, PlacesError> {
        let rows = self.run(what, query.fetch_all(&self.pool)).await?;
        Ok(rows.into_iter().map(PlaceRow::to_place).collect())
    }
}

#[async_trait]
impl PlaceStore for PgPlaceStore {
    async fn upsert(&self, category: Category, place: &Place) -> Result<(Place, bool), PlacesError> {
        place.check_required_fields()?;

        let services: Vec<&String> = place.services.iter().collect();
        let working_days: Vec<i32> = place.working_days.iter().map(|&d| i32::from(d)).collect();

        let row = self
            .run(
                "upsert place",
                sqlx::query_as::<_, UpsertedRow>(queries(category).upsert)
                    .bind(&place.id) // $1
                    .bind(&place.name) // $2
                    .bind(place.coordinates.lat) // $3
                    .bind(place.coordinates.lon) // $4
                    .bind(&place.address) // $5
                    .bind(&place.phone) // $6
                    .bind(Json(&services)) // $7
                    .bind(&working_days) // $8
                    .bind(place.working_hours.as_ref().map(Json)) // $9
                    .bind(place.is_24_7) // $10
                    .fetch_one(&self.pool),
            )
            .await?;

        let created = row.inserted;
        let stored = row.place.to_place();
        log::info!(
            "{} {} {}",
            if created { "Created" } else { "Updated" },
            category,
            stored.id
        );
        Ok((stored, created))
    }

    async fn get_all(&self, category: Category) -> Result<Vec<Place>, PlacesError> {
        self.fetch_rows(
            "list places",
            sqlx::query_as::<_, PlaceRow>(queries(category).select_all),
        )
        .await
    }

    async fn get_by_id(&self, category: Category, id: &str) -> Result<Place, PlacesError> {
        let row = self
            .run(
                "fetch place",
                sqlx::query_as::<_, PlaceRow>(queries(category).select_by_id)
                    .bind(id)
                    .fetch_optional(&self.pool),
            )
            .await?
            .ok_or_else(|| {
                log::warn!("Place not found: {} {}", category, id);
                PlacesError::NotFound(format!("{} '{}'", category, id))
            })?;

        Ok(row.to_place())
    }

    async fn delete(&self, category: Category, id: &str) -> Result<(), PlacesError> {
        let rows = self
            .run(
                "delete place",
                sqlx::query(queries(category).delete)
                    .bind(id)
                    .execute(&self.pool),
            )
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(PlacesError::NotFound(format!("{} '{}'", category, id)));
        }

        log::info!("Deleted {} {}", category, id);
        Ok(())
    }

    async fn search_by_service(
        &self,
        category: Category,
        service: &str,
    ) -> Result<Vec<Place>, PlacesError> {
        self.fetch_rows(
            "search places by service",
            sqlx::query_as::<_, PlaceRow>(queries(category).search_service)
                .bind(Json(vec![service])),
        )
        .await
    }

    async fn candidates_near(
        &self,
        category: Category,
        center: &Coordinates,
        radius_km: f64,
    ) -> Result<Vec<Place>, PlacesError> {
        let bbox = BoundingBox::around(center, radius_km);
        let sql = queries(category);

        let query = match bbox.lon_range {
            Some((min_lon, max_lon)) => sqlx::query_as::<_, PlaceRow>(sql.select_box)
                .bind(bbox.min_lat)
                .bind(bbox.max_lat)
                .bind(min_lon)
                .bind(max_lon),
            None => sqlx::query_as::<_, PlaceRow>(sql.select_band)
                .bind(bbox.min_lat)
                .bind(bbox.max_lat),
        };

        let places = self.fetch_rows("find nearby places", query).await?;
        log::debug!(
            "Bounding box for {} within {} km returned {} candidates",
            category,
            radius_km,
            places.len()
        );
        Ok(places)
    }
}
