// src/models/place.rs
// DOCUMENTATION: Core data structures for places
// PURPOSE: Categories, place records, nearby results and request DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use validator::Validate;

use crate::errors::PlacesError;
use crate::models::validation;
use crate::services::distance;

/// The two kinds of listing the bot knows about
/// DOCUMENTATION: Replaces the "autoservice"/"carwash" strings used as
/// table names. Every store and finder branch matches on this exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Autoservice,
    Carwash,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Autoservice, Category::Carwash];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Autoservice => "autoservice",
            Category::Carwash => "carwash",
        }
    }

    /// Uzbek display name used in text summaries
    pub fn label(&self) -> &'static str {
        match self {
            Category::Autoservice => "Avtoservis",
            Category::Carwash => "Avtomoyka",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = PlacesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "autoservice" => Ok(Category::Autoservice),
            "carwash" => Ok(Category::Carwash),
            other => Err(PlacesError::InvalidInput(format!(
                "unknown category '{}', expected 'autoservice' or 'carwash'",
                other
            ))),
        }
    }
}

/// WGS84 point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// lat in [-90, 90], lon in [-180, 180], both finite
    pub fn is_valid(&self) -> bool {
        distance::validate_coordinates(self.lat, self.lon)
    }

    /// Great-circle distance in kilometers
    pub fn distance_to(&self, other: &Coordinates) -> f64 {
        distance::haversine(self.lat, self.lon, other.lat, other.lon)
    }
}

impl From<Coordinates> for geo_types::Point<f64> {
    fn from(c: Coordinates) -> Self {
        geo_types::Point::new(c.lon, c.lat)
    }
}

/// Opening time pair, both "HH:MM"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingHours {
    pub start: String,
    pub end: String,
}

/// Represents a complete place record
/// DOCUMENTATION: Same shape for both category tables. Timestamps are
/// assigned by the store; values supplied by callers are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    /// Stable identifier, unique per category
    pub id: String,

    pub name: String,

    pub coordinates: Coordinates,

    pub address: Option<String>,

    /// Normalized "+998XXXXXXXXX"
    pub phone: Option<String>,

    /// Capability tags
    #[serde(default)]
    pub services: BTreeSet<String>,

    /// Weekday indices, 0 = Monday. Empty means no schedule recorded.
    #[serde(default)]
    pub working_days: BTreeSet<u8>,

    /// Ignored when is_24_7 is set
    pub working_hours: Option<WorkingHours>,

    #[serde(default)]
    pub is_24_7: bool,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Place {
    /// Minimal record, mostly useful for seeding and tests
    pub fn new(id: impl Into<String>, name: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            coordinates: Coordinates::new(lat, lon),
            address: None,
            phone: None,
            services: BTreeSet::new(),
            working_days: BTreeSet::new(),
            working_hours: None,
            is_24_7: false,
            created_at: None,
            updated_at: None,
        }
    }

    /// Check the fields every stored record must carry
    /// DOCUMENTATION: id and name non-empty, lat/lon numeric. The coordinate
    /// RANGE is deliberately not checked so legacy rows survive an upsert.
    pub fn check_required_fields(&self) -> Result<(), PlacesError> {
        if self.id.trim().is_empty() {
            return Err(PlacesError::ValidationError("id is required".into()));
        }
        if self.name.trim().is_empty() {
            return Err(PlacesError::ValidationError("name is required".into()));
        }
        if !self.coordinates.lat.is_finite() || !self.coordinates.lon.is_finite() {
            return Err(PlacesError::ValidationError(
                "lat and lon must be numbers".into(),
            ));
        }
        Ok(())
    }
}

/// A place paired with its distance from a query point
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPlace {
    pub place: Place,
    pub distance_km: f64,
}

/// Opaque key for re-fetching a previously computed result
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Handle {
    pub category: Category,
    pub place_id: String,
}

impl Handle {
    pub fn new(category: Category, place_id: impl Into<String>) -> Self {
        Self {
            category,
            place_id: place_id.into(),
        }
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.category, self.place_id)
    }
}

/// Response-ready projection of one lookup hit
/// DOCUMENTATION: Created fresh per query and held in ResultCache under
/// (category, place_id) until evicted or overwritten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearbyResult {
    pub place_id: String,
    pub category: Category,
    pub name: String,
    /// Rounded to 2 decimals
    pub distance_km: f64,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub coordinates: Coordinates,
    pub services: BTreeSet<String>,
    pub working_days: BTreeSet<u8>,
    pub working_hours: Option<WorkingHours>,
    pub is_24_7: bool,
    pub map_link: String,
}

impl NearbyResult {
    pub fn from_scored(category: Category, scored: ScoredPlace) -> Self {
        let ScoredPlace { place, distance_km } = scored;
        NearbyResult {
            map_link: distance::map_link(&place.coordinates),
            place_id: place.id,
            category,
            name: place.name,
            distance_km: distance::round_km(distance_km),
            address: place.address,
            phone: place.phone,
            coordinates: place.coordinates,
            services: place.services,
            working_days: place.working_days,
            working_hours: place.working_hours,
            is_24_7: place.is_24_7,
        }
    }
}

/// Query string for GET /places/{category}/nearest
#[derive(Debug, Deserialize)]
pub struct NearestQuery {
    pub lat: f64,
    pub lon: f64,

    /// Maximum number of results (default from config)
    pub limit: Option<usize>,

    /// Search radius in kilometers (default from config)
    pub radius_km: Option<f64>,
}

/// Query string for GET /places/{category}/search
#[derive(Debug, Deserialize)]
pub struct ServiceSearchQuery {
    pub service: String,
}

/// Weekday given either as index (0 = Monday) or Uzbek name
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WeekdayInput {
    Index(u8),
    Name(String),
}

/// Request DTO for creating or replacing a place
/// DOCUMENTATION: Body of POST /admin/places/{category}. Carries raw form
/// input from the admin/partner workflow; into_place() normalizes it.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct UpsertPlaceRequest {
    /// Explicit id; derived from the name when absent
    #[serde(default)]
    #[validate(length(min = 1, max = 255))]
    pub id: Option<String>,

    #[validate(length(min = 1, max = 255))]
    pub name: String,

    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: f64,

    #[validate(range(min = -180.0, max = 180.0))]
    pub lon: f64,

    #[serde(default)]
    pub address: Option<String>,

    /// Raw phone text, normalized before storage
    #[serde(default)]
    pub phone: Option<String>,

    #[serde(default)]
    pub services: Vec<String>,

    #[serde(default)]
    pub working_days: Vec<WeekdayInput>,

    /// "HH:MM-HH:MM" or "24/7"
    #[serde(default)]
    pub working_hours: Option<String>,

    #[serde(default)]
    pub is_24_7: bool,
}

impl UpsertPlaceRequest {
    /// Turn validated form input into a storable Place
    pub fn into_place(self, category: Category) -> Result<Place, PlacesError> {
        self.validate()?;

        if !distance::validate_coordinates(self.lat, self.lon) {
            return Err(PlacesError::ValidationError(format!(
                "coordinates out of range: lat={}, lon={}",
                self.lat, self.lon
            )));
        }

        let phone = match self.phone.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(validation::normalize_phone(raw).ok_or_else(|| {
                PlacesError::ValidationError(format!("invalid phone number '{}'", raw))
            })?),
        };

        let mut is_24_7 = self.is_24_7;
        let mut working_hours = None;
        if let Some(text) = self.working_hours.as_deref() {
            let parsed = validation::parse_working_hours(text)?;
            is_24_7 |= parsed.is_24_7;
            working_hours = Some(parsed.hours);
        }
        if is_24_7 && working_hours.is_none() {
            working_hours = Some(validation::round_the_clock());
        }

        let working_days = self
            .working_days
            .iter()
            .map(validation::parse_weekday)
            .collect::<Result<BTreeSet<u8>, PlacesError>>()?;

        let services = self
            .services
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        let name = self.name.trim().to_string();
        let id = match self.id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => validation::derive_place_id(category, &name),
        };

        Ok(Place {
            id,
            name,
            coordinates: Coordinates::new(self.lat, self.lon),
            address: self
                .address
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty()),
            phone,
            services,
            working_days,
            working_hours,
            is_24_7,
            created_at: None,
            updated_at: None,
        })
    }
}
