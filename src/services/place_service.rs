// src/services/place_service.rs
// DOCUMENTATION: Business logic for place records
// PURPOSE: Intermediary between admin handlers and the PlaceStore

use geojson::{feature::Id, Feature, FeatureCollection, Geometry};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::db::PlaceStore;
use crate::errors::PlacesError;
use crate::models::{Category, Place, UpsertPlaceRequest};

/// Place counts per category
#[derive(Debug, Serialize)]
pub struct StoreStats {
    pub places_by_category: BTreeMap<Category, usize>,
    pub total_places: usize,
}

pub struct PlaceService;

impl PlaceService {
    /// Create or replace a place from raw admin input
    /// Returns the stored record and whether it was newly created
    pub async fn upsert_place(
        store: &dyn PlaceStore,
        category: Category,
        req: UpsertPlaceRequest,
    ) -> Result<(Place, bool), PlacesError> {
        let place = req.into_place(category)?;
        store.upsert(category, &place).await
    }

    /// All places of a category, sorted by id for stable listings
    pub async fn list_places(
        store: &dyn PlaceStore,
        category: Category,
    ) -> Result<Vec<Place>, PlacesError> {
        let mut places = store.get_all(category).await?;
        places.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(places)
    }

    pub async fn get_place(
        store: &dyn PlaceStore,
        category: Category,
        id: &str,
    ) -> Result<Place, PlacesError> {
        store.get_by_id(category, id).await
    }

    pub async fn delete_place(
        store: &dyn PlaceStore,
        category: Category,
        id: &str,
    ) -> Result<(), PlacesError> {
        store.delete(category, id).await
    }

    /// Places offering a service tag
    pub async fn search_by_service(
        store: &dyn PlaceStore,
        category: Category,
        service: &str,
    ) -> Result<Vec<Place>, PlacesError> {
        let service = service.trim();
        if service.is_empty() {
            return Err(PlacesError::InvalidInput(
                "service must not be empty".to_string(),
            ));
        }

        let mut places = store.search_by_service(category, service).await?;
        places.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(places)
    }

    pub async fn stats(store: &dyn PlaceStore) -> Result<StoreStats, PlacesError> {
        let mut places_by_category = BTreeMap::new();
        for category in Category::ALL {
            let count = store.get_all(category).await?.len();
            places_by_category.insert(category, count);
        }

        Ok(StoreStats {
            total_places: places_by_category.values().sum(),
            places_by_category,
        })
    }

    /// Export a category as a GeoJSON FeatureCollection for map tools
    /// DOCUMENTATION: One Point feature per place, id as feature id, the
    /// remaining fields as properties. Records with out-of-range
    /// coordinates are left out.
    pub async fn geojson(
        store: &dyn PlaceStore,
        category: Category,
    ) -> Result<FeatureCollection, PlacesError> {
        let places = Self::list_places(store, category).await?;

        let features = places
            .into_iter()
            .filter(|place| {
                let valid = place.coordinates.is_valid();
                if !valid {
                    log::warn!("Leaving {} {} out of map export", category, place.id);
                }
                valid
            })
            .map(Self::to_feature)
            .collect();

        Ok(FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        })
    }

    fn to_feature(place: Place) -> Feature {
        let point: geo_types::Point<f64> = place.coordinates.into();
        let id = place.id.clone();

        let properties = match serde_json::to_value(&place) {
            Ok(Value::Object(mut map)) => {
                map.remove("coordinates");
                Some(map)
            }
            _ => None,
        };

        Feature {
            bbox: None,
            geometry: Some(Geometry::new(geojson::Value::from(&point))),
            id: Some(Id::String(id)),
            properties,
            foreign_members: None,
        }
    }
}
