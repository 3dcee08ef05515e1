// src/db/memory.rs
// DOCUMENTATION: In-process place store
// PURPOSE: Database-free backend for development and tests

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::db::PlaceStore;
use crate::errors::PlacesError;
use crate::models::{Category, Coordinates, Place};
use crate::services::distance::BoundingBox;

/// PlaceStore backed by a map per category behind one RwLock
#[derive(Default)]
pub struct MemoryPlaceStore {
    places: RwLock<HashMap<Category, HashMap<String, Place>>>,
}

impl MemoryPlaceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PlaceStore for MemoryPlaceStore {
    async fn upsert(&self, category: Category, place: &Place) -> Result<(Place, bool), PlacesError> {
        place.check_required_fields()?;

        let now = Utc::now();
        let mut places = self.places.write().await;
        let table = places.entry(category).or_default();

        let created_at = table
            .get(&place.id)
            .and_then(|existing| existing.created_at)
            .unwrap_or(now);
        let created = !table.contains_key(&place.id);

        let stored = Place {
            created_at: Some(created_at),
            updated_at: Some(now),
            ..place.clone()
        };
        table.insert(stored.id.clone(), stored.clone());

        log::info!(
            "{} {} {}",
            if created { "Created" } else { "Updated" },
            category,
            stored.id
        );
        Ok((stored, created))
    }

    async fn get_all(&self, category: Category) -> Result<Vec<Place>, PlacesError> {
        let places = self.places.read().await;
        Ok(places
            .get(&category)
            .map(|table| table.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn get_by_id(&self, category: Category, id: &str) -> Result<Place, PlacesError> {
        let places = self.places.read().await;
        places
            .get(&category)
            .and_then(|table| table.get(id))
            .cloned()
            .ok_or_else(|| PlacesError::NotFound(format!("{} '{}'", category, id)))
    }

    async fn delete(&self, category: Category, id: &str) -> Result<(), PlacesError> {
        let mut places = self.places.write().await;
        let removed = places
            .get_mut(&category)
            .and_then(|table| table.remove(id));

        match removed {
            Some(_) => {
                log::info!("Deleted {} {}", category, id);
                Ok(())
            }
            None => Err(PlacesError::NotFound(format!("{} '{}'", category, id))),
        }
    }

    async fn search_by_service(
        &self,
        category: Category,
        service: &str,
    ) -> Result<Vec<Place>, PlacesError> {
        let places = self.places.read().await;
        Ok(places
            .get(&category)
            .map(|table| {
                table
                    .values()
                    .filter(|p| p.services.contains(service))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn candidates_near(
        &self,
        category: Category,
        center: &Coordinates,
        radius_km: f64,
    ) -> Result<Vec<Place>, PlacesError> {
        let bbox = BoundingBox::around(center, radius_km);
        let places = self.places.read().await;
        Ok(places
            .get(&category)
            .map(|table| {
                table
                    .values()
                    // malformed rows pass through so ranking can report them
                    .filter(|p| !p.coordinates.is_valid() || bbox.contains(&p.coordinates))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}
