// src/services/finder.rs
// DOCUMENTATION: Nearest-place lookup
// PURPOSE: validate -> fetch -> score -> select -> project -> cache

use std::sync::Arc;

use crate::db::PlaceStore;
use crate::errors::PlacesError;
use crate::models::{Category, Coordinates, NearbyResult};
use crate::services::distance::STORE_RESULT_CAP;
use crate::services::ResultCache;

/// Finds the closest places of a category to a point
/// DOCUMENTATION: Holds no per-request state; the only shared state is the
/// ResultCache, so one instance serves every concurrent lookup.
pub struct NearestPlaceFinder {
    store: Arc<dyn PlaceStore>,
    cache: Arc<ResultCache>,
    default_radius_km: f64,
}

impl NearestPlaceFinder {
    pub fn new(store: Arc<dyn PlaceStore>, cache: Arc<ResultCache>, default_radius_km: f64) -> Self {
        Self {
            store,
            cache,
            default_radius_km,
        }
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    /// Closest places of `category` around `location`
    ///
    /// Fails only on invalid input; an empty list is returned when nothing
    /// lies within the radius or the store cannot be reached. `max_results`
    /// above the store cap is clamped to it.
    pub async fn find_nearest(
        &self,
        location: Coordinates,
        category: Category,
        max_results: usize,
        radius_km: Option<f64>,
    ) -> Result<Vec<NearbyResult>, PlacesError> {
        // 1. Validate before touching storage
        if !location.is_valid() {
            log::warn!(
                "Rejected lookup with invalid coordinates: {}, {}",
                location.lat,
                location.lon
            );
            return Err(PlacesError::InvalidInput(format!(
                "invalid coordinates lat={}, lon={}: latitude must be within [-90, 90] and longitude within [-180, 180]",
                location.lat, location.lon
            )));
        }

        if max_results == 0 {
            return Err(PlacesError::InvalidInput(
                "max_results must be at least 1".to_string(),
            ));
        }

        let radius_km = radius_km.unwrap_or(self.default_radius_km);
        if !(radius_km.is_finite() && radius_km > 0.0) {
            return Err(PlacesError::InvalidInput(format!(
                "radius_km must be a positive number, got {}",
                radius_km
            )));
        }

        let limit = max_results.min(STORE_RESULT_CAP);
        if limit < max_results {
            log::debug!("Clamped max_results {} to {}", max_results, limit);
        }

        // 2-3. Fetch candidates, scored by the store
        let scored = match self
            .store
            .find_within_radius(category, &location, radius_km)
            .await
        {
            Ok(scored) => scored,
            Err(PlacesError::DatabaseError(e)) => {
                log::error!("Nearby {} lookup degraded to empty: {}", category, e);
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        // 4-5. Select and project
        let results: Vec<NearbyResult> = scored
            .into_iter()
            .filter(|s| s.distance_km <= radius_km)
            .take(limit)
            .map(|s| NearbyResult::from_scored(category, s))
            .collect();

        // 6. Cache for follow-up pin requests
        for result in &results {
            self.cache
                .put(category, result.place_id.clone(), result.clone())
                .await;
        }

        log::info!(
            "Found {} {} within {} km of ({}, {})",
            results.len(),
            category,
            radius_km,
            location.lat,
            location.lon
        );

        Ok(results)
    }

    /// Result of an earlier lookup, without re-querying the store
    pub async fn cached(
        &self,
        category: Category,
        place_id: &str,
    ) -> Result<NearbyResult, PlacesError> {
        self.cache.get(category, place_id).await.ok_or_else(|| {
            PlacesError::NotFound(format!(
                "{} '{}' is not cached or has expired, search again",
                category, place_id
            ))
        })
    }
}
