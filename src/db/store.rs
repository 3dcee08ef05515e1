// src/db/store.rs
// DOCUMENTATION: Storage port for place records
// PURPOSE: One contract for the PostgreSQL and in-memory backends

use async_trait::async_trait;

use crate::errors::PlacesError;
use crate::models::{Category, Coordinates, Place, ScoredPlace};
use crate::services::distance::{self, STORE_RESULT_CAP};

/// Persistent repository of places, keyed by (category, id)
/// DOCUMENTATION: Implementations must allow concurrent readers and make
/// every upsert atomic per record. Backend failures and timeouts come back
/// as `PlacesError::DatabaseError`; callers decide whether to degrade.
#[async_trait]
pub trait PlaceStore: Send + Sync {
    /// Insert or fully replace a place by id
    /// Returns the stored record and whether it was newly created
    async fn upsert(&self, category: Category, place: &Place) -> Result<(Place, bool), PlacesError>;

    /// Every record of a category, in no particular order
    async fn get_all(&self, category: Category) -> Result<Vec<Place>, PlacesError>;

    async fn get_by_id(&self, category: Category, id: &str) -> Result<Place, PlacesError>;

    async fn delete(&self, category: Category, id: &str) -> Result<(), PlacesError>;

    /// Places whose services contain the given tag
    async fn search_by_service(
        &self,
        category: Category,
        service: &str,
    ) -> Result<Vec<Place>, PlacesError>;

    /// Superset of the places within `radius_km` of `center`
    /// Backends override this with an index-friendly prefilter
    async fn candidates_near(
        &self,
        category: Category,
        _center: &Coordinates,
        _radius_km: f64,
    ) -> Result<Vec<Place>, PlacesError> {
        self.get_all(category).await
    }

    /// Closest places within the radius, sorted, capped at STORE_RESULT_CAP
    async fn find_within_radius(
        &self,
        category: Category,
        center: &Coordinates,
        radius_km: f64,
    ) -> Result<Vec<ScoredPlace>, PlacesError> {
        let candidates = self.candidates_near(category, center, radius_km).await?;
        Ok(distance::rank_within_radius(
            candidates,
            center,
            radius_km,
            STORE_RESULT_CAP,
        ))
    }
}
