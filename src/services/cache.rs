// src/services/cache.rs
// DOCUMENTATION: In-memory cache of recent nearby results
// PURPOSE: Let "show pin" follow-ups skip the store

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::models::{Category, Handle, NearbyResult};

/// Cache entry with expiration
#[derive(Clone, Debug)]
struct CacheEntry<T> {
    data: T,
    expires_at: Instant,
}

impl<T> CacheEntry<T> {
    fn new(data: T, ttl: Duration) -> Self {
        Self {
            data,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() > self.expires_at
    }
}

/// Handle -> last NearbyResult, with TTL and a size bound
/// DOCUMENTATION: Concurrent get/put through a tokio RwLock; last writer
/// wins per key. Eviction happens on insert only, there is no sweeper task.
pub struct ResultCache {
    store: RwLock<HashMap<Handle, CacheEntry<NearbyResult>>>,
    ttl: Duration,
    capacity: usize,
}

impl ResultCache {
    /// Create new cache; a zero capacity is treated as one
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            store: RwLock::new(HashMap::new()),
            ttl,
            capacity: capacity.max(1),
        }
    }

    /// Get cached value
    pub async fn get(&self, category: Category, place_id: &str) -> Option<NearbyResult> {
        let key = Handle::new(category, place_id);
        let store = self.store.read().await;

        match store.get(&key) {
            Some(entry) if !entry.is_expired() => {
                log::debug!("Cache HIT for key: {}", key);
                Some(entry.data.clone())
            }
            Some(_) => {
                log::debug!("Cache EXPIRED for key: {}", key);
                None
            }
            None => {
                log::debug!("Cache MISS for key: {}", key);
                None
            }
        }
    }

    /// Store a result, replacing any previous one for the same handle
    pub async fn put(&self, category: Category, place_id: impl Into<String>, result: NearbyResult) {
        let key = Handle::new(category, place_id);
        let mut store = self.store.write().await;

        if !store.contains_key(&key) && store.len() >= self.capacity {
            Self::make_room(&mut store, self.capacity);
        }

        log::debug!("Cache SET for key: {} (TTL: {}s)", key, self.ttl.as_secs());
        store.insert(key, CacheEntry::new(result, self.ttl));
    }

    /// Drop expired entries, then the ones closest to expiry, until there is
    /// space for one more
    fn make_room(store: &mut HashMap<Handle, CacheEntry<NearbyResult>>, capacity: usize) {
        let before = store.len();
        store.retain(|_, entry| !entry.is_expired());

        while store.len() >= capacity {
            let oldest = store
                .iter()
                .min_by_key(|(_, entry)| entry.expires_at)
                .map(|(key, _)| key.clone());
            match oldest {
                Some(key) => {
                    store.remove(&key);
                }
                None => break,
            }
        }

        log::debug!("Cache eviction: removed {} entries", before - store.len());
    }

    /// Get cache statistics
    pub async fn stats(&self) -> CacheStats {
        let store = self.store.read().await;
        let total = store.len();
        let expired = store.values().filter(|e| e.is_expired()).count();

        CacheStats {
            total_entries: total,
            expired_entries: expired,
            active_entries: total - expired,
            capacity: self.capacity,
        }
    }

    /// Clear all cache entries
    pub async fn clear(&self) {
        let mut store = self.store.write().await;
        let count = store.len();
        store.clear();
        log::info!("Cache cleared: {} entries removed", count);
    }
}

/// Cache statistics
#[derive(Debug, Serialize, Deserialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub expired_entries: usize,
    pub active_entries: usize,
    pub capacity: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Place, ScoredPlace};

    fn result(id: &str, distance_km: f64) -> NearbyResult {
        NearbyResult::from_scored(
            Category::Autoservice,
            ScoredPlace {
                place: Place::new(id, id.to_uppercase(), 41.3, 69.2),
                distance_km,
            },
        )
    }

    #[tokio::test]
    async fn test_cache_put_get() {
        let cache = ResultCache::new(Duration::from_secs(60), 100);
        cache.put(Category::Autoservice, "x", result("x", 1.0)).await;

        assert_eq!(
            cache.get(Category::Autoservice, "x").await,
            Some(result("x", 1.0))
        );
        assert_eq!(cache.get(Category::Autoservice, "y").await, None);
        // same id under the other category is a different handle
        assert_eq!(cache.get(Category::Carwash, "x").await, None);
    }

    #[tokio::test]
    async fn test_cache_overwrite() {
        let cache = ResultCache::new(Duration::from_secs(60), 100);
        cache.put(Category::Autoservice, "x", result("x", 1.0)).await;
        cache.put(Category::Autoservice, "x", result("x", 2.5)).await;

        let cached = cache.get(Category::Autoservice, "x").await.unwrap();
        assert_eq!(cached.distance_km, 2.5);
        assert_eq!(cache.stats().await.total_entries, 1);
    }

    #[tokio::test]
    async fn test_cache_expiration() {
        let cache = ResultCache::new(Duration::from_millis(50), 100);
        cache.put(Category::Carwash, "x", result("x", 1.0)).await;

        // Should exist immediately
        assert!(cache.get(Category::Carwash, "x").await.is_some());

        // Wait for expiration
        tokio::time::sleep(Duration::from_millis(120)).await;

        assert!(cache.get(Category::Carwash, "x").await.is_none());
        assert_eq!(cache.stats().await.expired_entries, 1);
    }

    #[tokio::test]
    async fn test_cache_capacity_evicts_oldest() {
        let cache = ResultCache::new(Duration::from_secs(60), 2);
        cache.put(Category::Autoservice, "a", result("a", 1.0)).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        cache.put(Category::Autoservice, "b", result("b", 1.0)).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        cache.put(Category::Autoservice, "c", result("c", 1.0)).await;

        assert!(cache.get(Category::Autoservice, "a").await.is_none());
        assert!(cache.get(Category::Autoservice, "b").await.is_some());
        assert!(cache.get(Category::Autoservice, "c").await.is_some());
        assert_eq!(cache.stats().await.total_entries, 2);
    }

    #[tokio::test]
    async fn test_cache_clear() {
        let cache = ResultCache::new(Duration::from_secs(60), 10);
        cache.put(Category::Autoservice, "a", result("a", 1.0)).await;
        cache.clear().await;
        assert_eq!(cache.stats().await.active_entries, 0);
    }
}
