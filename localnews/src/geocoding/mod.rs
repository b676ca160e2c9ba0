//! Coordinate → place resolution.

use anyhow::Result;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::models::PlaceRecord;

pub mod nominatim;

pub use nominatim::NominatimResolver;

/// Maps coordinates to a human-readable place
#[async_trait::async_trait]
pub trait PlaceResolver: Send + Sync {
    async fn resolve(&self, latitude: f64, longitude: f64) -> Result<PlaceRecord>;

    /// Number of memoized places (0 for resolvers without a cache)
    fn cached_places(&self) -> usize {
        0
    }

    fn clear_cache(&self) {}
}

/// In-memory memo of resolved places keyed by the exact coordinate pair.
///
/// Lock sections only clone in or out, never span a network call. Two requests racing on
/// the same key both go upstream and the later insert wins.
#[derive(Debug, Default)]
pub struct PlaceCache {
    entries: RwLock<HashMap<String, PlaceRecord>>,
}

impl PlaceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(latitude: f64, longitude: f64) -> String {
        format!("{},{}", latitude, longitude)
    }

    pub fn get(&self, latitude: f64, longitude: f64) -> Option<PlaceRecord> {
        let entries = self.entries.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.get(&Self::key(latitude, longitude)).cloned()
    }

    pub fn insert(&self, latitude: f64, longitude: f64, place: PlaceRecord) {
        let mut entries = self.entries.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.insert(Self::key(latitude, longitude), place);
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|poisoned| poisoned.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut entries = self.entries.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn place(city: &str) -> PlaceRecord {
        PlaceRecord {
            city: Some(city.to_string()),
            region: None,
            country: None,
            country_code: String::new(),
            timezone: "UTC".to_string(),
            raw_address: city.to_string(),
        }
    }

    #[test]
    fn test_cache_roundtrip_and_clear() {
        let cache = PlaceCache::new();
        assert!(cache.get(1.0, 2.0).is_none());

        cache.insert(1.0, 2.0, place("A"));
        assert_eq!(cache.get(1.0, 2.0).unwrap().city.as_deref(), Some("A"));
        assert!(cache.get(2.0, 1.0).is_none());
        assert_eq!(cache.len(), 1);

        cache.insert(1.0, 2.0, place("B"));
        assert_eq!(cache.get(1.0, 2.0).unwrap().city.as_deref(), Some("B"));
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_poisoned_cache_still_reports_entries() {
        let cache = Arc::new(PlaceCache::new());
        cache.insert(1.0, 2.0, place("A"));

        let poisoner = cache.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.entries.write().unwrap();
            panic!("poison the lock");
        })
        .join();
        assert!(cache.entries.is_poisoned());

        assert_eq!(cache.len(), 1);
        assert!(!cache.is_empty());
        assert_eq!(cache.get(1.0, 2.0).unwrap().city.as_deref(), Some("A"));
    }

    #[test]
    fn test_cache_key_format() {
        assert_eq!(PlaceCache::key(51.5, -0.12), "51.5,-0.12");
    }

    #[test]
    fn test_cache_shared_across_threads() {
        let cache = Arc::new(PlaceCache::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    cache.insert(i as f64, 0.0, place("X"));
                    cache.get(i as f64, 0.0)
                })
            })
            .collect();
        for h in handles {
            assert!(h.join().unwrap().is_some());
        }
        assert_eq!(cache.len(), 8);
    }
}
