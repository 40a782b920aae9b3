use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

use crate::model::{Location, WeatherData};

/// Structured cache key built from the normalized identifying fields of a
/// [`Location`].
///
/// Keeping the fields separate (instead of joining them into one string)
/// means two locations can only share a key by agreeing on every normalized
/// field; there is no separator to collide with.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    city: Option<String>,
    country: Option<String>,
    state: Option<String>,
    zip_code: Option<String>,
    // f64 has no Eq/Hash; the bit pattern compares exact values.
    lat: Option<u64>,
    lon: Option<u64>,
}

impl CacheKey {
    /// Deterministic key: locations that are field-wise equal after trimming
    /// and lower-casing produce equal keys.
    pub fn from_location(location: &Location) -> Self {
        CacheKey {
            city: normalize(&location.city),
            country: normalize(&location.country),
            state: normalize(&location.state),
            zip_code: normalize(&location.zip_code),
            lat: location.lat.map(f64::to_bits),
            lon: location.lon.map(f64::to_bits),
        }
    }
}

fn normalize(field: &Option<String>) -> Option<String> {
    field
        .as_deref()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
}

#[derive(Debug)]
struct CacheEntry {
    value: WeatherData,
    expires_at: Instant,
}

/// In-memory TTL store for canonical weather data.
///
/// Clones are handles onto the same store, so every in-flight fetch shares
/// one map. Entries expire lazily on read; there is no size bound. Whether
/// caching is enabled at all is the service's decision, not this type's.
#[derive(Debug, Clone, Default)]
pub struct WeatherCache {
    entries: Arc<Mutex<HashMap<CacheKey, CacheEntry>>>,
}

impl WeatherCache {
    pub fn new() -> Self {
        WeatherCache::default()
    }

    /// Returns a clone of the stored value while it is still fresh. An
    /// expired entry is dropped on the way out and reported absent.
    pub fn get(&self, key: &CacheKey) -> Option<WeatherData> {
        let mut entries = self.lock();
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Inserts or replaces the entry unconditionally; it stays fresh until
    /// `now + ttl`.
    pub fn set(&self, key: CacheKey, value: WeatherData, ttl: Duration) {
        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.lock().insert(key, entry);
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of stored entries, expired ones included until they are read.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CacheKey, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Location;
    use tokio::time::advance;

    fn sample_data(city: &str) -> WeatherData {
        WeatherData {
            country: "Testland".to_string(),
            state: None,
            city: city.to_string(),
            time_zone: None,
            temp_c: 10.0,
            clouds: 50,
            wind_speed_kph: 8.0,
            wind_degree: None,
            detailed: None,
        }
    }

    fn city(name: &str) -> Location {
        Location {
            city: Some(name.to_string()),
            ..Location::default()
        }
    }

    #[test]
    fn keys_are_normalization_equal() {
        let a = CacheKey::from_location(&city("  London "));
        let b = CacheKey::from_location(&city("london"));
        assert_eq!(a, b);
    }

    #[test]
    fn differing_fields_produce_distinct_keys() {
        let base = city("London");
        let with_zip = Location {
            zip_code: Some("EC2Y 5AA".to_string()),
            ..base.clone()
        };
        let with_country = Location {
            country: Some("UK".to_string()),
            ..base.clone()
        };
        assert_ne!(
            CacheKey::from_location(&base),
            CacheKey::from_location(&with_zip)
        );
        assert_ne!(
            CacheKey::from_location(&base),
            CacheKey::from_location(&with_country)
        );
        assert_ne!(
            CacheKey::from_location(&with_zip),
            CacheKey::from_location(&with_country)
        );
    }

    #[test]
    fn separator_characters_in_fields_cannot_collide() {
        // With a joined-string key these two could normalize to the same
        // bytes; the structured key keeps them apart.
        let a = Location {
            city: Some("foo,bar".to_string()),
            ..Location::default()
        };
        let b = Location {
            city: Some("foo".to_string()),
            country: Some("bar".to_string()),
            ..Location::default()
        };
        assert_ne!(CacheKey::from_location(&a), CacheKey::from_location(&b));
    }

    #[test]
    fn coordinates_are_exact() {
        let a = Location {
            lat: Some(51.5),
            lon: Some(-0.1),
            ..Location::default()
        };
        let b = Location {
            lat: Some(51.5),
            lon: Some(-0.2),
            ..Location::default()
        };
        assert_ne!(CacheKey::from_location(&a), CacheKey::from_location(&b));
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let cache = WeatherCache::new();
        let key = CacheKey::from_location(&city("London"));

        cache.set(key.clone(), sample_data("London"), Duration::from_secs(1));
        assert!(cache.get(&key).is_some());

        advance(Duration::from_secs(2)).await;
        assert!(cache.get(&key).is_none());
        // The expired entry was dropped on read.
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn set_replaces_existing_entry() {
        let cache = WeatherCache::new();
        let key = CacheKey::from_location(&city("London"));

        cache.set(key.clone(), sample_data("old"), Duration::from_secs(60));
        cache.set(key.clone(), sample_data("new"), Duration::from_secs(60));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&key).unwrap().city, "new");
    }

    #[tokio::test(start_paused = true)]
    async fn zero_ttl_is_immediately_stale() {
        let cache = WeatherCache::new();
        let key = CacheKey::from_location(&city("London"));

        cache.set(key.clone(), sample_data("London"), Duration::ZERO);
        assert!(cache.get(&key).is_none());
    }

    #[test]
    fn clear_empties_the_store() {
        let cache = WeatherCache::new();
        cache.set(
            CacheKey::from_location(&city("London")),
            sample_data("London"),
            Duration::from_secs(60),
        );
        cache.clear();
        assert!(cache.is_empty());
    }
}
