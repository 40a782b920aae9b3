use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::cache::{CacheKey, WeatherCache};
use crate::error::WeatherError;
use crate::model::{Location, WeatherData, WeatherReport};
use crate::provider::WeatherProvider;
use crate::units::Units;

/// Per-call options for [`WeatherService::get_current`] and
/// [`WeatherService::get_bulk`].
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Temperature units for the shaped output; `None` uses the service
    /// default.
    pub units: Option<Units>,
    /// Keep the detailed bundle in the output.
    pub detailed: bool,
    /// Consult and populate the cache. Has no effect when the service was
    /// built without one.
    pub use_cache: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        FetchOptions {
            units: None,
            detailed: false,
            use_cache: true,
        }
    }
}

/// Orchestrates cache lookup, provider fetch, cache population and unit
/// shaping for one or many locations.
///
/// Collaborators are injected at construction and read-only afterwards; the
/// cache handle is the only state shared between concurrent fetches.
#[derive(Debug, Clone)]
pub struct WeatherService {
    provider: Arc<dyn WeatherProvider>,
    cache: Option<WeatherCache>,
    cache_ttl: Duration,
    max_concurrency: usize,
    default_units: Units,
}

impl WeatherService {
    /// `cache: None` disables caching entirely; `max_concurrency` bounds the
    /// number of in-flight provider calls on the bulk path and is clamped to
    /// at least one.
    pub fn new(
        provider: Arc<dyn WeatherProvider>,
        cache: Option<WeatherCache>,
        cache_ttl: Duration,
        max_concurrency: usize,
        default_units: Units,
    ) -> Self {
        WeatherService {
            provider,
            cache,
            cache_ttl,
            max_concurrency: max_concurrency.max(1),
            default_units,
        }
    }

    /// Current weather for a single location, served from cache while fresh.
    pub async fn get_current(
        &self,
        location: &Location,
        options: &FetchOptions,
    ) -> Result<WeatherReport, WeatherError> {
        let data = self.fetch_one(location, options.use_cache).await?;
        Ok(self.shape(&data, options))
    }

    /// Current weather for every location, one result per input slot, in
    /// input order.
    ///
    /// Cache hits resolve without dispatching anything; misses fan out as
    /// independent provider calls bounded by the configured worker limit.
    /// One location's failure occupies its own slot and nothing else.
    pub async fn get_bulk(
        &self,
        locations: &[Location],
        options: &FetchOptions,
    ) -> Vec<Result<WeatherReport, WeatherError>> {
        if locations.is_empty() {
            return Vec::new();
        }

        let mut slots: Vec<Option<Result<WeatherData, WeatherError>>> = Vec::new();
        slots.resize_with(locations.len(), || None);

        let mut pending: Vec<(usize, CacheKey, String)> = Vec::new();
        for (idx, location) in locations.iter().enumerate() {
            let key = CacheKey::from_location(location);
            match self.cache_for(options.use_cache).and_then(|c| c.get(&key)) {
                Some(data) => slots[idx] = Some(Ok(data)),
                None => pending.push((idx, key, location.to_query())),
            }
        }

        info!(
            total = locations.len(),
            misses = pending.len(),
            "bulk weather fetch"
        );

        // One batched call beats N requests, but only when nothing was
        // served from cache and the provider has a real bulk endpoint.
        let all_missed = pending.len() == locations.len();
        if all_missed && pending.len() > 1 && self.provider.supports_bulk() {
            self.run_batched(&mut slots, pending, options.use_cache).await;
        } else {
            self.run_fanout(&mut slots, pending, options.use_cache).await;
        }

        slots
            .into_iter()
            .map(|slot| {
                slot.unwrap_or(Err(WeatherError::Cancelled))
                    .map(|data| self.shape(&data, options))
            })
            .collect()
    }

    fn shape(&self, data: &WeatherData, options: &FetchOptions) -> WeatherReport {
        let units = options.units.unwrap_or(self.default_units);
        WeatherReport::from_data(data, units, options.detailed)
    }

    fn cache_for(&self, use_cache: bool) -> Option<&WeatherCache> {
        if use_cache { self.cache.as_ref() } else { None }
    }

    async fn fetch_one(
        &self,
        location: &Location,
        use_cache: bool,
    ) -> Result<WeatherData, WeatherError> {
        let key = CacheKey::from_location(location);
        let query = location.to_query();

        if let Some(cache) = self.cache_for(use_cache) {
            if let Some(data) = cache.get(&key) {
                debug!(%query, "cache hit");
                return Ok(data);
            }
            debug!(%query, "cache miss");
        }

        let data = self.provider.current(&query).await?;

        if let Some(cache) = self.cache_for(use_cache) {
            debug!(%query, ttl_secs = self.cache_ttl.as_secs(), "caching weather data");
            cache.set(key, data.clone(), self.cache_ttl);
        }

        Ok(data)
    }

    /// One provider call for the whole batch; per-slot results are
    /// correlated back by index, so ordering and error isolation match the
    /// fan-out path exactly.
    async fn run_batched(
        &self,
        slots: &mut [Option<Result<WeatherData, WeatherError>>],
        pending: Vec<(usize, CacheKey, String)>,
        use_cache: bool,
    ) {
        let queries: Vec<String> = pending.iter().map(|(_, _, query)| query.clone()).collect();
        let results = self.provider.current_bulk(&queries).await;

        for ((idx, key, _), result) in pending.into_iter().zip(results) {
            if let (Ok(data), Some(cache)) = (&result, self.cache_for(use_cache)) {
                cache.set(key, data.clone(), self.cache_ttl);
            }
            slots[idx] = Some(result);
        }
    }

    /// Independent task per miss, bounded by a semaphore. Results land in
    /// their input slots regardless of completion order; a slot whose task
    /// never reported (aborted, panicked) surfaces as cancelled.
    async fn run_fanout(
        &self,
        slots: &mut [Option<Result<WeatherData, WeatherError>>],
        pending: Vec<(usize, CacheKey, String)>,
        use_cache: bool,
    ) {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut tasks = JoinSet::new();

        for (idx, key, query) in pending {
            let provider = Arc::clone(&self.provider);
            let cache = self.cache_for(use_cache).cloned();
            let ttl = self.cache_ttl;
            let semaphore = Arc::clone(&semaphore);

            tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return (idx, Err(WeatherError::Cancelled));
                };

                let result = provider.current(&query).await;
                match &result {
                    // The provider call completed outside any cache lock.
                    Ok(data) => {
                        if let Some(cache) = &cache {
                            cache.set(key, data.clone(), ttl);
                        }
                    }
                    Err(err) => warn!(%query, %err, "bulk fetch failed for location"),
                }
                (idx, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((idx, result)) => slots[idx] = Some(result),
                Err(err) if err.is_cancelled() => {}
                Err(err) => warn!(%err, "bulk fetch task failed"),
            }
        }
    }
}
