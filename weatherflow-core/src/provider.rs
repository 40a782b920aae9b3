use std::fmt::Debug;

use async_trait::async_trait;

use crate::error::WeatherError;
use crate::model::WeatherData;

pub mod weatherapi;

/// The narrow capability the service depends on: turn a query string into a
/// current weather reading. Transport, credentials and retries live behind
/// this seam.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn current(&self, query: &str) -> Result<WeatherData, WeatherError>;

    /// Resolve several queries in one logical call, one result per input
    /// slot, in input order.
    ///
    /// The default resolves queries one at a time. Providers with a native
    /// multi-location endpoint override this together with
    /// [`supports_bulk`](WeatherProvider::supports_bulk).
    async fn current_bulk(&self, queries: &[String]) -> Vec<Result<WeatherData, WeatherError>> {
        let mut results = Vec::with_capacity(queries.len());
        for query in queries {
            results.push(self.current(query).await);
        }
        results
    }

    /// Whether [`current_bulk`](WeatherProvider::current_bulk) is a single
    /// network call rather than a loop.
    fn supports_bulk(&self) -> bool {
        false
    }
}
