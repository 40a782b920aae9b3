use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::WeatherError;
use crate::model::{DetailedWeather, WeatherData};

use super::WeatherProvider;

pub const DEFAULT_BASE_URL: &str = "https://api.weatherapi.com/v1";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// WeatherAPI.com client.
///
/// Implements both the single `current.json` lookup and the native bulk
/// variant of the same endpoint (`q=bulk` with a POSTed location list).
#[derive(Debug, Clone)]
pub struct WeatherApiProvider {
    api_key: String,
    base_url: String,
    timeout: Duration,
    http: Client,
}

impl WeatherApiProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL.to_string())
    }

    /// Point the client at a different endpoint (tests, proxies).
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self::with_timeout(api_key, base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(api_key: String, base_url: String, timeout: Duration) -> Self {
        Self {
            api_key,
            base_url,
            timeout,
            http: Client::new(),
        }
    }

    async fn fetch_current(&self, query: &str) -> Result<WeatherData, WeatherError> {
        let url = format!("{}/current.json", self.base_url);
        debug!(%query, "fetching current weather");

        let res = self
            .http
            .get(&url)
            .timeout(self.timeout)
            .query(&[("key", self.api_key.as_str()), ("q", query)])
            .send()
            .await
            .map_err(WeatherError::from_reqwest)?;

        let status = res.status();
        let body = res.text().await.map_err(WeatherError::from_reqwest)?;

        if !status.is_success() {
            return Err(WeatherError::Provider {
                status: status.as_u16(),
                message: truncate_body(&body),
            });
        }

        let parsed: WaResponse = serde_json::from_str(&body)
            .map_err(|e| WeatherError::Parse(format!("WeatherAPI current JSON: {e}")))?;

        Ok(weather_from_blocks(parsed.location, parsed.current))
    }

    async fn fetch_bulk(&self, queries: &[String]) -> Vec<Result<WeatherData, WeatherError>> {
        let url = format!("{}/current.json", self.base_url);
        debug!(count = queries.len(), "fetching bulk current weather");

        // Slot index doubles as the correlation id the API echoes back.
        let body = WaBulkBody {
            locations: queries
                .iter()
                .enumerate()
                .map(|(idx, q)| WaBulkLocation {
                    q: q.as_str(),
                    custom_id: idx.to_string(),
                })
                .collect(),
        };

        let outcome = async {
            let res = self
                .http
                .post(&url)
                .timeout(self.timeout)
                .query(&[("key", self.api_key.as_str()), ("q", "bulk")])
                .json(&body)
                .send()
                .await
                .map_err(WeatherError::from_reqwest)?;

            let status = res.status();
            let text = res.text().await.map_err(WeatherError::from_reqwest)?;

            if !status.is_success() {
                return Err(WeatherError::Provider {
                    status: status.as_u16(),
                    message: truncate_body(&text),
                });
            }

            serde_json::from_str::<WaBulkResponse>(&text)
                .map_err(|e| WeatherError::Parse(format!("WeatherAPI bulk JSON: {e}")))
        }
        .await;

        let parsed = match outcome {
            Ok(parsed) => parsed,
            // One failed call covers every slot of the batch.
            Err(err) => return queries.iter().map(|_| Err(err.clone())).collect(),
        };

        let mut slots: Vec<Result<WeatherData, WeatherError>> = queries
            .iter()
            .map(|q| {
                Err(WeatherError::Parse(format!(
                    "bulk response contained no entry for query '{q}'"
                )))
            })
            .collect();

        for item in parsed.bulk {
            let Some(idx) = item
                .query
                .custom_id
                .as_deref()
                .and_then(|id| id.parse::<usize>().ok())
                .filter(|idx| *idx < slots.len())
            else {
                warn!("skipping bulk item with unknown custom_id");
                continue;
            };

            slots[idx] = match (item.query.location, item.query.current) {
                (Some(location), Some(current)) => Ok(weather_from_blocks(location, current)),
                _ => Err(WeatherError::Parse(format!(
                    "bulk entry for query '{}' was missing weather blocks",
                    queries[idx]
                ))),
            };
        }

        slots
    }
}

#[async_trait]
impl WeatherProvider for WeatherApiProvider {
    async fn current(&self, query: &str) -> Result<WeatherData, WeatherError> {
        self.fetch_current(query).await
    }

    async fn current_bulk(&self, queries: &[String]) -> Vec<Result<WeatherData, WeatherError>> {
        if queries.is_empty() {
            return Vec::new();
        }
        self.fetch_bulk(queries).await
    }

    fn supports_bulk(&self) -> bool {
        true
    }
}

#[derive(Debug, Deserialize)]
struct WaLocation {
    name: String,
    region: Option<String>,
    country: String,
    tz_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WaCurrent {
    temp_c: f64,
    #[serde(default)]
    cloud: u8,
    #[serde(default)]
    wind_kph: f64,
    wind_degree: Option<i32>,
    wind_dir: Option<String>,
    pressure_mb: Option<f64>,
    pressure_in: Option<f64>,
    precip_mm: Option<f64>,
    precip_in: Option<f64>,
    humidity: Option<u8>,
    feelslike_c: Option<f64>,
    vis_km: Option<f64>,
    uv: Option<f64>,
    gust_kph: Option<f64>,
    last_updated_epoch: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct WaResponse {
    location: WaLocation,
    current: WaCurrent,
}

#[derive(Debug, Serialize)]
struct WaBulkLocation<'a> {
    q: &'a str,
    custom_id: String,
}

#[derive(Debug, Serialize)]
struct WaBulkBody<'a> {
    locations: Vec<WaBulkLocation<'a>>,
}

#[derive(Debug, Deserialize)]
struct WaBulkQuery {
    custom_id: Option<String>,
    location: Option<WaLocation>,
    current: Option<WaCurrent>,
}

#[derive(Debug, Deserialize)]
struct WaBulkItem {
    query: WaBulkQuery,
}

#[derive(Debug, Deserialize)]
struct WaBulkResponse {
    #[serde(default)]
    bulk: Vec<WaBulkItem>,
}

fn weather_from_blocks(location: WaLocation, current: WaCurrent) -> WeatherData {
    WeatherData {
        country: location.country,
        state: location.region.filter(|r| !r.is_empty()),
        city: location.name,
        time_zone: location.tz_id.filter(|t| !t.is_empty()),
        temp_c: current.temp_c,
        clouds: current.cloud,
        wind_speed_kph: current.wind_kph,
        wind_degree: current.wind_degree,
        detailed: Some(DetailedWeather {
            pressure_mb: current.pressure_mb,
            pressure_in: current.pressure_in,
            precip_mm: current.precip_mm,
            precip_in: current.precip_in,
            humidity: current.humidity,
            feelslike_c: current.feelslike_c,
            vis_km: current.vis_km,
            uv: current.uv,
            gust_kph: current.gust_kph,
            wind_dir: current.wind_dir,
            last_updated: current.last_updated_epoch.and_then(unix_to_utc),
        }),
    }
}

fn unix_to_utc(ts: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ts, 0)
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let cut = (0..=MAX).rev().find(|i| body.is_char_boundary(*i)).unwrap_or(0);
        format!("{}...", &body[..cut])
    } else {
        body.to_string()
    }
}
