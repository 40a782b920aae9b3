//! Core library for the `weatherflow` enrichment tools.
//!
//! This crate defines:
//! - Domain models for locations and weather readings
//! - A TTL cache for canonical weather data
//! - Abstraction over the remote weather provider
//! - The service orchestrating cache, provider and unit shaping
//! - Configuration handling shared by the CLI and the HTTP server
//!
//! It is used by `weatherflow-cli` and `weatherflow-server`, but can also be
//! reused by other binaries or services.

pub mod cache;
pub mod config;
pub mod error;
pub mod model;
pub mod provider;
pub mod service;
pub mod units;

pub use cache::{CacheKey, WeatherCache};
pub use config::Config;
pub use error::WeatherError;
pub use model::{DetailedReport, DetailedWeather, Location, WeatherData, WeatherReport};
pub use provider::WeatherProvider;
pub use service::{FetchOptions, WeatherService};
pub use units::Units;
