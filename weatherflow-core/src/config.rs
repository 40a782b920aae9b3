use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::Arc, time::Duration};

use crate::cache::WeatherCache;
use crate::provider::weatherapi::{DEFAULT_BASE_URL, WeatherApiProvider};
use crate::service::WeatherService;
use crate::units::Units;

/// Environment variable that overrides the stored API key.
pub const API_KEY_ENV: &str = "WEATHERFLOW_API_KEY";

/// Top-level configuration stored on disk, read once at startup.
///
/// Example TOML:
/// ```toml
/// api_key = "..."
/// cache_ttl_secs = 900
/// default_units = "C"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// WeatherAPI.com key; [`API_KEY_ENV`] takes precedence when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub base_url: String,
    pub cache_enabled: bool,
    pub cache_ttl_secs: u64,
    /// Upper bound on concurrent provider calls during bulk fetches.
    pub max_concurrency: usize,
    pub request_timeout_secs: u64,
    pub default_units: Units,
    /// Port the HTTP server binds to.
    pub http_port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            cache_enabled: true,
            cache_ttl_secs: 900,
            max_concurrency: 8,
            request_timeout_secs: 10,
            default_units: Units::C,
            http_port: 8000,
        }
    }
}

impl Config {
    /// Load config from disk, or return defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            // First run: no config file, return defaults.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weatherflow", "weatherflow")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// API key resolution order: environment variable, then config file.
    pub fn resolved_api_key(&self) -> Result<String> {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            let key = key.trim();
            if !key.is_empty() {
                return Ok(key.to_string());
            }
        }

        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                anyhow!(
                    "No WeatherAPI.com key configured.\n\
                     Hint: run `weatherflow configure` or set {API_KEY_ENV}."
                )
            })
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Assemble a ready-to-use service from this configuration.
    pub fn build_service(&self) -> Result<WeatherService> {
        let api_key = self.resolved_api_key()?;
        let provider = WeatherApiProvider::with_timeout(
            api_key,
            self.base_url.clone(),
            self.request_timeout(),
        );
        let cache = self.cache_enabled.then(WeatherCache::new);

        Ok(WeatherService::new(
            Arc::new(provider),
            cache,
            self.cache_ttl(),
            self.max_concurrency,
            self.default_units,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let cfg = Config::default();
        assert!(cfg.cache_enabled);
        assert_eq!(cfg.cache_ttl(), Duration::from_secs(900));
        assert_eq!(cfg.max_concurrency, 8);
        assert_eq!(cfg.default_units, Units::C);
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let cfg: Config = toml::from_str("cache_ttl_secs = 60\ndefault_units = \"BOTH\"")
            .expect("partial config parses");
        assert_eq!(cfg.cache_ttl_secs, 60);
        assert_eq!(cfg.default_units, Units::Both);
        assert!(cfg.cache_enabled);
        assert_eq!(cfg.http_port, 8000);
    }

    #[test]
    fn toml_roundtrip() {
        let mut cfg = Config::default();
        cfg.api_key = Some("KEY".to_string());
        cfg.cache_enabled = false;

        let text = toml::to_string_pretty(&cfg).expect("config serializes");
        let parsed: Config = toml::from_str(&text).expect("config parses back");

        assert_eq!(parsed.api_key.as_deref(), Some("KEY"));
        assert!(!parsed.cache_enabled);
    }
}
