//! Layered settings
//!
//! Sources, later ones winning:
//! 1. built-in defaults
//! 2. `config.toml` in the XDG config directory (`~/.config/ronin-cache/` on Linux)
//! 3. an explicit file passed on the command line
//! 4. environment variables (`REDIS_URL`, `TAVILY_API_KEY`, ...)
//!
//! A missing or unusable `REDIS_URL` is not an error: the cache simply runs
//! in memory.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ::config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::Deserialize;
use thiserror::Error;

use crate::cache::{CacheConfig, LocalTtlPolicy, DEFAULT_POOL_SIZE, DEFAULT_TIMEOUT};
use crate::data::{events::PREDICTHQ_BASE_URL, search::TAVILY_BASE_URL, weather::OPENWEATHER_BASE_URL};

/// Errors that can occur when loading settings
#[derive(Debug, Error)]
pub enum SettingsError {
    /// A source could not be read or did not match the expected shape
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),
}

/// Application settings
#[derive(Clone, Deserialize)]
pub struct Settings {
    /// Remote cache connection string
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Bound on the cache liveness probe and each remote call, in milliseconds
    #[serde(default = "default_cache_timeout_ms")]
    pub cache_timeout_ms: u64,

    /// Remote cache connection pool size
    #[serde(default = "default_cache_pool_size")]
    pub cache_pool_size: usize,

    /// Whether the in-memory fallback honours ttl
    #[serde(default)]
    pub cache_local_ttl: LocalTtlPolicy,

    /// Tavily API key
    #[serde(default)]
    pub tavily_api_key: Option<String>,

    /// PredictHQ access token
    #[serde(default)]
    pub predicthq_access_token: Option<String>,

    /// OpenWeatherMap API key
    #[serde(default)]
    pub openweather_api_key: Option<String>,

    /// Search API endpoint
    #[serde(default = "default_search_base_url")]
    pub search_base_url: String,

    /// Events API endpoint
    #[serde(default = "default_events_base_url")]
    pub events_base_url: String,

    /// Weather API endpoint
    #[serde(default = "default_weather_base_url")]
    pub weather_base_url: String,
}

fn default_cache_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT.as_millis() as u64
}

fn default_cache_pool_size() -> usize {
    DEFAULT_POOL_SIZE
}

fn default_search_base_url() -> String {
    TAVILY_BASE_URL.to_string()
}

fn default_events_base_url() -> String {
    PREDICTHQ_BASE_URL.to_string()
}

fn default_weather_base_url() -> String {
    OPENWEATHER_BASE_URL.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            redis_url: None,
            cache_timeout_ms: default_cache_timeout_ms(),
            cache_pool_size: default_cache_pool_size(),
            cache_local_ttl: LocalTtlPolicy::default(),
            tavily_api_key: None,
            predicthq_access_token: None,
            openweather_api_key: None,
            search_base_url: default_search_base_url(),
            events_base_url: default_events_base_url(),
            weather_base_url: default_weather_base_url(),
        }
    }
}

impl Settings {
    /// Loads settings from every source
    ///
    /// # Arguments
    /// * `explicit` - Optional config file; it must exist when given
    pub fn load(explicit: Option<&Path>) -> Result<Self, SettingsError> {
        let mut builder = Config::builder();

        if let Some(path) = Self::default_config_path() {
            builder = builder.add_source(File::from(path).required(false));
        }
        if let Some(path) = explicit {
            builder = builder.add_source(File::from(path));
        }

        let settings = builder
            .add_source(Environment::default().try_parsing(true))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    /// Loads settings from a single file, ignoring the environment
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    /// XDG-compliant location of the user config file
    pub fn default_config_path() -> Option<PathBuf> {
        let project_dirs = ProjectDirs::from("", "", "ronin-cache")?;
        Some(project_dirs.config_dir().join("config.toml"))
    }

    /// The cache-facing part of the settings
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            redis_url: self.redis_url.clone(),
            timeout: Duration::from_millis(self.cache_timeout_ms.max(1)),
            pool_size: self.cache_pool_size.max(1),
            local_ttl: self.cache_local_ttl,
        }
    }
}
