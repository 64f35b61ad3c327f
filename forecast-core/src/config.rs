use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    client::{DEFAULT_BASE_URL, DEFAULT_REQUEST_TIMEOUT, DEFAULT_RESOURCE_TIMEOUT, FetchOptions},
    model::Coordinate,
};

/// Forecast endpoint and its timeouts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub request_timeout_secs: u64,
    pub resource_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
            resource_timeout_secs: DEFAULT_RESOURCE_TIMEOUT.as_secs(),
        }
    }
}

/// Position reported on hosts without positioning hardware.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,

    /// Stop waiting for a fix after this many seconds. Unset means wait forever.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix_timeout_secs: Option<u64>,
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// diagnostics = true
///
/// [api]
/// base_url = "https://api.open-meteo.com/v1/forecast"
/// request_timeout_secs = 15
/// resource_timeout_secs = 60
///
/// [location]
/// latitude = 52.52
/// longitude = 13.405
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Network diagnostics; unset follows the build profile.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<bool>,
    pub api: ApiConfig,
    pub location: LocationConfig,
}

impl Config {
    /// Client timeouts; a zero value falls back to the default.
    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            request_timeout: secs_or(self.api.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT),
            resource_timeout: secs_or(self.api.resource_timeout_secs, DEFAULT_RESOURCE_TIMEOUT),
        }
    }

    /// Configured position, if both halves are present.
    pub fn fixed_coordinate(&self) -> Option<Coordinate> {
        match (self.location.latitude, self.location.longitude) {
            (Some(latitude), Some(longitude)) => Some(Coordinate { latitude, longitude }),
            _ => None,
        }
    }

    pub fn set_fixed_coordinate(&mut self, coordinate: Coordinate) {
        self.location.latitude = Some(coordinate.latitude);
        self.location.longitude = Some(coordinate.longitude);
    }

    pub fn fix_timeout(&self) -> Option<Duration> {
        self.location.fix_timeout_secs.map(Duration::from_secs)
    }

    /// Diagnostics are on in debug builds unless configured otherwise.
    pub fn diagnostics_enabled(&self) -> bool {
        self.diagnostics.unwrap_or(cfg!(debug_assertions))
    }

    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "hourly-forecast", "forecast")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }
}

fn secs_or(secs: u64, default: Duration) -> Duration {
    if secs == 0 { default } else { Duration::from_secs(secs) }
}
