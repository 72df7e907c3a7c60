use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};
use tokio::time::Duration;

use crate::events::csv::DEFAULT_DELIMITER;
use crate::feed::loader::{DEFAULT_LOAD_TIMEOUT_MS, DEFAULT_SETTLE_TIMEOUT_MS};
use crate::refresh::worker::{
    RefreshSchedule, DEFAULT_REFRESH_INTERVAL_SECS, DEFAULT_RETRY_DELAY_SECS,
    DEFAULT_RETRY_JITTER_SECS,
};
use crate::sensing::loop_worker::{SensorConfig, DEFAULT_EVENT_WINDOW_SECS, DEFAULT_TICK_INTERVAL_SECS};
use crate::weather::openweather::DEFAULT_BASE_URL;
use crate::weather::poller::{WeatherPollConfig, DEFAULT_POLL_INTERVAL_SECS};

pub const SETTINGS_PATH_ENV: &str = "CIRCULAR_CONTEXT_SETTINGS";
pub const FEED_PATH_ENV: &str = "CIRCULAR_CONTEXT_FEED";
pub const WEATHER_KEY_ENV: &str = "CIRCULAR_CONTEXT_WEATHER_KEY";
pub const DEFAULT_SETTINGS_FILE: &str = "circular-context.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorSettings {
    pub tick_interval_secs: u64,
    pub default_event_window_secs: i64,
}

impl Default for SensorSettings {
    fn default() -> Self {
        Self {
            tick_interval_secs: DEFAULT_TICK_INTERVAL_SECS,
            default_event_window_secs: DEFAULT_EVENT_WINDOW_SECS,
        }
    }
}

impl SensorSettings {
    pub fn to_config(&self) -> SensorConfig {
        SensorConfig {
            tick_interval: Duration::from_secs(self.tick_interval_secs.max(1)),
            default_event_window: chrono::Duration::seconds(self.default_event_window_secs.max(0)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshSettings {
    pub interval_secs: u64,
    pub retry_delay_secs: u64,
    pub retry_jitter_secs: u64,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
            retry_delay_secs: DEFAULT_RETRY_DELAY_SECS,
            retry_jitter_secs: DEFAULT_RETRY_JITTER_SECS,
        }
    }
}

impl RefreshSettings {
    pub fn to_schedule(&self) -> RefreshSchedule {
        RefreshSchedule {
            interval: Duration::from_secs(self.interval_secs.max(1)),
            retry_delay: Duration::from_secs(self.retry_delay_secs.max(1)),
            retry_jitter: Duration::from_secs(self.retry_jitter_secs),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedSettings {
    pub load_timeout_ms: u64,
    pub settle_timeout_ms: u64,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            load_timeout_ms: DEFAULT_LOAD_TIMEOUT_MS,
            settle_timeout_ms: DEFAULT_SETTLE_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSettings {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl WeatherSettings {
    pub fn to_poll_config(&self) -> WeatherPollConfig {
        WeatherPollConfig {
            latitude: self.latitude,
            longitude: self.longitude,
            interval: Duration::from_secs(self.poll_interval_secs.max(1)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub feed_path: Option<PathBuf>,
    pub feed_delimiter: char,
    pub listings_path: Option<PathBuf>,
    pub sensor: SensorSettings,
    pub refresh: RefreshSettings,
    pub feed: FeedSettings,
    pub weather: Option<WeatherSettings>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            feed_path: None,
            feed_delimiter: DEFAULT_DELIMITER,
            listings_path: None,
            sensor: SensorSettings::default(),
            refresh: RefreshSettings::default(),
            feed: FeedSettings::default(),
            weather: None,
        }
    }
}

impl Settings {
    /// Apply environment overrides on top of the file contents.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(feed) = lookup(FEED_PATH_ENV).filter(|v| !v.trim().is_empty()) {
            self.feed_path = Some(PathBuf::from(feed));
        }
        if let Some(key) = lookup(WEATHER_KEY_ENV).filter(|v| !v.trim().is_empty()) {
            if let Some(weather) = self.weather.as_mut() {
                weather.api_key = Some(key);
            }
        }
    }
}

/// Settings file location: explicit argument, then env, then the working directory.
pub fn resolve_settings_path(arg: Option<String>) -> PathBuf {
    arg.or_else(|| std::env::var(SETTINGS_PATH_ENV).ok())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_FILE))
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<Settings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!("Ignoring unreadable settings {}: {err}", path.display());
                Settings::default()
            })
        } else {
            Settings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> Settings {
        self.read().clone()
    }

    pub fn update(&self, settings: Settings) -> Result<()> {
        let mut guard = self.write();
        *guard = settings;
        self.persist(&guard)
    }

    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read settings from {}", self.path.display()))?;
        let data: Settings = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse settings {}", self.path.display()))?;
        *self.write() = data;
        Ok(())
    }

    fn persist(&self, data: &Settings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    fn read(&self) -> RwLockReadGuard<'_, Settings> {
        match self.data.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, Settings> {
        match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
