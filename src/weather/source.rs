use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::models::WeatherSnapshot;

/// Supplies the current weather for a coordinate pair.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    async fn current(&self, latitude: f64, longitude: f64) -> Result<WeatherSnapshot>;
}

/// Always reports the same snapshot.
#[derive(Debug, Clone)]
pub struct StaticWeatherSource {
    snapshot: WeatherSnapshot,
}

impl StaticWeatherSource {
    pub fn new(snapshot: WeatherSnapshot) -> Self {
        Self { snapshot }
    }
}

#[async_trait]
impl WeatherSource for StaticWeatherSource {
    async fn current(&self, _latitude: f64, _longitude: f64) -> Result<WeatherSnapshot> {
        Ok(self.snapshot.clone())
    }
}

/// Snapshot kept in a JSON file, re-read on every request.
#[derive(Debug, Clone)]
pub struct JsonFileWeatherSource {
    path: PathBuf,
}

impl JsonFileWeatherSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl WeatherSource for JsonFileWeatherSource {
    async fn current(&self, _latitude: f64, _longitude: f64) -> Result<WeatherSnapshot> {
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("failed to read weather snapshot {}", self.path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("invalid weather snapshot {}", self.path.display()))
    }
}
