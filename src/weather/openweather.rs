//! Current-weather HTTP client (OpenWeatherMap `data/2.5/weather`, metric).

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tokio::time::Duration;

use crate::models::WeatherSnapshot;

use super::source::WeatherSource;

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/";
const REQUEST_TIMEOUT_SECS: u64 = 10;
const UNKNOWN: &str = "Unknown";

#[derive(Debug, Deserialize)]
pub struct WeatherResponse {
    pub main: MainInfo,
    #[serde(default)]
    pub weather: Vec<WeatherInfo>,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MainInfo {
    pub temp: f64,
}

#[derive(Debug, Deserialize)]
pub struct WeatherInfo {
    pub main: String,
    pub description: String,
}

impl From<WeatherResponse> for WeatherSnapshot {
    fn from(response: WeatherResponse) -> Self {
        let first = response.weather.into_iter().next();
        let (condition, description) = match first {
            Some(info) => (info.main, info.description),
            None => (UNKNOWN.to_string(), UNKNOWN.to_string()),
        };
        let city = response
            .name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN.to_string());

        WeatherSnapshot {
            temperature_c: response.main.temp,
            condition,
            description,
            city,
        }
    }
}

pub struct OpenWeatherClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl OpenWeatherClient {
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("failed to build weather HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/data/2.5/weather", self.base_url)
    }
}

#[async_trait]
impl WeatherSource for OpenWeatherClient {
    async fn current(&self, latitude: f64, longitude: f64) -> Result<WeatherSnapshot> {
        let response = self
            .http
            .get(self.endpoint())
            .query(&[
                ("lat", latitude.to_string()),
                ("lon", longitude.to_string()),
                ("appid", self.api_key.clone()),
                ("units", "metric".to_string()),
            ])
            .send()
            .await
            .context("weather request failed")?
            .error_for_status()
            .context("weather service returned an error status")?;

        let body: WeatherResponse = response
            .json()
            .await
            .context("failed to decode weather response")?;
        Ok(body.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_response_to_snapshot() {
        let body = r#"{
            "coord": {"lon": 144.96, "lat": -37.81},
            "weather": [{"id": 500, "main": "Rain", "description": "light rain", "icon": "10d"}],
            "main": {"temp": 12.4, "feels_like": 11.2, "humidity": 80},
            "name": "Melbourne"
        }"#;
        let snapshot: WeatherSnapshot = serde_json::from_str::<WeatherResponse>(body).unwrap().into();
        assert_eq!(snapshot.temperature_c, 12.4);
        assert_eq!(snapshot.condition, "Rain");
        assert_eq!(snapshot.description, "light rain");
        assert_eq!(snapshot.city, "Melbourne");
    }

    #[test]
    fn missing_fields_default_to_unknown() {
        let body = r#"{"main": {"temp": -2.0}, "weather": []}"#;
        let snapshot: WeatherSnapshot = serde_json::from_str::<WeatherResponse>(body).unwrap().into();
        assert_eq!(snapshot.temperature_c, -2.0);
        assert_eq!(snapshot.condition, UNKNOWN);
        assert_eq!(snapshot.description, UNKNOWN);
        assert_eq!(snapshot.city, UNKNOWN);
    }

    #[test]
    fn endpoint_tolerates_trailing_slash() {
        let client = OpenWeatherClient::new(DEFAULT_BASE_URL, "key").unwrap();
        assert_eq!(client.endpoint(), "https://api.openweathermap.org/data/2.5/weather");
        let client = OpenWeatherClient::new("http://localhost:8080", "key").unwrap();
        assert_eq!(client.endpoint(), "http://localhost:8080/data/2.5/weather");
    }
}
