use serde::{Deserialize, Serialize};

/// Current weather for the user's area. Opaque input to the aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherSnapshot {
    pub temperature_c: f64,
    pub condition: String,
    pub description: String,
    pub city: String,
}

impl WeatherSnapshot {
    pub fn with_temperature(temperature_c: f64) -> Self {
        Self {
            temperature_c,
            condition: "Unknown".into(),
            description: "Unknown".into(),
            city: "Unknown".into(),
        }
    }
}
