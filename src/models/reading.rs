//! Sensor reading data model.
//!
//! A point-in-time summary of how much is happening in the city. Only the
//! latest reading is retained; every tick replaces the previous one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::EventRecord;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorReading {
    pub timestamp: DateTime<Utc>,
    pub active_events: Vec<EventRecord>,
    /// 0.0..=1.0, a non-decreasing function of `active_events.len()`.
    pub intensity: f64,
}

impl SensorReading {
    pub fn active_count(&self) -> usize {
        self.active_events.len()
    }
}

impl Default for SensorReading {
    /// The reading published before the first tick: nothing observed yet.
    fn default() -> Self {
        Self {
            timestamp: DateTime::<Utc>::UNIX_EPOCH,
            active_events: Vec::new(),
            intensity: 0.0,
        }
    }
}
