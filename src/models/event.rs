//! City event data model.
//!
//! One row of an ingested event-schedule feed that survived parsing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder used when a row carries no title.
pub const UNTITLED_EVENT: &str = "Untitled Event";

/// A scheduled city event. `start_time` is always present: rows without a
/// parseable start are never turned into records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub id: String,
    pub title: String,
    pub category: Option<String>,
    pub venue: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}
