use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Badge {
    #[serde(rename = "Event nearby")]
    EventNearby,
    #[serde(rename = "Trending")]
    Trending,
}

impl Badge {
    pub fn label(&self) -> &'static str {
        match self {
            Badge::EventNearby => "Event nearby",
            Badge::Trending => "Trending",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingContext {
    pub listing_id: String,
    pub relevance_score: f64,
    pub badges: Vec<Badge>,
}

/// Output of one aggregator recomputation. Always replaced as a whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextState {
    pub climate_score: f64,
    pub event_intensity: f64,
    pub listing_contexts: HashMap<String, ListingContext>,
    /// Catalog revision the contexts were computed from (0 = no catalog pushed yet).
    pub listings_revision: u64,
    pub computed_at: DateTime<Utc>,
}

impl ContextState {
    pub fn relevance_of(&self, listing_id: &str) -> Option<f64> {
        self.listing_contexts
            .get(listing_id)
            .map(|ctx| ctx.relevance_score)
    }

    pub fn is_primed(&self) -> bool {
        !self.listing_contexts.is_empty()
    }
}

impl Default for ContextState {
    fn default() -> Self {
        Self {
            climate_score: 0.0,
            event_intensity: 0.0,
            listing_contexts: HashMap::new(),
            listings_revision: 0,
            computed_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn badges_serialize_as_display_labels() {
        let json = serde_json::to_string(&vec![Badge::EventNearby, Badge::Trending]).unwrap();
        assert_eq!(json, r#"["Event nearby","Trending"]"#);
        assert_eq!(Badge::Trending.label(), "Trending");
    }
}
