use serde::{Deserialize, Serialize};

/// Marketplace listing as delivered by the external catalog.
///
/// Only `id`, `title` and `category` matter for relevance; the rest rides
/// along so the ranked feed can be rendered without a second lookup.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Listing {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub price: Option<f64>,
    pub is_donation: bool,
    pub image_url: Option<String>,
    pub user_id: String,
    pub location_name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub created_at: i64,
    pub available_on: Option<i64>,
}

impl Listing {
    /// Raw category, or `None` when blank. Not trimmed: category matching
    /// is exact.
    pub fn category(&self) -> Option<&str> {
        if self.category.trim().is_empty() {
            None
        } else {
            Some(&self.category)
        }
    }

    pub fn has_title(&self) -> bool {
        !self.title.trim().is_empty()
    }
}
