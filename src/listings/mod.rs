//! Listing catalog seam.
//!
//! The marketplace backend owns listings; this crate only reads snapshots.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::models::Listing;

/// Demo catalog compiled into the binary.
pub const BUNDLED_CATALOG: &str = include_str!("../../assets/listings_sample.json");

#[async_trait]
pub trait ListingSource: Send + Sync {
    async fn fetch_all(&self) -> Result<Vec<Listing>>;
}

/// Catalog exported as a JSON array of listings.
pub struct JsonFileListingSource {
    path: PathBuf,
}

impl JsonFileListingSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ListingSource for JsonFileListingSource {
    async fn fetch_all(&self) -> Result<Vec<Listing>> {
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("failed to read listing catalog {}", self.path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("invalid listing catalog {}", self.path.display()))
    }
}

/// Fixed catalog, handy for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticListingSource {
    listings: Vec<Listing>,
}

impl StaticListingSource {
    pub fn new(listings: Vec<Listing>) -> Self {
        Self { listings }
    }

    pub fn bundled() -> Result<Self> {
        let listings =
            serde_json::from_str(BUNDLED_CATALOG).context("invalid bundled listing catalog")?;
        Ok(Self::new(listings))
    }
}

#[async_trait]
impl ListingSource for StaticListingSource {
    async fn fetch_all(&self) -> Result<Vec<Listing>> {
        Ok(self.listings.clone())
    }
}
