use std::sync::Arc;

use anyhow::{anyhow, Result};
use log::{info, warn};
use tokio::time::{timeout, Duration};

use crate::aggregation::ContextAggregator;
use crate::listings::ListingSource;
use crate::models::{ContextState, Listing};

use super::ranking::rank_listings;

pub const DEFAULT_LOAD_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_SETTLE_TIMEOUT_MS: u64 = 250;

#[derive(Debug, Clone)]
pub struct LoadedFeed {
    pub listings: Vec<Listing>,
    /// Context the ranking was based on.
    pub context: Arc<ContextState>,
}

/// Loads the home feed: bounded-time catalog fetch, drop listings without a
/// title, hand the catalog to the aggregator, rank once.
pub struct FeedLoader {
    source: Arc<dyn ListingSource>,
    aggregator: ContextAggregator,
    load_timeout: Duration,
    settle_timeout: Duration,
}

impl FeedLoader {
    pub fn new(source: Arc<dyn ListingSource>, aggregator: ContextAggregator) -> Self {
        Self {
            source,
            aggregator,
            load_timeout: Duration::from_millis(DEFAULT_LOAD_TIMEOUT_MS),
            settle_timeout: Duration::from_millis(DEFAULT_SETTLE_TIMEOUT_MS),
        }
    }

    pub fn with_timeouts(mut self, load_timeout: Duration, settle_timeout: Duration) -> Self {
        self.load_timeout = load_timeout;
        self.settle_timeout = settle_timeout;
        self
    }

    pub async fn load(&self) -> Result<LoadedFeed> {
        let fetched = match timeout(self.load_timeout, self.source.fetch_all()).await {
            Ok(result) => result?,
            Err(_) => {
                warn!("listing fetch exceeded {}ms", self.load_timeout.as_millis());
                return Err(anyhow!(
                    "listing fetch timed out after {}ms",
                    self.load_timeout.as_millis()
                ));
            }
        };

        let total = fetched.len();
        let listings: Vec<Listing> = fetched.into_iter().filter(Listing::has_title).collect();
        if listings.len() < total {
            info!("skipped {} listings without a title", total - listings.len());
        }

        let revision = self.aggregator.update_listings(listings.clone());
        let context = self
            .aggregator
            .context_for_revision(revision, self.settle_timeout)
            .await;

        Ok(LoadedFeed {
            listings: rank_listings(listings, &context),
            context,
        })
    }
}
