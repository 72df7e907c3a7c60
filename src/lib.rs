pub mod aggregation;
pub mod events;
pub mod feed;
pub mod listings;
pub mod models;
pub mod refresh;
pub mod sensing;
pub mod services;
pub mod settings;
pub mod utils;
pub mod weather;

use std::sync::Arc;

use anyhow::{Context, Result};
use log::{info, warn};

use feed::weather_recommendation;
use listings::{JsonFileListingSource, ListingSource, StaticListingSource};
use services::ContextServices;
use settings::{resolve_settings_path, SettingsStore};

const DEBUG_ENV: &str = "CIRCULAR_CONTEXT_DEBUG";

/// Default filter for the given `CIRCULAR_CONTEXT_DEBUG` value; `RUST_LOG`
/// still overrides it.
fn default_level(debug_flag: Option<&str>) -> log::LevelFilter {
    match debug_flag.map(str::trim) {
        Some(flag) if flag == "1" || flag.eq_ignore_ascii_case("true") => log::LevelFilter::Debug,
        _ => log::LevelFilter::Info,
    }
}

fn init_logging() {
    let level = default_level(std::env::var(DEBUG_ENV).ok().as_deref());

    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .try_init();
}

pub async fn run() -> Result<()> {
    init_logging();
    info!("Circular context starting up...");

    let settings_path = resolve_settings_path(std::env::args().nth(1));
    let store = SettingsStore::new(settings_path)?;
    let mut settings = store.settings();
    settings.apply_env_overrides(|key| std::env::var(key).ok());
    info!("settings loaded from {}", store.path().display());

    let listing_source: Arc<dyn ListingSource> = match settings.listings_path.as_deref() {
        Some(path) => Arc::new(JsonFileListingSource::new(path)),
        None => Arc::new(StaticListingSource::bundled()?),
    };

    let mut services = ContextServices::start(settings)?;
    if let Err(err) = services.ingest_now().await {
        warn!("initial feed ingestion failed: {err:#}");
    }
    services.spawn_refresh();
    services.spawn_weather()?;

    match services.feed_loader(listing_source).load().await {
        Ok(feed) => {
            let context = &feed.context;
            info!(
                "home feed: {} listings (event intensity {:.2}, climate {:.2})",
                feed.listings.len(),
                context.event_intensity,
                context.climate_score
            );
            for listing in &feed.listings {
                let (score, badges) = context
                    .listing_contexts
                    .get(&listing.id)
                    .map(|ctx| {
                        let labels: Vec<&str> = ctx.badges.iter().map(|b| b.label()).collect();
                        (ctx.relevance_score, labels.join(", "))
                    })
                    .unwrap_or_default();
                info!("  {:.3}  {}  [{}]", score, listing.title, badges);
            }
        }
        Err(err) => warn!("home feed unavailable: {err:#}"),
    }

    if let Some(weather) = services.aggregator().weather() {
        info!("{}", weather_recommendation(weather.temperature_c));
    }

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    info!("shutting down");
    services.shutdown().await
}
