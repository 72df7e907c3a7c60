use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use anyhow::{Context, Result};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::models::{ContextState, Listing, SensorReading, WeatherSnapshot};
use crate::sensing::{system_clock, Clock};

use super::config::ScoringConfig;
use super::scoring::compute_context;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info};

#[derive(Debug, Clone, Default)]
struct CatalogSnapshot {
    revision: u64,
    listings: Arc<Vec<Listing>>,
}

struct AggregatorInner {
    weather_tx: watch::Sender<Option<WeatherSnapshot>>,
    catalog_tx: watch::Sender<CatalogSnapshot>,
    context_tx: Arc<watch::Sender<Arc<ContextState>>>,
    next_revision: AtomicU64,
    cancel_token: CancellationToken,
    handle: Mutex<Option<JoinHandle<()>>>,
}

/// Fuses sensor intensity, weather and the listing catalog into per-listing
/// relevance. Any input change recomputes the whole map from the latest
/// value of all three inputs.
///
/// Cheap to clone; all clones drive the same background task.
#[derive(Clone)]
pub struct ContextAggregator {
    inner: Arc<AggregatorInner>,
}

impl ContextAggregator {
    /// Spawn the combine loop. Must be called inside a tokio runtime.
    pub fn start(sensor_rx: watch::Receiver<SensorReading>, config: ScoringConfig) -> Self {
        Self::start_with_clock(sensor_rx, config, system_clock())
    }

    /// Like [`ContextAggregator::start`], stamping `computed_at` from `clock`.
    pub fn start_with_clock(
        sensor_rx: watch::Receiver<SensorReading>,
        config: ScoringConfig,
        clock: Clock,
    ) -> Self {
        let (weather_tx, weather_rx) = watch::channel(None);
        let (catalog_tx, catalog_rx) = watch::channel(CatalogSnapshot::default());
        let (context_tx, _) = watch::channel(Arc::new(ContextState::default()));
        let context_tx = Arc::new(context_tx);
        let cancel_token = CancellationToken::new();

        let handle = tokio::spawn(aggregation_loop(
            sensor_rx,
            weather_rx,
            catalog_rx,
            Arc::clone(&context_tx),
            config,
            clock,
            cancel_token.clone(),
        ));

        Self {
            inner: Arc::new(AggregatorInner {
                weather_tx,
                catalog_tx,
                context_tx,
                next_revision: AtomicU64::new(1),
                cancel_token,
                handle: Mutex::new(Some(handle)),
            }),
        }
    }

    pub fn update_weather(&self, weather: Option<WeatherSnapshot>) {
        self.inner.weather_tx.send_replace(weather);
    }

    pub fn weather(&self) -> Option<WeatherSnapshot> {
        self.inner.weather_tx.borrow().clone()
    }

    /// Replace the catalog. Returns the revision the aggregator will stamp on
    /// the context computed from it.
    pub fn update_listings(&self, listings: Vec<Listing>) -> u64 {
        let revision = self.inner.next_revision.fetch_add(1, Ordering::Relaxed);
        self.inner.catalog_tx.send_replace(CatalogSnapshot {
            revision,
            listings: Arc::new(listings),
        });
        revision
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<ContextState>> {
        self.inner.context_tx.subscribe()
    }

    pub fn context(&self) -> Arc<ContextState> {
        self.inner.context_tx.borrow().clone()
    }

    /// Latest context once it reflects catalog `revision`, or whatever is
    /// current when `settle` runs out.
    pub async fn context_for_revision(&self, revision: u64, settle: Duration) -> Arc<ContextState> {
        let mut rx = self.subscribe();
        let settled = tokio::time::timeout(
            settle,
            rx.wait_for(|state| state.listings_revision >= revision),
        )
        .await;

        match settled {
            Ok(Ok(state)) => Arc::clone(&state),
            _ => self.context(),
        }
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.inner.cancel_token.cancel();
        let handle = self.inner.handle.lock().await.take();
        if let Some(handle) = handle {
            handle
                .await
                .context("context aggregator task failed to join")?;
        }
        Ok(())
    }
}

async fn aggregation_loop(
    mut sensor_rx: watch::Receiver<SensorReading>,
    mut weather_rx: watch::Receiver<Option<WeatherSnapshot>>,
    mut catalog_rx: watch::Receiver<CatalogSnapshot>,
    context_tx: Arc<watch::Sender<Arc<ContextState>>>,
    config: ScoringConfig,
    clock: Clock,
    cancel_token: CancellationToken,
) {
    let mut sensor_open = true;
    recompute(&mut sensor_rx, &mut weather_rx, &mut catalog_rx, &context_tx, &config, &clock);

    loop {
        tokio::select! {
            changed = sensor_rx.changed(), if sensor_open => {
                if changed.is_err() {
                    // keep serving the last reading; weather and catalog still drive updates
                    log_info!("event sensor closed, holding last intensity");
                    sensor_open = false;
                    continue;
                }
            }
            changed = weather_rx.changed() => {
                if changed.is_err() {
                    log_error!("weather input closed, stopping aggregation");
                    break;
                }
            }
            changed = catalog_rx.changed() => {
                if changed.is_err() {
                    log_error!("listing catalog input closed, stopping aggregation");
                    break;
                }
            }
            _ = cancel_token.cancelled() => {
                break;
            }
        }

        recompute(&mut sensor_rx, &mut weather_rx, &mut catalog_rx, &context_tx, &config, &clock);
    }

    log_info!("context aggregator shutting down");
}

fn recompute(
    sensor_rx: &mut watch::Receiver<SensorReading>,
    weather_rx: &mut watch::Receiver<Option<WeatherSnapshot>>,
    catalog_rx: &mut watch::Receiver<CatalogSnapshot>,
    context_tx: &watch::Sender<Arc<ContextState>>,
    config: &ScoringConfig,
    clock: &Clock,
) {
    let intensity = sensor_rx.borrow_and_update().intensity;
    let weather = weather_rx.borrow_and_update().clone();
    let catalog = catalog_rx.borrow_and_update().clone();

    let state = compute_context(
        intensity,
        weather.as_ref(),
        &catalog.listings,
        catalog.revision,
        clock(),
        config,
    );
    log_debug!(
        "recomputed {} listing contexts (intensity {:.3}, climate {:.3}, catalog rev {})",
        state.listing_contexts.len(),
        state.event_intensity,
        state.climate_score,
        state.listings_revision
    );
    context_tx.send_replace(Arc::new(state));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Badge;
    use chrono::{TimeZone, Utc};

    fn listing(id: &str, category: &str) -> Listing {
        Listing {
            id: id.into(),
            title: id.into(),
            category: category.into(),
            ..Listing::default()
        }
    }

    fn reading(intensity: f64) -> SensorReading {
        SensorReading {
            intensity,
            ..SensorReading::default()
        }
    }

    async fn settled(aggregator: &ContextAggregator, revision: u64) -> Arc<ContextState> {
        aggregator
            .context_for_revision(revision, Duration::from_secs(5))
            .await
    }

    async fn next_state(rx: &mut watch::Receiver<Arc<ContextState>>) -> Arc<ContextState> {
        rx.changed().await.unwrap();
        rx.borrow_and_update().clone()
    }

    #[tokio::test]
    async fn empty_catalog_yields_empty_map() {
        let (_sensor_tx, sensor_rx) = watch::channel(reading(0.9));
        let aggregator = ContextAggregator::start(sensor_rx, ScoringConfig::default());
        let state = settled(&aggregator, 0).await;
        assert!(state.listing_contexts.is_empty());
        aggregator.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn catalog_push_is_scored_with_latest_intensity() {
        let (_sensor_tx, sensor_rx) = watch::channel(reading(0.9));
        let aggregator = ContextAggregator::start(sensor_rx, ScoringConfig::default());

        let revision = aggregator.update_listings(vec![listing("a", "Home"), listing("b", "Electronics")]);
        let state = settled(&aggregator, revision).await;

        assert_eq!(state.listings_revision, revision);
        assert_eq!(state.event_intensity, 0.9);
        assert_eq!(state.listing_contexts.len(), 2);
        assert_eq!(state.listing_contexts["a"].badges, vec![Badge::EventNearby]);
        aggregator.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn sensor_change_recomputes_using_other_latest_inputs() {
        let (sensor_tx, sensor_rx) = watch::channel(reading(0.0));
        let aggregator = ContextAggregator::start(sensor_rx, ScoringConfig::default());
        aggregator.update_weather(Some(WeatherSnapshot::with_temperature(22.0)));
        let revision = aggregator.update_listings(vec![listing("tent", "Outdoor")]);
        let before = settled(&aggregator, revision).await;
        assert_eq!(before.climate_score, 1.0);

        let mut rx = aggregator.subscribe();
        sensor_tx.send_replace(reading(1.0));
        let after = next_state(&mut rx).await;

        assert_eq!(after.event_intensity, 1.0);
        assert_eq!(after.climate_score, 1.0);
        assert_eq!(after.listings_revision, revision);
        assert!(after.listing_contexts["tent"].relevance_score > before.listing_contexts["tent"].relevance_score);
        aggregator.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn weather_change_rescores_every_listing() {
        let (_sensor_tx, sensor_rx) = watch::channel(reading(0.5));
        let aggregator = ContextAggregator::start(sensor_rx, ScoringConfig::default());
        aggregator.update_weather(Some(WeatherSnapshot::with_temperature(22.0)));
        let revision = aggregator.update_listings(vec![
            listing("jacket", "Clothing"),
            listing("laptop", "Electronics"),
            listing("lamp", "Home"),
        ]);
        let warm = settled(&aggregator, revision).await;

        let mut rx = aggregator.subscribe();
        aggregator.update_weather(Some(WeatherSnapshot::with_temperature(5.0)));
        let cold = next_state(&mut rx).await;

        assert_eq!(cold.listing_contexts.len(), 3);
        let climate_delta = 0.2 * (cold.climate_score - warm.climate_score);
        let delta = |id: &str| {
            cold.listing_contexts[id].relevance_score - warm.listing_contexts[id].relevance_score
        };
        // flat-boost categories move only with the climate term
        assert!((delta("laptop") - climate_delta).abs() < 1e-9);
        assert!((delta("lamp") - climate_delta).abs() < 1e-9);
        // clothing also swaps its boost from 0.3 to 1.0
        assert!((delta("jacket") - (climate_delta + 0.2 * 0.7)).abs() < 1e-9);
        aggregator.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn closed_sensor_keeps_last_intensity() {
        let (sensor_tx, sensor_rx) = watch::channel(reading(0.7));
        let aggregator = ContextAggregator::start(sensor_rx, ScoringConfig::default());
        drop(sensor_tx);

        let revision = aggregator.update_listings(vec![listing("a", "Home")]);
        let state = settled(&aggregator, revision).await;
        assert_eq!(state.listings_revision, revision);
        assert_eq!(state.event_intensity, 0.7);
        aggregator.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn computed_at_comes_from_the_injected_clock() {
        let pinned = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let clock: Clock = Arc::new(move || pinned);
        let (_sensor_tx, sensor_rx) = watch::channel(reading(0.2));
        let aggregator = ContextAggregator::start_with_clock(sensor_rx, ScoringConfig::default(), clock);

        let revision = aggregator.update_listings(vec![listing("a", "Home")]);
        let state = settled(&aggregator, revision).await;
        assert_eq!(state.listings_revision, revision);
        assert_eq!(state.computed_at, pinned);
        aggregator.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn unsettled_revision_falls_back_to_current_context() {
        let (_sensor_tx, sensor_rx) = watch::channel(reading(0.0));
        let aggregator = ContextAggregator::start(sensor_rx, ScoringConfig::default());
        let state = aggregator
            .context_for_revision(99, Duration::from_millis(50))
            .await;
        assert_eq!(state.listings_revision, 0);
        aggregator.shutdown().await.unwrap();
    }
}
