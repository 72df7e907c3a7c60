use std::sync::Arc;

use anyhow::{Context, Result};
use log::{info, warn};
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::aggregation::{ContextAggregator, ScoringConfig};
use crate::events::{EventIngestor, FeedSource, IngestReport};
use crate::feed::FeedLoader;
use crate::listings::ListingSource;
use crate::refresh::refresh_loop;
use crate::sensing::{system_clock, Clock, SensorController};
use crate::settings::Settings;
use crate::weather::{spawn_weather_poller, OpenWeatherClient, WeatherPollConfig, WeatherSource};

/// Every long-lived piece of the context pipeline, wired together.
///
/// Nothing starts implicitly: `start` spawns the sensor and aggregator,
/// the refresh scheduler and weather poller are opt-in, and `shutdown`
/// stops all of them.
pub struct ContextServices {
    settings: Settings,
    feed_source: FeedSource,
    ingestor: EventIngestor,
    sensor: SensorController,
    aggregator: ContextAggregator,
    background_token: CancellationToken,
    background: Vec<JoinHandle<()>>,
}

impl ContextServices {
    pub fn start(settings: Settings) -> Result<Self> {
        Self::start_with_clock(settings, system_clock())
    }

    pub fn start_with_clock(settings: Settings, clock: Clock) -> Result<Self> {
        let feed_source = FeedSource::from_setting(settings.feed_path.as_deref());
        let ingestor = EventIngestor::with_delimiter(settings.feed_delimiter);

        let mut sensor =
            SensorController::with_clock(settings.sensor.to_config(), Arc::clone(&clock));
        sensor.start(ingestor.subscribe())?;
        let aggregator =
            ContextAggregator::start_with_clock(sensor.subscribe(), ScoringConfig::default(), clock);

        info!("context services started (feed: {})", feed_source.describe());

        Ok(Self {
            settings,
            feed_source,
            ingestor,
            sensor,
            aggregator,
            background_token: CancellationToken::new(),
            background: Vec::new(),
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn ingestor(&self) -> &EventIngestor {
        &self.ingestor
    }

    pub fn sensor(&self) -> &SensorController {
        &self.sensor
    }

    pub fn aggregator(&self) -> &ContextAggregator {
        &self.aggregator
    }

    /// Ingest the configured feed once. A failure keeps the previous event set.
    pub async fn ingest_now(&self) -> Result<IngestReport> {
        self.ingestor.ingest_source(&self.feed_source).await
    }

    pub fn spawn_refresh(&mut self) {
        let schedule = self.settings.refresh.to_schedule();
        let handle = tokio::spawn(refresh_loop(
            self.ingestor.clone(),
            self.feed_source.clone(),
            schedule,
            self.background_token.child_token(),
        ));
        self.background.push(handle);
    }

    /// Start polling weather if a location is configured. Returns whether a
    /// poller was spawned.
    pub fn spawn_weather(&mut self) -> Result<bool> {
        let Some(weather) = self.settings.weather.clone() else {
            return Ok(false);
        };
        let Some(api_key) = weather.api_key.clone() else {
            warn!("weather location configured without an API key, skipping weather");
            return Ok(false);
        };

        let client = OpenWeatherClient::new(&weather.base_url, api_key)?;
        self.spawn_weather_with(Arc::new(client), weather.to_poll_config());
        Ok(true)
    }

    pub fn spawn_weather_with(
        &mut self,
        source: Arc<dyn WeatherSource>,
        config: WeatherPollConfig,
    ) {
        let handle = spawn_weather_poller(
            source,
            self.aggregator.clone(),
            config,
            self.background_token.child_token(),
        );
        self.background.push(handle);
    }

    pub fn feed_loader(&self, source: Arc<dyn ListingSource>) -> FeedLoader {
        let feed = &self.settings.feed;
        FeedLoader::new(source, self.aggregator.clone()).with_timeouts(
            Duration::from_millis(feed.load_timeout_ms),
            Duration::from_millis(feed.settle_timeout_ms),
        )
    }

    /// Stop every task, even when one of them fails to join. The first
    /// failure is returned once everything has been stopped.
    pub async fn shutdown(mut self) -> Result<()> {
        self.background_token.cancel();
        let mut failures = Vec::new();

        for handle in self.background.drain(..) {
            if let Err(err) = handle.await.context("background task failed to join") {
                failures.push(err);
            }
        }
        if let Err(err) = self.sensor.stop().await {
            failures.push(err);
        }
        if let Err(err) = self.aggregator.shutdown().await {
            failures.push(err);
        }

        let mut failures = failures.into_iter();
        match failures.next() {
            Some(first) => {
                for err in failures {
                    warn!("additional shutdown failure: {err:#}");
                }
                Err(first)
            }
            None => {
                info!("context services stopped");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listings::StaticListingSource;
    use crate::models::{Listing, WeatherSnapshot};
    use crate::weather::StaticWeatherSource;

    fn quiet_settings() -> Settings {
        let mut settings = Settings::default();
        settings.sensor.tick_interval_secs = 1;
        settings
    }

    #[tokio::test]
    async fn start_ingest_and_shutdown() {
        let services = ContextServices::start(quiet_settings()).unwrap();
        assert!(services.sensor().is_running());

        let report = services.ingest_now().await.unwrap();
        assert!(report.parsed > 0);
        assert_eq!(services.ingestor().events().len(), report.parsed);

        services.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn missing_feed_file_is_reported() {
        let mut settings = quiet_settings();
        settings.feed_path = Some("/definitely/not/here.csv".into());
        let services = ContextServices::start(settings).unwrap();
        assert!(services.ingest_now().await.is_err());
        assert!(services.ingestor().events().is_empty());
        services.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn weather_without_location_or_key_is_skipped() {
        let mut services = ContextServices::start(quiet_settings()).unwrap();
        assert!(!services.spawn_weather().unwrap());

        let mut settings = quiet_settings();
        settings.weather = Some(crate::settings::WeatherSettings {
            latitude: -37.8,
            longitude: 144.9,
            api_key: None,
            poll_interval_secs: 60,
            base_url: crate::weather::openweather::DEFAULT_BASE_URL.to_string(),
        });
        let mut keyless = ContextServices::start(settings).unwrap();
        assert!(!keyless.spawn_weather().unwrap());

        services.shutdown().await.unwrap();
        keyless.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn failed_background_task_still_stops_sensor_and_aggregator() {
        let mut services = ContextServices::start(quiet_settings()).unwrap();
        services
            .background
            .push(tokio::spawn(async { panic!("refresh task crashed") }));

        let mut readings = services.sensor().subscribe();
        let mut contexts = services.aggregator().subscribe();
        readings.borrow_and_update();
        contexts.borrow_and_update();

        let err = services.shutdown().await.unwrap_err();
        assert!(format!("{err:#}").contains("background task failed to join"));

        // both publishers are gone once their loops have exited
        let drained = tokio::time::timeout(Duration::from_secs(30), async {
            while readings.changed().await.is_ok() {}
            while contexts.changed().await.is_ok() {}
        })
        .await;
        assert!(drained.is_ok());
    }

    #[tokio::test]
    async fn weather_feeds_the_loaded_ranking() {
        let mut services = ContextServices::start(quiet_settings()).unwrap();
        services.spawn_refresh();
        services.spawn_weather_with(
            Arc::new(StaticWeatherSource::new(WeatherSnapshot::with_temperature(3.0))),
            WeatherPollConfig {
                latitude: 0.0,
                longitude: 0.0,
                interval: Duration::from_secs(60),
            },
        );

        let mut rx = services.aggregator().subscribe();
        rx.wait_for(|state| state.climate_score > 0.0).await.unwrap();

        let catalog = vec![
            Listing {
                id: "speaker".into(),
                title: "Speaker".into(),
                category: "Electronics".into(),
                ..Listing::default()
            },
            Listing {
                id: "coat".into(),
                title: "Coat".into(),
                category: "Clothing".into(),
                ..Listing::default()
            },
        ];
        let loaded = services
            .feed_loader(Arc::new(StaticListingSource::new(catalog)))
            .load()
            .await
            .unwrap();
        assert_eq!(loaded.listings[0].id, "coat");

        services.shutdown().await.unwrap();
    }
}
