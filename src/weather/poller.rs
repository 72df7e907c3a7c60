use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::aggregation::ContextAggregator;

use super::source::WeatherSource;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 15 * 60;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeatherPollConfig {
    pub latitude: f64,
    pub longitude: f64,
    pub interval: Duration,
}

/// Fetch on every tick and push successful readings into the aggregator.
/// A failed fetch leaves the previous snapshot in place.
pub async fn weather_poll_loop(
    source: Arc<dyn WeatherSource>,
    aggregator: ContextAggregator,
    config: WeatherPollConfig,
    cancel_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match source.current(config.latitude, config.longitude).await {
                    Ok(snapshot) => {
                        log_debug!(
                            "weather for {}: {:.1}C {}",
                            snapshot.city,
                            snapshot.temperature_c,
                            snapshot.condition
                        );
                        aggregator.update_weather(Some(snapshot));
                    }
                    Err(err) => log_warn!("weather unavailable: {err:#}"),
                }
            }
            _ = cancel_token.cancelled() => {
                log_info!("weather poller shutting down");
                break;
            }
        }
    }
}

pub fn spawn_weather_poller(
    source: Arc<dyn WeatherSource>,
    aggregator: ContextAggregator,
    config: WeatherPollConfig,
    cancel_token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(weather_poll_loop(source, aggregator, config, cancel_token))
}
