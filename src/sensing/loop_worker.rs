use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tokio::sync::watch;
use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::events::EventSet;
use crate::models::{EventRecord, SensorReading};

use super::intensity::intensity_for;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

pub const DEFAULT_TICK_INTERVAL_SECS: u64 = 10;
pub const DEFAULT_EVENT_WINDOW_SECS: i64 = 3 * 60 * 60;

/// Source of "now" for the sensor. Tests pin it; production uses [`system_clock`].
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(Utc::now)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorConfig {
    pub tick_interval: Duration,
    /// Assumed duration of events that carry no end time.
    pub default_event_window: ChronoDuration,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(DEFAULT_TICK_INTERVAL_SECS),
            default_event_window: ChronoDuration::seconds(DEFAULT_EVENT_WINDOW_SECS),
        }
    }
}

/// Strictly inside `(start, end)`, or `(start, start + default_window)` when
/// the event has no end.
pub fn is_active(event: &EventRecord, now: DateTime<Utc>, default_window: ChronoDuration) -> bool {
    let ends = event
        .end_time
        .unwrap_or(event.start_time + default_window);
    now > event.start_time && now < ends
}

pub fn evaluate(events: &[EventRecord], now: DateTime<Utc>, default_window: ChronoDuration) -> SensorReading {
    let active_events: Vec<EventRecord> = events
        .iter()
        .filter(|event| is_active(event, now, default_window))
        .cloned()
        .collect();
    let intensity = intensity_for(active_events.len());

    SensorReading {
        timestamp: now,
        active_events,
        intensity,
    }
}

/// Re-evaluate the current event set every tick until cancelled. Each tick
/// publishes a fresh reading that replaces the previous one.
pub async fn sensor_loop(
    events_rx: watch::Receiver<EventSet>,
    reading_tx: Arc<watch::Sender<SensorReading>>,
    config: SensorConfig,
    clock: Clock,
    cancel_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(config.tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    log_info!(
        "event sensor started (tick every {}s)",
        config.tick_interval.as_secs_f64()
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let events = events_rx.borrow().clone();
                let reading = evaluate(&events, clock(), config.default_event_window);
                log_debug!(
                    "sensor tick: {}/{} events active, intensity {:.3}",
                    reading.active_count(),
                    events.len(),
                    reading.intensity
                );
                reading_tx.send_replace(reading);
            }
            _ = cancel_token.cancelled() => {
                log_info!("event sensor shutting down");
                break;
            }
        }
    }
}
