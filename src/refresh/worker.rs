use rand::Rng;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::events::{EventIngestor, FeedSource};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 6 * 60 * 60;
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 5 * 60;
pub const DEFAULT_RETRY_JITTER_SECS: u64 = 30;

/// What a single refresh reports back to its scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Success { events: usize },
    Retry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshSchedule {
    pub interval: Duration,
    pub retry_delay: Duration,
    pub retry_jitter: Duration,
}

impl Default for RefreshSchedule {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_REFRESH_INTERVAL_SECS),
            retry_delay: Duration::from_secs(DEFAULT_RETRY_DELAY_SECS),
            retry_jitter: Duration::from_secs(DEFAULT_RETRY_JITTER_SECS),
        }
    }
}

impl RefreshSchedule {
    /// Delay before the next attempt given the last outcome.
    pub fn next_delay(&self, outcome: RefreshOutcome) -> Duration {
        match outcome {
            RefreshOutcome::Success { .. } => self.interval,
            RefreshOutcome::Retry => {
                let jitter_ms = self.retry_jitter.as_millis() as u64;
                let extra = if jitter_ms == 0 {
                    0
                } else {
                    rand::thread_rng().gen_range(0..=jitter_ms)
                };
                self.retry_delay + Duration::from_millis(extra)
            }
        }
    }
}

/// Re-ingest the feed once. No side effects beyond the ingestion itself.
pub async fn refresh_once(ingestor: &EventIngestor, source: &FeedSource) -> RefreshOutcome {
    match ingestor.ingest_source(source).await {
        Ok(report) => RefreshOutcome::Success {
            events: report.parsed,
        },
        Err(_) => RefreshOutcome::Retry,
    }
}

/// Keep the event feed fresh until cancelled. The first refresh runs one
/// full interval after start; start-up ingestion is the caller's job.
pub async fn refresh_loop(
    ingestor: EventIngestor,
    source: FeedSource,
    schedule: RefreshSchedule,
    cancel_token: CancellationToken,
) {
    let mut delay = schedule.interval;

    loop {
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = cancel_token.cancelled() => {
                log_info!("feed refresh scheduler shutting down");
                break;
            }
        }

        let outcome = refresh_once(&ingestor, &source).await;
        delay = schedule.next_delay(outcome);
        match outcome {
            RefreshOutcome::Success { events } => {
                log_info!("feed refreshed ({events} events), next in {}s", delay.as_secs())
            }
            RefreshOutcome::Retry => {
                log_warn!("feed refresh failed, retrying in {}s", delay.as_secs())
            }
        }
    }
}
