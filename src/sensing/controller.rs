use std::sync::Arc;

use anyhow::{bail, Context, Result};
use log::info;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::events::EventSet;
use crate::models::SensorReading;

use super::loop_worker::{sensor_loop, system_clock, Clock, SensorConfig};

/// Owns the sensor's background loop and its latest-reading cell.
///
/// The cell outlives start/stop cycles, so subscribers taken before `start`
/// keep receiving readings after it.
pub struct SensorController {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
    reading_tx: Arc<watch::Sender<SensorReading>>,
    config: SensorConfig,
    clock: Clock,
}

impl SensorController {
    pub fn new(config: SensorConfig) -> Self {
        Self::with_clock(config, system_clock())
    }

    pub fn with_clock(config: SensorConfig, clock: Clock) -> Self {
        let (reading_tx, _) = watch::channel(SensorReading::default());
        Self {
            handle: None,
            cancel_token: None,
            reading_tx: Arc::new(reading_tx),
            config,
            clock,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SensorReading> {
        self.reading_tx.subscribe()
    }

    pub fn reading(&self) -> SensorReading {
        self.reading_tx.borrow().clone()
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    pub fn start(&mut self, events_rx: watch::Receiver<EventSet>) -> Result<()> {
        if self.handle.is_some() {
            bail!("event sensor already running");
        }

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(sensor_loop(
            events_rx,
            Arc::clone(&self.reading_tx),
            self.config,
            Arc::clone(&self.clock),
            cancel_token.clone(),
        ));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("event sensor task failed to join")?;
            info!("event sensor stopped");
        }
        Ok(())
    }
}
