//! What "started" means after the engine accepts a start request.

use crate::CoreError;
use async_trait::async_trait;
use berth_runtime::EngineAdapter;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(2000);

#[async_trait]
pub trait ReadinessProbe: Send + Sync {
    fn name(&self) -> &str;

    /// Resolve once container `id` can be considered ready.
    async fn wait_ready(&self, engine: &dyn EngineAdapter, id: &str) -> Result<(), CoreError>;
}

/// Fixed wait after start. Approximates readiness without asking the engine.
#[derive(Debug, Clone, Copy)]
pub struct SettleDelay {
    delay: Duration,
}

impl Default for SettleDelay {
    fn default() -> Self {
        Self {
            delay: DEFAULT_SETTLE_DELAY,
        }
    }
}

impl SettleDelay {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

#[async_trait]
impl ReadinessProbe for SettleDelay {
    fn name(&self) -> &str {
        "delay"
    }

    async fn wait_ready(&self, _engine: &dyn EngineAdapter, id: &str) -> Result<(), CoreError> {
        debug!("settling '{id}' for {:?}", self.delay);
        tokio::time::sleep(self.delay).await;
        Ok(())
    }
}

/// Ask the engine until it reports the container running.
#[derive(Debug, Clone, Copy)]
pub struct PollRunning {
    interval: Duration,
    timeout: Duration,
}

impl PollRunning {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }
}

#[async_trait]
impl ReadinessProbe for PollRunning {
    fn name(&self) -> &str {
        "poll"
    }

    async fn wait_ready(&self, engine: &dyn EngineAdapter, id: &str) -> Result<(), CoreError> {
        let deadline = Instant::now() + self.timeout;
        loop {
            if engine.info(id).await?.running {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(CoreError::NotReady {
                    id: id.to_owned(),
                    timeout: self.timeout,
                });
            }
            debug!("'{id}' not running yet; polling again in {:?}", self.interval);
            tokio::time::sleep(self.interval).await;
        }
    }
}
