use crate::CoreError;
use berth_runtime::{EngineAdapter, ProviderAdapter};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// How far the gate has verified the backends. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadinessStage {
    Unchecked,
    Installed,
    Up,
    Initialized,
}

impl fmt::Display for ReadinessStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unchecked => "unchecked",
            Self::Installed => "installed",
            Self::Up => "up",
            Self::Initialized => "initialized",
        };
        f.write_str(s)
    }
}

/// Three write-once flags. `initialized` implies `up` implies `installed`
/// because the gate only sets them in that order.
#[derive(Debug, Default)]
pub struct ReadinessState {
    installed: AtomicBool,
    up: AtomicBool,
    initialized: AtomicBool,
}

impl ReadinessState {
    pub fn is_installed(&self) -> bool {
        self.installed.load(Ordering::Acquire)
    }

    pub fn is_up(&self) -> bool {
        self.up.load(Ordering::Acquire)
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    pub fn stage(&self) -> ReadinessStage {
        if self.is_initialized() {
            ReadinessStage::Initialized
        } else if self.is_up() {
            ReadinessStage::Up
        } else if self.is_installed() {
            ReadinessStage::Installed
        } else {
            ReadinessStage::Unchecked
        }
    }
}

/// Verifies provider and engine readiness at most once per stage.
///
/// Negative answers and errors are never cached, so a later call retries the
/// stage that failed. Concurrent first callers queue on a single-flight lock
/// and find the work already done when they get it.
#[derive(Debug, Default)]
pub struct ReadinessGate {
    state: Arc<ReadinessState>,
    flight: Mutex<()>,
}

impl ReadinessGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &Arc<ReadinessState> {
        &self.state
    }

    pub fn stage(&self) -> ReadinessStage {
        self.state.stage()
    }

    /// Full check: installed, up, then engine init with the provider's config.
    pub async fn ensure_ready(
        &self,
        provider: &dyn ProviderAdapter,
        engine: &dyn EngineAdapter,
    ) -> Result<(), CoreError> {
        if self.state.is_initialized() {
            return Ok(());
        }
        let _flight = self.flight.lock().await;

        self.check_installed(provider).await?;

        if !self.state.is_up() {
            let up = provider
                .is_up()
                .await
                .map_err(|source| CoreError::Provider {
                    provider: provider.name().to_owned(),
                    source,
                })?;
            if !up {
                return Err(CoreError::ProviderNotRunning(provider.name().to_owned()));
            }
            self.state.up.store(true, Ordering::Release);
            debug!("provider '{}' is up", provider.name());
        }

        if !self.state.is_initialized() {
            let config = provider
                .engine_config()
                .await
                .map_err(|source| CoreError::ProviderConfig {
                    provider: provider.name().to_owned(),
                    source,
                })?;
            engine.init(config).await?;
            self.state.initialized.store(true, Ordering::Release);
            info!(
                "engine '{}' initialized on provider '{}'",
                engine.name(),
                provider.name()
            );
        }

        Ok(())
    }

    /// First stage only. Provider power control needs no more than this.
    pub async fn ensure_installed(&self, provider: &dyn ProviderAdapter) -> Result<(), CoreError> {
        if self.state.is_installed() {
            return Ok(());
        }
        let _flight = self.flight.lock().await;
        self.check_installed(provider).await
    }

    async fn check_installed(&self, provider: &dyn ProviderAdapter) -> Result<(), CoreError> {
        if self.state.is_installed() {
            return Ok(());
        }
        let installed = provider
            .is_installed()
            .await
            .map_err(|source| CoreError::Provider {
                provider: provider.name().to_owned(),
                source,
            })?;
        if !installed {
            return Err(CoreError::ProviderNotInstalled(provider.name().to_owned()));
        }
        self.state.installed.store(true, Ordering::Release);
        debug!("provider '{}' is installed", provider.name());
        Ok(())
    }
}
