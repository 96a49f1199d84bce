//! Readiness gating and delegation core for Berth.
//!
//! This crate ties the provider and engine backends from `berth-runtime` into
//! the `EngineFacade`, the uniform container lifecycle API. Every operation
//! passes through the `ReadinessGate` (installed, up, initialized; each
//! verified once per facade), then the `HookPipeline`, before reaching the
//! engine. It also provides the dependency `Registry`, pluggable readiness
//! probes for `start`, and the TOML configuration.

pub mod config;
pub mod facade;
pub mod hooks;
pub mod probe;
pub mod readiness;
pub mod registry;

pub use config::{
    default_config_path, resolve_config_path, BerthConfig, ReadinessConfig, ReadinessStrategy,
};
pub use facade::EngineFacade;
pub use hooks::{BoxError, Hook, HookEvent, HookPayload, HookPipeline};
pub use probe::{PollRunning, ReadinessProbe, SettleDelay, DEFAULT_SETTLE_DELAY};
pub use readiness::{ReadinessGate, ReadinessStage, ReadinessState};
pub use registry::{Registry, EVENTS_KEY, PROVIDER_MODULE_KEY};

use berth_runtime::RuntimeError;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{0} is NOT installed!")]
    ProviderNotInstalled(String),
    #[error("{0} is NOT running!")]
    ProviderNotRunning(String),
    #[error("provider '{provider}' failed: {source}")]
    Provider {
        provider: String,
        #[source]
        source: RuntimeError,
    },
    #[error("provider '{provider}' could not supply engine configuration: {source}")]
    ProviderConfig {
        provider: String,
        #[source]
        source: RuntimeError,
    },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("hook '{hook}' rejected {event}: {source}")]
    HookRejected {
        event: HookEvent,
        hook: String,
        #[source]
        source: BoxError,
    },
    #[error(transparent)]
    Backend(#[from] RuntimeError),
    #[error("no engine resolved yet; call init first")]
    NotInitialized,
    #[error("container '{id}' did not report running within {timeout:?}")]
    NotReady { id: String, timeout: Duration },
    #[error("config error: {0}")]
    Config(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
