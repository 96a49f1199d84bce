use crate::types::{EngineConfig, ProviderDescriptor};
use crate::RuntimeError;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

/// The host-level backend that makes a container engine available.
///
/// Probes may be expensive (they can shell out or hit a socket); callers are
/// expected to cache positive answers rather than probe on every operation.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn name(&self) -> &str;

    async fn is_installed(&self) -> Result<bool, RuntimeError>;

    async fn is_up(&self) -> Result<bool, RuntimeError>;

    /// Configuration the engine needs for its one-time `init`.
    async fn engine_config(&self) -> Result<EngineConfig, RuntimeError>;

    async fn up(&self) -> Result<(), RuntimeError>;

    async fn down(&self) -> Result<(), RuntimeError>;

    fn descriptor(&self) -> ProviderDescriptor {
        ProviderDescriptor {
            name: self.name().to_owned(),
        }
    }
}

pub fn select_provider(
    name: &str,
    options: &Map<String, Value>,
) -> Result<Arc<dyn ProviderAdapter>, RuntimeError> {
    match name {
        "host" => Ok(Arc::new(crate::host::HostProvider::from_options(options))),
        "mock" => Ok(Arc::new(crate::mock::MockProvider::from_options(options))),
        other => Err(RuntimeError::BackendUnavailable(other.to_owned())),
    }
}
