use crate::provider::ProviderAdapter;
use crate::types::{
    BackendConfig, ContainerDescriptor, CreateOptions, EngineConfig, ImageSpec, InfoRecord,
    InspectRecord, StartOptions,
};
use crate::RuntimeError;
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};

/// Chunks of output produced by a command running inside a container.
pub type OutputStream = BoxStream<'static, Result<Vec<u8>, RuntimeError>>;

/// Destination for live-streamed output.
pub type OutputSink = Box<dyn AsyncWrite + Send + Unpin>;

/// Source for a container's standard input.
pub type InputSource = Box<dyn AsyncRead + Send + Unpin>;

/// An ad hoc container started by `once`.
///
/// `done` resolves after the output has been fully delivered and the
/// container has been removed.
pub struct OnceRun {
    pub container: ContainerDescriptor,
    pub done: BoxFuture<'static, Result<(), RuntimeError>>,
}

impl fmt::Debug for OnceRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnceRun")
            .field("container", &self.container)
            .finish_non_exhaustive()
    }
}

/// A container runtime backend.
#[async_trait]
pub trait EngineAdapter: Send + Sync {
    fn name(&self) -> &str;

    /// One-time initialization with the configuration obtained from the provider.
    async fn init(&self, config: EngineConfig) -> Result<(), RuntimeError>;

    /// All containers, or only those labelled as belonging to `app`.
    async fn list(&self, app: Option<&str>) -> Result<Vec<ContainerDescriptor>, RuntimeError>;

    async fn info(&self, id: &str) -> Result<InfoRecord, RuntimeError>;

    async fn inspect(&self, container: &ContainerDescriptor) -> Result<InspectRecord, RuntimeError>;

    /// Look up a container by id or name, failing with `ContainerNotFound`.
    /// `reason` names the operation that needed it.
    async fn get_ensure(&self, id: &str, reason: &str)
        -> Result<ContainerDescriptor, RuntimeError>;

    async fn create(&self, options: CreateOptions) -> Result<ContainerDescriptor, RuntimeError>;

    async fn start(&self, id: &str, options: Option<StartOptions>) -> Result<(), RuntimeError>;

    async fn stop(&self, id: &str) -> Result<(), RuntimeError>;

    async fn remove(&self, id: &str) -> Result<(), RuntimeError>;

    async fn build(&self, image: &ImageSpec) -> Result<(), RuntimeError>;

    async fn exec(&self, id: &str, cmd: &[String]) -> Result<OutputStream, RuntimeError>;

    /// Run `cmd` and stream its stdout and stderr into the given sinks.
    async fn exec_to(
        &self,
        id: &str,
        cmd: &[String],
        stdout: &mut (dyn AsyncWrite + Send + Unpin),
        stderr: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<(), RuntimeError>;

    /// Create and start a container, wiring `stdin`/`stdout` to it.
    /// Returns once the container is started and streaming has begun.
    async fn run(
        &self,
        image: &str,
        cmd: &[String],
        stdin: Option<InputSource>,
        stdout: OutputSink,
        create: CreateOptions,
        start: Option<StartOptions>,
    ) -> Result<ContainerDescriptor, RuntimeError>;

    /// Like `run`, for a single-invocation container that removes itself.
    async fn once(
        &self,
        image: &str,
        cmd: &[String],
        create: CreateOptions,
        start: Option<StartOptions>,
        output: OutputSink,
    ) -> Result<OnceRun, RuntimeError>;

    /// The provider this engine runs on.
    fn provider_module(&self) -> Arc<dyn ProviderAdapter>;
}

type EngineFactory =
    Arc<dyn Fn(&BackendConfig) -> Result<Arc<dyn EngineAdapter>, RuntimeError> + Send + Sync>;

/// Engine plugins by name.
#[derive(Clone, Default)]
pub struct BackendRegistry {
    factories: BTreeMap<String, EngineFactory>,
}

impl fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("engines", &self.names())
            .finish()
    }
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the `docker` and `mock` engines.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("docker", |config| {
            let provider = crate::provider::select_provider(&config.provider, &config.options)?;
            Ok(Arc::new(crate::docker::DockerEngine::new(
                provider,
                &config.options,
            )))
        });
        registry.register("mock", |config| {
            let provider = crate::provider::select_provider(&config.provider, &config.options)?;
            Ok(Arc::new(crate::mock::MockEngine::with_provider(provider)))
        });
        registry
    }

    /// Add or replace the factory for `name`.
    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&BackendConfig) -> Result<Arc<dyn EngineAdapter>, RuntimeError>
            + Send
            + Sync
            + 'static,
    {
        self.factories.insert(name.to_owned(), Arc::new(factory));
    }

    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    pub fn resolve(&self, config: &BackendConfig) -> Result<Arc<dyn EngineAdapter>, RuntimeError> {
        let factory = self
            .factories
            .get(&config.engine)
            .ok_or_else(|| RuntimeError::BackendUnavailable(config.engine.clone()))?;
        factory(config)
    }
}

/// Resolve `config` against the built-in engines.
pub fn select_backend(config: &BackendConfig) -> Result<Arc<dyn EngineAdapter>, RuntimeError> {
    BackendRegistry::with_builtins().resolve(config)
}
