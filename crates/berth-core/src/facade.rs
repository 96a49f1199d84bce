use crate::hooks::{HookEvent, HookPayload, HookPipeline};
use crate::probe::{ReadinessProbe, SettleDelay};
use crate::readiness::{ReadinessGate, ReadinessStage};
use crate::registry::{Registry, EVENTS_KEY, PROVIDER_MODULE_KEY};
use crate::{BerthConfig, CoreError};
use berth_runtime::{
    BackendConfig, BackendRegistry, ContainerDescriptor, CreateOptions, EngineAdapter, ImageSpec,
    InfoRecord, InputSource, InspectRecord, OnceRun, OutputSink, ProviderAdapter, StartOptions,
};
use futures::TryStreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWrite;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(500);

struct Resolved {
    engine: Arc<dyn EngineAdapter>,
    provider: Arc<dyn ProviderAdapter>,
}

#[derive(Debug, Clone, Copy)]
enum Power {
    Up,
    Down,
}

fn require(value: &str, what: &str) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        return Err(CoreError::InvalidArgument(format!("{what} must not be empty")));
    }
    Ok(())
}

fn require_cmd(cmd: &[String]) -> Result<(), CoreError> {
    if cmd.is_empty() {
        return Err(CoreError::InvalidArgument(
            "command must have at least one element".to_owned(),
        ));
    }
    Ok(())
}

/// Stop and remove a container the caller will never see. Failures are logged.
async fn discard(engine: &dyn EngineAdapter, container: &ContainerDescriptor) {
    if container.running {
        if let Err(e) = engine.stop(&container.id).await {
            warn!("cannot stop rejected container '{}': {e}", container.id);
        }
    }
    match engine.remove(&container.id).await {
        Ok(()) => info!("removed rejected container '{}'", container.id),
        Err(e) => warn!("cannot remove rejected container '{}': {e}", container.id),
    }
}

/// Engine-agnostic container lifecycle API.
///
/// Nothing reaches the engine before the readiness gate has passed. Mutating
/// operations emit their pre-hook after the gate and before the engine call,
/// and their post-hook once the engine call has succeeded.
pub struct EngineFacade {
    backends: BackendRegistry,
    registry: Arc<Registry>,
    hooks: Arc<HookPipeline>,
    gate: ReadinessGate,
    probe: Arc<dyn ReadinessProbe>,
    retry_delay: Duration,
    resolved: OnceCell<Resolved>,
}

impl EngineFacade {
    /// The hook pipeline is taken from `registry` under `events`, and
    /// published there when absent.
    pub fn new(backends: BackendRegistry, registry: Arc<Registry>) -> Self {
        let hooks = registry
            .lookup::<HookPipeline>(EVENTS_KEY)
            .unwrap_or_else(|| {
                let hooks = Arc::new(HookPipeline::new());
                registry.register(EVENTS_KEY, Arc::clone(&hooks));
                hooks
            });
        Self {
            backends,
            registry,
            hooks,
            gate: ReadinessGate::new(),
            probe: Arc::new(SettleDelay::default()),
            retry_delay: DEFAULT_RETRY_DELAY,
            resolved: OnceCell::new(),
        }
    }

    /// Built-in backends, a fresh registry, and the probe from `config`.
    pub fn from_config(config: &BerthConfig) -> Self {
        Self::new(BackendRegistry::with_builtins(), Arc::new(Registry::new()))
            .with_probe(config.readiness.probe())
    }

    #[must_use]
    pub fn with_probe(mut self, probe: Arc<dyn ReadinessProbe>) -> Self {
        self.probe = probe;
        self
    }

    /// Base pause between provider power attempts; attempt `n` waits `n` times this.
    #[must_use]
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn hooks(&self) -> &Arc<HookPipeline> {
        &self.hooks
    }

    pub fn readiness(&self) -> ReadinessStage {
        self.gate.stage()
    }

    pub fn probe_name(&self) -> &str {
        self.probe.name()
    }

    /// Name of the resolved provider, once `init` has succeeded.
    pub fn provider_name(&self) -> Option<&str> {
        self.resolved.get().map(|r| r.provider.name())
    }

    pub fn engine_name(&self) -> Option<&str> {
        self.resolved.get().map(|r| r.engine.name())
    }

    /// Resolve the engine named in `config` and publish its provider under
    /// `providerModule`. Only the first successful call has any effect.
    pub async fn init(&self, config: &BackendConfig) -> Result<(), CoreError> {
        if let Some(resolved) = self.resolved.get() {
            debug!(
                "engine '{}' already resolved; ignoring init for '{}'",
                resolved.engine.name(),
                config.engine
            );
            return Ok(());
        }
        self.resolved
            .get_or_try_init(|| async {
                let engine = self.backends.resolve(config)?;
                let provider = engine.provider_module();
                self.registry
                    .register(PROVIDER_MODULE_KEY, Arc::new(Arc::clone(&provider)));
                info!(
                    "resolved engine '{}' on provider '{}'",
                    engine.name(),
                    provider.name()
                );
                Ok::<_, CoreError>(Resolved { engine, provider })
            })
            .await?;
        Ok(())
    }

    fn resolved(&self) -> Result<&Resolved, CoreError> {
        self.resolved.get().ok_or(CoreError::NotInitialized)
    }

    /// The engine, after the readiness gate has passed.
    async fn ready(&self) -> Result<&dyn EngineAdapter, CoreError> {
        let resolved = self.resolved()?;
        self.gate
            .ensure_ready(resolved.provider.as_ref(), resolved.engine.as_ref())
            .await?;
        Ok(resolved.engine.as_ref())
    }

    /// Ask the provider directly. Does not consult or update the gate.
    pub async fn is_up(&self) -> Result<bool, CoreError> {
        let provider = &self.resolved()?.provider;
        provider.is_up().await.map_err(|source| CoreError::Provider {
            provider: provider.name().to_owned(),
            source,
        })
    }

    pub async fn up(&self, attempts: u32) -> Result<(), CoreError> {
        self.power(Power::Up, attempts).await
    }

    pub async fn down(&self, attempts: u32) -> Result<(), CoreError> {
        self.power(Power::Down, attempts).await
    }

    async fn power(&self, power: Power, attempts: u32) -> Result<(), CoreError> {
        if attempts == 0 {
            return Err(CoreError::InvalidArgument(
                "attempts must be at least 1".to_owned(),
            ));
        }
        let provider = self.resolved()?.provider.as_ref();
        self.gate.ensure_installed(provider).await?;

        let mut attempt = 1;
        loop {
            let result = match power {
                Power::Up => provider.up().await,
                Power::Down => provider.down().await,
            };
            match result {
                Ok(()) => {
                    info!("provider '{}' {power:?} after {attempt} attempt(s)", provider.name());
                    return Ok(());
                }
                Err(source) if attempt >= attempts => {
                    return Err(CoreError::Provider {
                        provider: provider.name().to_owned(),
                        source,
                    });
                }
                Err(e) => {
                    warn!(
                        "provider '{}' {power:?} attempt {attempt}/{attempts} failed: {e}",
                        provider.name()
                    );
                    tokio::time::sleep(self.retry_delay * attempt).await;
                    attempt += 1;
                }
            }
        }
    }

    pub async fn list(&self) -> Result<Vec<ContainerDescriptor>, CoreError> {
        let engine = self.ready().await?;
        Ok(engine.list(None).await?)
    }

    /// Containers labelled as belonging to `app`.
    pub async fn list_app(&self, app: &str) -> Result<Vec<ContainerDescriptor>, CoreError> {
        require(app, "app name")?;
        let engine = self.ready().await?;
        Ok(engine.list(Some(app)).await?)
    }

    /// Linear scan of `list()` by id or name. Not cached; the engine owns the set.
    pub async fn exists(&self, id: &str) -> Result<bool, CoreError> {
        require(id, "container id")?;
        let containers = self.list().await?;
        Ok(containers.iter().any(|c| c.matches(id)))
    }

    pub async fn inspect(&self, id: &str) -> Result<InspectRecord, CoreError> {
        require(id, "container id")?;
        let engine = self.ready().await?;
        let container = engine.get_ensure(id, "inspect").await?;
        Ok(engine.inspect(&container).await?)
    }

    pub async fn info(&self, id: &str) -> Result<InfoRecord, CoreError> {
        require(id, "container id")?;
        let engine = self.ready().await?;
        Ok(engine.info(id).await?)
    }

    pub async fn create(&self, mut options: CreateOptions) -> Result<ContainerDescriptor, CoreError> {
        let engine = self.ready().await?;
        self.hooks
            .emit(HookEvent::PreEngineCreate, &mut HookPayload::Create(&mut options))
            .await?;
        let container = engine.create(options).await?;
        info!("created container '{}' ({})", container.name, container.id);
        self.after_create(engine, &container).await?;
        Ok(container)
    }

    /// Fire `post-engine-create`. A container whose post-hook fails is torn
    /// down before the rejection is returned.
    async fn after_create(
        &self,
        engine: &dyn EngineAdapter,
        container: &ContainerDescriptor,
    ) -> Result<(), CoreError> {
        let result = self
            .hooks
            .emit(HookEvent::PostEngineCreate, &mut HookPayload::Created(container))
            .await;
        if result.is_err() {
            discard(engine, container).await;
        }
        result
    }

    /// Start with no options. Same as `start_with` given empty options.
    pub async fn start(&self, id: &str) -> Result<(), CoreError> {
        self.start_inner(id, None).await
    }

    pub async fn start_with(&self, id: &str, options: StartOptions) -> Result<(), CoreError> {
        self.start_inner(id, Some(options)).await
    }

    async fn start_inner(
        &self,
        id: &str,
        mut options: Option<StartOptions>,
    ) -> Result<(), CoreError> {
        require(id, "container id")?;
        let engine = self.ready().await?;
        self.hooks
            .emit(
                HookEvent::PreEngineStart,
                &mut HookPayload::Start {
                    id,
                    options: &mut options,
                },
            )
            .await?;
        engine.start(id, options).await?;
        self.probe.wait_ready(engine, id).await?;
        info!("started container '{id}'");
        self.hooks
            .emit(HookEvent::PostEngineStart, &mut HookPayload::Container { id })
            .await
    }

    pub async fn stop(&self, id: &str) -> Result<(), CoreError> {
        require(id, "container id")?;
        let engine = self.ready().await?;
        self.hooks
            .emit(HookEvent::PreEngineStop, &mut HookPayload::Container { id })
            .await?;
        engine.stop(id).await?;
        info!("stopped container '{id}'");
        self.hooks
            .emit(HookEvent::PostEngineStop, &mut HookPayload::Container { id })
            .await
    }

    pub async fn remove(&self, id: &str) -> Result<(), CoreError> {
        require(id, "container id")?;
        let engine = self.ready().await?;
        self.hooks
            .emit(HookEvent::PreEngineRemove, &mut HookPayload::Container { id })
            .await?;
        engine.remove(id).await?;
        info!("removed container '{id}'");
        self.hooks
            .emit(HookEvent::PostEngineRemove, &mut HookPayload::Container { id })
            .await
    }

    pub async fn build(&self, image: &ImageSpec) -> Result<(), CoreError> {
        require(&image.name, "image name")?;
        let engine = self.ready().await?;
        self.hooks
            .emit(HookEvent::PreEngineBuild, &mut HookPayload::Build(image))
            .await?;
        engine.build(image).await?;
        info!("built image '{}'", image.name);
        self.hooks
            .emit(HookEvent::PostEngineBuild, &mut HookPayload::Build(image))
            .await
    }

    /// Create and start a container from `image`, streaming `stdin` into it
    /// and its output to `stdout`. Returns once streaming has begun.
    pub async fn run(
        &self,
        image: &str,
        cmd: &[String],
        create: CreateOptions,
        start: Option<StartOptions>,
        stdin: Option<InputSource>,
        stdout: OutputSink,
    ) -> Result<ContainerDescriptor, CoreError> {
        require(image, "image")?;
        require_cmd(cmd)?;
        let engine = self.ready().await?;
        let create = self.proposed(image, cmd, create).await?;
        let container = engine.run(image, cmd, stdin, stdout, create, start).await?;
        self.after_create(engine, &container).await?;
        Ok(container)
    }

    /// Like `run`, for a container that removes itself. `OnceRun::done`
    /// resolves after teardown.
    pub async fn once(
        &self,
        image: &str,
        cmd: &[String],
        create: CreateOptions,
        start: Option<StartOptions>,
        output: OutputSink,
    ) -> Result<OnceRun, CoreError> {
        require(image, "image")?;
        require_cmd(cmd)?;
        let engine = self.ready().await?;
        let create = self.proposed(image, cmd, create).await?;
        let run = engine.once(image, cmd, create, start, output).await?;
        let result = self
            .hooks
            .emit(HookEvent::PostEngineCreate, &mut HookPayload::Created(&run.container))
            .await;
        if let Err(e) = result {
            let OnceRun { container, done } = run;
            drop(done);
            discard(engine, &container).await;
            return Err(e);
        }
        Ok(run)
    }

    /// Fill in image and command, then let pre-create hooks see the result.
    async fn proposed(
        &self,
        image: &str,
        cmd: &[String],
        create: CreateOptions,
    ) -> Result<CreateOptions, CoreError> {
        let mut options = CreateOptions {
            image: Some(image.to_owned()),
            cmd: Some(cmd.to_vec()),
            ..create
        };
        self.hooks
            .emit(HookEvent::PreEngineCreate, &mut HookPayload::Create(&mut options))
            .await?;
        Ok(options)
    }

    /// Run `cmd` in container `id`, streaming into the given sinks.
    pub async fn query(
        &self,
        id: &str,
        cmd: &[String],
        stdout: &mut (dyn AsyncWrite + Send + Unpin),
        stderr: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<(), CoreError> {
        require(id, "container id")?;
        require_cmd(cmd)?;
        let engine = self.ready().await?;
        Ok(engine.exec_to(id, cmd, stdout, stderr).await?)
    }

    /// Run `cmd` in container `id` and return everything it printed.
    ///
    /// Output is buffered whole with no size limit; meant for small results.
    pub async fn query_data(&self, id: &str, cmd: &[String]) -> Result<String, CoreError> {
        require(id, "container id")?;
        require_cmd(cmd)?;
        let engine = self.ready().await?;
        let mut stream = engine.exec(id, cmd).await?;
        let mut data = Vec::new();
        while let Some(chunk) = stream.try_next().await? {
            data.extend_from_slice(&chunk);
        }
        Ok(String::from_utf8_lossy(&data).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use berth_runtime::mock::{MockEngine, MockProvider};

    fn facade_with(engine: Arc<MockEngine>) -> EngineFacade {
        let mut backends = BackendRegistry::new();
        backends.register("mock", move |_| Ok(engine.clone() as Arc<dyn EngineAdapter>));
        EngineFacade::new(backends, Arc::new(Registry::new()))
            .with_probe(Arc::new(SettleDelay::new(Duration::ZERO)))
            .with_retry_delay(Duration::ZERO)
    }

    async fn ready_facade() -> (EngineFacade, Arc<MockEngine>) {
        let engine = Arc::new(MockEngine::new());
        let facade = facade_with(engine.clone());
        facade.init(&BackendConfig::new("mock", "mock")).await.unwrap();
        (facade, engine)
    }

    #[tokio::test]
    async fn operations_before_init_fail() {
        let facade = facade_with(Arc::new(MockEngine::new()));
        assert!(matches!(facade.list().await, Err(CoreError::NotInitialized)));
        assert!(matches!(facade.up(1).await, Err(CoreError::NotInitialized)));
        assert!(facade.provider_name().is_none());
    }

    #[tokio::test]
    async fn init_publishes_provider_and_events() {
        let (facade, _engine) = ready_facade().await;
        assert_eq!(facade.provider_name(), Some("mock"));
        assert_eq!(facade.engine_name(), Some("mock"));
        assert_eq!(facade.registry().provider_module().unwrap().name(), "mock");
        assert!(facade.registry().lookup::<HookPipeline>(EVENTS_KEY).is_some());
        assert_eq!(facade.readiness(), ReadinessStage::Unchecked);
    }

    #[tokio::test]
    async fn init_unknown_engine_fails_and_can_be_retried() {
        let facade = facade_with(Arc::new(MockEngine::new()));
        let err = facade
            .init(&BackendConfig::new("lxc", "mock"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("lxc"));
        facade.init(&BackendConfig::new("mock", "mock")).await.unwrap();
        assert_eq!(facade.engine_name(), Some("mock"));
    }

    #[tokio::test]
    async fn second_init_is_a_no_op() {
        let (facade, engine) = ready_facade().await;
        facade
            .init(&BackendConfig::new("docker", "host"))
            .await
            .unwrap();
        assert_eq!(facade.engine_name(), Some("mock"));
        assert!(engine.calls().is_empty());
    }

    #[tokio::test]
    async fn invalid_arguments_never_reach_the_gate() {
        let (facade, engine) = ready_facade().await;
        let empty: Vec<String> = Vec::new();
        assert!(matches!(facade.info("").await, Err(CoreError::InvalidArgument(_))));
        assert!(matches!(facade.exists(" ").await, Err(CoreError::InvalidArgument(_))));
        assert!(matches!(
            facade.query_data("c1", &empty).await,
            Err(CoreError::InvalidArgument(_))
        ));
        assert!(matches!(facade.up(0).await, Err(CoreError::InvalidArgument(_))));
        assert_eq!(facade.readiness(), ReadinessStage::Unchecked);
        assert!(engine.calls().is_empty());
    }

    #[tokio::test]
    async fn up_and_down_drive_the_provider() {
        let provider = Arc::new(MockProvider::new());
        provider.set_running(false);
        let engine = Arc::new(MockEngine::with_provider(provider.clone()));
        let facade = facade_with(engine);
        facade.init(&BackendConfig::new("mock", "mock")).await.unwrap();

        assert!(!facade.is_up().await.unwrap());
        facade.up(3).await.unwrap();
        assert_eq!(provider.up_calls(), 1);
        assert!(facade.is_up().await.unwrap());

        facade.down(2).await.unwrap();
        assert_eq!(provider.down_calls(), 1);
        assert_eq!(facade.readiness(), ReadinessStage::Installed);
    }

    #[tokio::test]
    async fn up_reports_last_provider_error() {
        let provider = Arc::new(MockProvider::new());
        let engine = Arc::new(MockEngine::with_provider(provider.clone()));
        let facade = facade_with(engine);
        facade.init(&BackendConfig::new("mock", "mock")).await.unwrap();
        facade.up(1).await.unwrap();

        provider.set_installed(false);
        let err = facade.up(3).await.unwrap_err();
        assert!(matches!(err, CoreError::Provider { .. }));
        assert_eq!(provider.up_calls(), 4);
    }

    #[tokio::test]
    async fn stop_and_remove_fire_hooks_around_the_engine() {
        let (facade, engine) = ready_facade().await;
        engine.seed(ContainerDescriptor::new("c1", "web", true));
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        for event in [
            HookEvent::PreEngineStop,
            HookEvent::PostEngineStop,
            HookEvent::PreEngineRemove,
            HookEvent::PostEngineRemove,
        ] {
            let seen = Arc::clone(&seen);
            facade.hooks().register_fn(event, "trace", move |event, _| {
                seen.lock().unwrap().push(event.as_str());
                Ok(())
            });
        }

        facade.stop("c1").await.unwrap();
        facade.remove("web").await.unwrap();
        assert_eq!(
            *seen.lock().unwrap(),
            vec!["pre-engine-stop", "post-engine-stop", "pre-engine-remove", "post-engine-remove"]
        );
        assert_eq!(engine.calls(), vec!["init", "stop", "remove"]);
    }

    #[tokio::test]
    async fn inspect_resolves_by_name() {
        let (facade, engine) = ready_facade().await;
        engine.seed(ContainerDescriptor::new("c1", "web", false));
        let record = facade.inspect("web").await.unwrap();
        assert_eq!(record.0["id"], "c1");
        assert_eq!(engine.calls(), vec!["init", "get_ensure", "inspect"]);

        let err = facade.inspect("ghost").await.unwrap_err();
        assert_eq!(err.to_string(), "container 'ghost' not found (inspect)");
    }

    #[tokio::test]
    async fn build_rejected_by_hook_skips_engine() {
        let (facade, engine) = ready_facade().await;
        facade
            .hooks()
            .register_fn(HookEvent::PreEngineBuild, "freeze", |_, _| {
                Err("builds are frozen".into())
            });
        let spec = ImageSpec {
            name: "shop/web".to_owned(),
            context: ".".into(),
            dockerfile: None,
        };
        let err = facade.build(&spec).await.unwrap_err();
        assert!(matches!(err, CoreError::HookRejected { .. }));
        assert_eq!(engine.call_count("build"), 0);
    }

    #[tokio::test]
    async fn start_hook_can_supply_options() {
        let (facade, engine) = ready_facade().await;
        engine.seed(ContainerDescriptor::new("c1", "web", false));
        facade
            .hooks()
            .register_fn(HookEvent::PreEngineStart, "defaults", |_, payload| {
                if let HookPayload::Start { options, .. } = payload {
                    options.get_or_insert_with(StartOptions::default);
                }
                Ok(())
            });
        facade.start("c1").await.unwrap();
        assert!(engine.info("c1").await.unwrap().running);
    }
}
