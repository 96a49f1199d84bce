use crate::backend::{EngineAdapter, InputSource, OnceRun, OutputSink, OutputStream};
use crate::provider::ProviderAdapter;
use crate::types::{
    ContainerDescriptor, CreateOptions, EngineConfig, ImageSpec, InfoRecord, InspectRecord,
    StartOptions, APP_LABEL,
};
use crate::RuntimeError;
use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// In-memory provider with switchable answers and probe counters.
pub struct MockProvider {
    installed: AtomicBool,
    running: AtomicBool,
    config_fails: AtomicBool,
    latency: Option<Duration>,
    host: Option<String>,
    installed_checks: AtomicUsize,
    up_checks: AtomicUsize,
    config_calls: AtomicUsize,
    up_calls: AtomicUsize,
    down_calls: AtomicUsize,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self {
            installed: AtomicBool::new(true),
            running: AtomicBool::new(true),
            config_fails: AtomicBool::new(false),
            latency: None,
            host: None,
            installed_checks: AtomicUsize::new(0),
            up_checks: AtomicUsize::new(0),
            config_calls: AtomicUsize::new(0),
            up_calls: AtomicUsize::new(0),
            down_calls: AtomicUsize::new(0),
        }
    }
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads `installed`, `running` and `host` from backend options.
    pub fn from_options(options: &Map<String, Value>) -> Self {
        let flag = |key: &str| options.get(key).and_then(Value::as_bool).unwrap_or(true);
        let provider = Self::new();
        provider.set_installed(flag("installed"));
        provider.set_running(flag("running"));
        Self {
            host: options.get("host").and_then(Value::as_str).map(str::to_owned),
            ..provider
        }
    }

    /// Every probe and control call sleeps for `latency` first.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn set_installed(&self, installed: bool) {
        self.installed.store(installed, Ordering::SeqCst);
    }

    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
    }

    pub fn set_config_fails(&self, fails: bool) {
        self.config_fails.store(fails, Ordering::SeqCst);
    }

    pub fn installed_checks(&self) -> usize {
        self.installed_checks.load(Ordering::SeqCst)
    }

    pub fn up_checks(&self) -> usize {
        self.up_checks.load(Ordering::SeqCst)
    }

    pub fn config_calls(&self) -> usize {
        self.config_calls.load(Ordering::SeqCst)
    }

    pub fn up_calls(&self) -> usize {
        self.up_calls.load(Ordering::SeqCst)
    }

    pub fn down_calls(&self) -> usize {
        self.down_calls.load(Ordering::SeqCst)
    }

    async fn pause(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl ProviderAdapter for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn is_installed(&self) -> Result<bool, RuntimeError> {
        self.pause().await;
        self.installed_checks.fetch_add(1, Ordering::SeqCst);
        Ok(self.installed.load(Ordering::SeqCst))
    }

    async fn is_up(&self) -> Result<bool, RuntimeError> {
        self.pause().await;
        self.up_checks.fetch_add(1, Ordering::SeqCst);
        Ok(self.running.load(Ordering::SeqCst))
    }

    async fn engine_config(&self) -> Result<EngineConfig, RuntimeError> {
        self.pause().await;
        self.config_calls.fetch_add(1, Ordering::SeqCst);
        if self.config_fails.load(Ordering::SeqCst) {
            return Err(RuntimeError::ProviderControl(
                "mock configuration unavailable".to_owned(),
            ));
        }
        Ok(EngineConfig {
            host: Some(
                self.host
                    .clone()
                    .unwrap_or_else(|| "mock://localhost".to_owned()),
            ),
            options: Map::new(),
        })
    }

    async fn up(&self) -> Result<(), RuntimeError> {
        self.pause().await;
        self.up_calls.fetch_add(1, Ordering::SeqCst);
        if !self.installed.load(Ordering::SeqCst) {
            return Err(RuntimeError::ProviderControl(
                "cannot start a provider that is not installed".to_owned(),
            ));
        }
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn down(&self) -> Result<(), RuntimeError> {
        self.pause().await;
        self.down_calls.fetch_add(1, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
struct MockState {
    containers: Vec<ContainerDescriptor>,
    calls: Vec<String>,
    init_config: Option<EngineConfig>,
    next_id: u64,
    scripted_output: Option<Vec<Vec<u8>>>,
}

/// In-memory engine that records every call it receives.
pub struct MockEngine {
    provider: Arc<dyn ProviderAdapter>,
    state: Arc<Mutex<MockState>>,
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::with_provider(Arc::new(MockProvider::new()))
    }
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_provider(provider: Arc<dyn ProviderAdapter>) -> Self {
        Self {
            provider,
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Names of the engine operations invoked so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.snapshot().calls.clone()
    }

    pub fn call_count(&self, op: &str) -> usize {
        self.snapshot().calls.iter().filter(|c| *c == op).count()
    }

    pub fn init_config(&self) -> Option<EngineConfig> {
        self.snapshot().init_config.clone()
    }

    pub fn containers(&self) -> Vec<ContainerDescriptor> {
        self.snapshot().containers.clone()
    }

    /// Put a container straight into the table without recording a call.
    pub fn seed(&self, container: ContainerDescriptor) {
        self.snapshot().containers.push(container);
    }

    /// Make every exec produce exactly these chunks.
    pub fn script_output(&self, chunks: Vec<Vec<u8>>) {
        self.snapshot().scripted_output = Some(chunks);
    }

    fn snapshot(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn state(&self, op: &str) -> Result<MutexGuard<'_, MockState>, RuntimeError> {
        let mut state = self
            .state
            .lock()
            .map_err(|e| RuntimeError::ExecFailed(format!("mutex poisoned: {e}")))?;
        if state.init_config.is_none() {
            return Err(RuntimeError::NotInitialized);
        }
        state.calls.push(op.to_owned());
        Ok(state)
    }
}

impl MockState {
    fn find(&self, id: &str, reason: &str) -> Result<&ContainerDescriptor, RuntimeError> {
        self.containers
            .iter()
            .find(|c| c.matches(id))
            .ok_or_else(|| RuntimeError::ContainerNotFound {
                id: id.to_owned(),
                reason: reason.to_owned(),
            })
    }

    fn find_mut(
        &mut self,
        id: &str,
        reason: &str,
    ) -> Result<&mut ContainerDescriptor, RuntimeError> {
        self.containers
            .iter_mut()
            .find(|c| c.matches(id))
            .ok_or_else(|| RuntimeError::ContainerNotFound {
                id: id.to_owned(),
                reason: reason.to_owned(),
            })
    }

    fn create(&mut self, options: &CreateOptions) -> Result<ContainerDescriptor, RuntimeError> {
        let image = options
            .image
            .clone()
            .ok_or_else(|| RuntimeError::InvalidOptions("create requires an image".to_owned()))?;
        self.next_id += 1;
        let id = format!("{:064x}", self.next_id);
        let name = options
            .name
            .clone()
            .unwrap_or_else(|| format!("mock-{}", self.next_id));
        if self.containers.iter().any(|c| c.name == name) {
            return Err(RuntimeError::InvalidOptions(format!(
                "container name '{name}' is already in use"
            )));
        }

        let mut container = ContainerDescriptor::new(id, name, false);
        container
            .extra
            .insert("image".to_owned(), Value::String(image));
        container.extra.insert(
            "labels".to_owned(),
            serde_json::to_value(&options.labels)?,
        );
        if let Some(cmd) = &options.cmd {
            container
                .extra
                .insert("cmd".to_owned(), serde_json::to_value(cmd)?);
        }
        self.containers.push(container.clone());
        Ok(container)
    }

    fn start(&mut self, id: &str) -> Result<(), RuntimeError> {
        let container = self.find_mut(id, "start")?;
        if container.running {
            return Err(RuntimeError::AlreadyRunning(container.name.clone()));
        }
        container.running = true;
        Ok(())
    }

    fn remove(&mut self, id: &str) -> Result<ContainerDescriptor, RuntimeError> {
        let idx = self
            .containers
            .iter()
            .position(|c| c.matches(id))
            .ok_or_else(|| RuntimeError::ContainerNotFound {
                id: id.to_owned(),
                reason: "remove".to_owned(),
            })?;
        Ok(self.containers.remove(idx))
    }

    fn output_for(&self, cmd: &[String]) -> Vec<Vec<u8>> {
        if let Some(chunks) = &self.scripted_output {
            return chunks.clone();
        }
        match cmd.split_first() {
            Some((prog, args)) if prog == "echo" => vec![format!("{}\n", args.join(" ")).into()],
            _ => vec![format!("mock-exec: {}\n", cmd.join(" ")).into()],
        }
    }
}

fn app_of(container: &ContainerDescriptor) -> Option<&str> {
    container
        .extra
        .get("labels")
        .and_then(|labels| labels.get(APP_LABEL))
        .and_then(Value::as_str)
}

async fn write_chunks(
    sink: &mut (dyn AsyncWrite + Send + Unpin),
    chunks: &[Vec<u8>],
) -> Result<(), RuntimeError> {
    for chunk in chunks {
        sink.write_all(chunk).await?;
    }
    sink.flush().await?;
    Ok(())
}

#[async_trait]
impl EngineAdapter for MockEngine {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn init(&self, config: EngineConfig) -> Result<(), RuntimeError> {
        let mut state = self
            .state
            .lock()
            .map_err(|e| RuntimeError::ExecFailed(format!("mutex poisoned: {e}")))?;
        state.calls.push("init".to_owned());
        state.init_config = Some(config);
        Ok(())
    }

    async fn list(&self, app: Option<&str>) -> Result<Vec<ContainerDescriptor>, RuntimeError> {
        let state = self.state("list")?;
        Ok(state
            .containers
            .iter()
            .filter(|c| app.is_none() || app_of(c) == app)
            .cloned()
            .collect())
    }

    async fn info(&self, id: &str) -> Result<InfoRecord, RuntimeError> {
        let state = self.state("info")?;
        let container = state.find(id, "info")?;
        Ok(InfoRecord {
            id: container.id.clone(),
            name: container.name.clone(),
            image: container
                .extra
                .get("image")
                .and_then(Value::as_str)
                .map(str::to_owned),
            running: container.running,
            app: app_of(container).map(str::to_owned),
            extra: Map::new(),
        })
    }

    async fn inspect(&self, container: &ContainerDescriptor) -> Result<InspectRecord, RuntimeError> {
        let state = self.state("inspect")?;
        let current = state.find(&container.id, "inspect")?;
        Ok(InspectRecord(serde_json::to_value(current)?))
    }

    async fn get_ensure(
        &self,
        id: &str,
        reason: &str,
    ) -> Result<ContainerDescriptor, RuntimeError> {
        let state = self.state("get_ensure")?;
        state.find(id, reason).cloned()
    }

    async fn create(&self, options: CreateOptions) -> Result<ContainerDescriptor, RuntimeError> {
        self.state("create")?.create(&options)
    }

    async fn start(&self, id: &str, _options: Option<StartOptions>) -> Result<(), RuntimeError> {
        self.state("start")?.start(id)
    }

    async fn stop(&self, id: &str) -> Result<(), RuntimeError> {
        let mut state = self.state("stop")?;
        let container = state.find_mut(id, "stop")?;
        if !container.running {
            return Err(RuntimeError::NotRunning(container.name.clone()));
        }
        container.running = false;
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<(), RuntimeError> {
        self.state("remove")?.remove(id).map(|_| ())
    }

    async fn build(&self, image: &ImageSpec) -> Result<(), RuntimeError> {
        let _state = self.state("build")?;
        if image.name.is_empty() {
            return Err(RuntimeError::InvalidOptions(
                "image name must not be empty".to_owned(),
            ));
        }
        Ok(())
    }

    async fn exec(&self, id: &str, cmd: &[String]) -> Result<OutputStream, RuntimeError> {
        let state = self.state("exec")?;
        state.find(id, "exec")?;
        let chunks = state.output_for(cmd);
        Ok(futures::stream::iter(chunks.into_iter().map(Ok)).boxed())
    }

    async fn exec_to(
        &self,
        id: &str,
        cmd: &[String],
        stdout: &mut (dyn AsyncWrite + Send + Unpin),
        _stderr: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<(), RuntimeError> {
        let chunks = {
            let state = self.state("exec_to")?;
            state.find(id, "exec")?;
            state.output_for(cmd)
        };
        write_chunks(stdout, &chunks).await
    }

    async fn run(
        &self,
        image: &str,
        cmd: &[String],
        _stdin: Option<InputSource>,
        mut stdout: OutputSink,
        create: CreateOptions,
        _start: Option<StartOptions>,
    ) -> Result<ContainerDescriptor, RuntimeError> {
        let (container, chunks) = {
            let mut state = self.state("run")?;
            let options = CreateOptions {
                image: Some(image.to_owned()),
                cmd: Some(cmd.to_vec()),
                ..create
            };
            let container = state.create(&options)?;
            state.start(&container.id)?;
            (container, state.output_for(cmd))
        };
        write_chunks(stdout.as_mut(), &chunks).await?;
        Ok(ContainerDescriptor {
            running: true,
            ..container
        })
    }

    async fn once(
        &self,
        image: &str,
        cmd: &[String],
        create: CreateOptions,
        _start: Option<StartOptions>,
        mut output: OutputSink,
    ) -> Result<OnceRun, RuntimeError> {
        let (container, chunks) = {
            let mut state = self.state("once")?;
            let options = CreateOptions {
                image: Some(image.to_owned()),
                cmd: Some(cmd.to_vec()),
                ..create
            };
            let container = state.create(&options)?;
            state.start(&container.id)?;
            (container, state.output_for(cmd))
        };

        let shared = Arc::clone(&self.state);
        let id = container.id.clone();
        let done = async move {
            write_chunks(output.as_mut(), &chunks).await?;
            let mut state = shared
                .lock()
                .map_err(|e| RuntimeError::ExecFailed(format!("mutex poisoned: {e}")))?;
            state.remove(&id).map(|_| ())
        };

        Ok(OnceRun {
            container: ContainerDescriptor {
                running: true,
                ..container
            },
            done: Box::pin(done),
        })
    }

    fn provider_module(&self) -> Arc<dyn ProviderAdapter> {
        Arc::clone(&self.provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    async fn ready_engine() -> MockEngine {
        let engine = MockEngine::new();
        engine.init(EngineConfig::default()).await.unwrap();
        engine
    }

    #[tokio::test]
    async fn operations_before_init_fail() {
        let engine = MockEngine::new();
        let err = engine.list(None).await.unwrap_err();
        assert!(matches!(err, RuntimeError::NotInitialized));
        assert!(engine.calls().is_empty());
    }

    #[tokio::test]
    async fn mock_lifecycle() {
        let engine = ready_engine().await;
        let created = engine
            .create(CreateOptions::for_image("nginx").with_name("web"))
            .await
            .unwrap();
        assert!(!created.running);

        engine.start("web", None).await.unwrap();
        assert!(engine.info(&created.id).await.unwrap().running);
        assert!(engine.start("web", None).await.is_err());

        engine.stop("web").await.unwrap();
        assert!(engine.stop("web").await.is_err());

        engine.remove(&created.id).await.unwrap();
        assert!(engine.list(None).await.unwrap().is_empty());
        assert_eq!(
            engine.calls(),
            vec!["init", "create", "start", "info", "start", "stop", "stop", "remove", "list"]
        );
    }

    #[tokio::test]
    async fn list_filters_by_app_label() {
        let engine = ready_engine().await;
        engine
            .create(CreateOptions::for_image("redis").with_app("shop"))
            .await
            .unwrap();
        engine
            .create(CreateOptions::for_image("redis").with_app("blog"))
            .await
            .unwrap();

        assert_eq!(engine.list(None).await.unwrap().len(), 2);
        let shop = engine.list(Some("shop")).await.unwrap();
        assert_eq!(shop.len(), 1);
        assert_eq!(engine.info(&shop[0].id).await.unwrap().app.as_deref(), Some("shop"));
    }

    #[tokio::test]
    async fn get_ensure_reports_reason() {
        let engine = ready_engine().await;
        let err = engine.get_ensure("ghost", "inspect").await.unwrap_err();
        assert_eq!(err.to_string(), "container 'ghost' not found (inspect)");
    }

    #[tokio::test]
    async fn exec_echo_streams_arguments() {
        let engine = ready_engine().await;
        engine.seed(ContainerDescriptor::new("c1", "app", true));
        let cmd = vec!["echo".to_owned(), "hi".to_owned()];
        let chunks: Vec<Vec<u8>> = engine.exec("c1", &cmd).await.unwrap().try_collect().await.unwrap();
        assert_eq!(chunks, vec![b"hi\n".to_vec()]);
    }

    #[tokio::test]
    async fn once_removes_container_when_done() {
        let engine = ready_engine().await;
        let cmd = vec!["echo".to_owned(), "bye".to_owned()];
        let run = engine
            .once("alpine", &cmd, CreateOptions::default(), None, Box::new(tokio::io::sink()))
            .await
            .unwrap();
        assert!(run.container.running);
        assert_eq!(engine.containers().len(), 1);

        run.done.await.unwrap();
        assert!(engine.containers().is_empty());
    }

    #[tokio::test]
    async fn provider_toggles_and_counts() {
        let provider = MockProvider::new();
        provider.set_installed(false);
        assert!(!provider.is_installed().await.unwrap());
        assert!(provider.up().await.is_err());

        provider.set_installed(true);
        provider.set_running(false);
        provider.up().await.unwrap();
        assert!(provider.is_up().await.unwrap());
        assert_eq!(provider.installed_checks(), 1);
        assert_eq!(provider.up_checks(), 1);
        assert_eq!(provider.up_calls(), 2);
    }

    #[test]
    fn provider_reads_options() {
        let mut options = Map::new();
        options.insert("installed".to_owned(), Value::Bool(false));
        let provider = MockProvider::from_options(&options);
        assert!(!provider.installed.load(Ordering::SeqCst));
        assert!(provider.running.load(Ordering::SeqCst));
    }
}
