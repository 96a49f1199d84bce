//! Engine backend that drives the docker CLI.

use crate::backend::{EngineAdapter, InputSource, OnceRun, OutputSink, OutputStream};
use crate::host::DEFAULT_DOCKER_BIN;
use crate::provider::ProviderAdapter;
use crate::types::{
    ContainerDescriptor, CreateOptions, EngineConfig, ImageSpec, InfoRecord, InspectRecord,
    StartOptions, APP_LABEL,
};
use crate::RuntimeError;
use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, OnceLock};
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::process::{Child, ChildStdout, Command};
use tracing::{debug, warn};

const READ_CHUNK: usize = 8192;

pub struct DockerEngine {
    provider: Arc<dyn ProviderAdapter>,
    binary: String,
    host: OnceLock<Option<String>>,
}

/// One line of `docker ps --format '{{json .}}'`.
#[derive(Debug, Deserialize)]
struct PsLine {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Names")]
    names: String,
    #[serde(rename = "State", default)]
    state: String,
    #[serde(rename = "Image", default)]
    image: String,
    #[serde(rename = "Status", default)]
    status: String,
    #[serde(rename = "Labels", default)]
    labels: String,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_owned()).collect()
}

fn parse_labels(raw: &str) -> Map<String, Value> {
    raw.split(',')
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (k.to_owned(), Value::String(v.to_owned())))
        .collect()
}

fn parse_ps_line(line: &str) -> Result<ContainerDescriptor, RuntimeError> {
    let ps: PsLine = serde_json::from_str(line)?;
    let name = ps.names.split(',').next().unwrap_or_default().to_owned();
    let mut container = ContainerDescriptor::new(ps.id, name, ps.state == "running");
    container
        .extra
        .insert("image".to_owned(), Value::String(ps.image));
    container
        .extra
        .insert("status".to_owned(), Value::String(ps.status));
    container
        .extra
        .insert("labels".to_owned(), Value::Object(parse_labels(&ps.labels)));
    Ok(container)
}

fn info_from_inspect(doc: &Value) -> InfoRecord {
    let text = |ptr: &str| doc.pointer(ptr).and_then(Value::as_str).map(str::to_owned);
    let mut extra = Map::new();
    for (key, ptr) in [("created", "/Created"), ("status", "/State/Status")] {
        if let Some(v) = doc.pointer(ptr) {
            extra.insert(key.to_owned(), v.clone());
        }
    }
    InfoRecord {
        id: text("/Id").unwrap_or_default(),
        name: text("/Name")
            .map(|n| n.trim_start_matches('/').to_owned())
            .unwrap_or_default(),
        image: text("/Config/Image"),
        running: doc
            .pointer("/State/Running")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        app: doc
            .pointer("/Config/Labels")
            .and_then(|labels| labels.get(APP_LABEL))
            .and_then(Value::as_str)
            .map(str::to_owned),
        extra,
    }
}

/// Translate create options into `docker create` flags, ending with image and command.
fn create_args(options: &CreateOptions, interactive: bool) -> Result<Vec<String>, RuntimeError> {
    let image = options
        .image
        .as_deref()
        .ok_or_else(|| RuntimeError::InvalidOptions("create requires an image".to_owned()))?;

    let mut args = strings(&["create"]);
    if interactive {
        args.push("-i".to_owned());
    }
    if let Some(name) = &options.name {
        args.extend(["--name".to_owned(), name.clone()]);
    }
    for (k, v) in &options.env {
        args.extend(["-e".to_owned(), format!("{k}={v}")]);
    }
    for (k, v) in &options.labels {
        args.extend(["--label".to_owned(), format!("{k}={v}")]);
    }
    for port in &options.ports {
        args.extend(["-p".to_owned(), port.clone()]);
    }
    for volume in &options.volumes {
        args.extend(["-v".to_owned(), volume.clone()]);
    }
    if let Some(dir) = &options.working_dir {
        args.extend(["-w".to_owned(), dir.clone()]);
    }
    if !options.extra.is_empty() {
        let keys: Vec<&String> = options.extra.keys().collect();
        debug!("docker CLI has no flags for create options {keys:?}; not forwarded");
    }
    args.push(image.to_owned());
    if let Some(cmd) = &options.cmd {
        args.extend(cmd.iter().cloned());
    }
    Ok(args)
}

/// Exact id or name first, then a unique id prefix.
fn resolve_container(
    containers: Vec<ContainerDescriptor>,
    id: &str,
    reason: &str,
) -> Result<ContainerDescriptor, RuntimeError> {
    let (exact, rest): (Vec<_>, Vec<_>) = containers.into_iter().partition(|c| c.matches(id));
    if let Some(container) = exact.into_iter().next() {
        return Ok(container);
    }
    let mut prefixed: Vec<_> = rest.into_iter().filter(|c| c.id.starts_with(id)).collect();
    match prefixed.len() {
        0 => Err(RuntimeError::ContainerNotFound {
            id: id.to_owned(),
            reason: reason.to_owned(),
        }),
        1 => Ok(prefixed.remove(0)),
        matches => Err(RuntimeError::AmbiguousId {
            id: id.to_owned(),
            matches,
        }),
    }
}

fn note_start_options(options: Option<&StartOptions>) {
    if let Some(opts) = options.filter(|o| !o.is_empty()) {
        let keys: Vec<&String> = opts.extra.keys().collect();
        debug!("docker CLI has no flags for start options {keys:?}; not forwarded");
    }
}

impl DockerEngine {
    pub fn new(provider: Arc<dyn ProviderAdapter>, options: &Map<String, Value>) -> Self {
        Self {
            provider,
            binary: options
                .get("docker_bin")
                .and_then(Value::as_str)
                .unwrap_or(DEFAULT_DOCKER_BIN)
                .to_owned(),
            host: OnceLock::new(),
        }
    }

    fn command(&self, args: &[String]) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.args(args).kill_on_drop(true);
        if let Some(Some(host)) = self.host.get() {
            cmd.env("DOCKER_HOST", host);
        }
        cmd
    }

    fn describe(&self, args: &[String]) -> String {
        format!("{} {}", self.binary, args.join(" "))
    }

    fn failed(&self, args: &[String], status: ExitStatus, stderr: &[u8]) -> RuntimeError {
        RuntimeError::CommandFailed {
            command: self.describe(args),
            status: status.to_string(),
            stderr: String::from_utf8_lossy(stderr).trim().to_owned(),
        }
    }

    /// Run a docker command to completion and return its stdout.
    async fn docker(&self, args: &[String]) -> Result<String, RuntimeError> {
        debug!("running {}", self.describe(args));
        let output = self
            .command(args)
            .stdin(Stdio::null())
            .output()
            .await?;
        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            Err(self.failed(args, output.status, &output.stderr))
        }
    }

    async fn inspect_raw(&self, id: &str) -> Result<Value, RuntimeError> {
        let out = self
            .docker(&strings(&["inspect", "--type", "container", id]))
            .await?;
        let docs: Vec<Value> = serde_json::from_str(&out)?;
        docs.into_iter()
            .next()
            .ok_or_else(|| RuntimeError::ContainerNotFound {
                id: id.to_owned(),
                reason: "inspect".to_owned(),
            })
    }

    async fn create_container(
        &self,
        options: &CreateOptions,
        interactive: bool,
    ) -> Result<ContainerDescriptor, RuntimeError> {
        let args = create_args(options, interactive)?;
        let id = self.docker(&args).await?.trim().to_owned();
        let name = options
            .name
            .clone()
            .unwrap_or_else(|| id.chars().take(12).collect());
        let mut container = ContainerDescriptor::new(id, name, false);
        if let Some(image) = &options.image {
            container
                .extra
                .insert("image".to_owned(), Value::String(image.clone()));
        }
        Ok(container)
    }

    /// `rm -f -v`, logging instead of failing. Used on error paths.
    async fn force_remove(&self, id: &str) {
        if let Err(e) = self.docker(&strings(&["rm", "-f", "-v", id])).await {
            warn!("cannot remove container '{id}': {e}");
        }
    }

    /// `attach`, removing the freshly created container if it cannot be started.
    async fn attach_created(
        &self,
        id: &str,
        interactive: bool,
    ) -> Result<(Child, ChildStdout, Vec<String>), RuntimeError> {
        match self.attach(id, interactive) {
            Ok(attached) => Ok(attached),
            Err(e) => {
                self.force_remove(id).await;
                Err(e)
            }
        }
    }

    /// Start `id` attached, returning the child with its stdout piped.
    fn attach(
        &self,
        id: &str,
        interactive: bool,
    ) -> Result<(Child, ChildStdout, Vec<String>), RuntimeError> {
        let mut args = strings(&["start", "-a"]);
        if interactive {
            args.push("-i".to_owned());
        }
        args.push(id.to_owned());
        debug!("running {}", self.describe(&args));

        let mut child = self
            .command(&args)
            .stdin(if interactive {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RuntimeError::ExecFailed("container stdout not captured".to_owned()))?;
        Ok((child, stdout, args))
    }
}

struct ExecReader {
    child: Child,
    stdout: ChildStdout,
    command: String,
}

#[async_trait]
impl EngineAdapter for DockerEngine {
    fn name(&self) -> &'static str {
        "docker"
    }

    async fn init(&self, config: EngineConfig) -> Result<(), RuntimeError> {
        if self.host.set(config.host.clone()).is_err() {
            debug!("docker engine already initialized; ignoring new configuration");
        }
        let version = self
            .docker(&strings(&["version", "--format", "{{.Server.Version}}"]))
            .await?;
        debug!(
            "docker engine initialized (server {}, host {})",
            version.trim(),
            config.host.as_deref().unwrap_or("default")
        );
        Ok(())
    }

    async fn list(&self, app: Option<&str>) -> Result<Vec<ContainerDescriptor>, RuntimeError> {
        let mut args = strings(&["ps", "-a", "--no-trunc", "--format", "{{json .}}"]);
        if let Some(app) = app {
            args.extend(["--filter".to_owned(), format!("label={APP_LABEL}={app}")]);
        }
        let out = self.docker(&args).await?;
        out.lines()
            .filter(|l| !l.trim().is_empty())
            .map(parse_ps_line)
            .collect()
    }

    async fn info(&self, id: &str) -> Result<InfoRecord, RuntimeError> {
        let doc = self.inspect_raw(id).await?;
        Ok(info_from_inspect(&doc))
    }

    async fn inspect(&self, container: &ContainerDescriptor) -> Result<InspectRecord, RuntimeError> {
        Ok(InspectRecord(self.inspect_raw(&container.id).await?))
    }

    async fn get_ensure(
        &self,
        id: &str,
        reason: &str,
    ) -> Result<ContainerDescriptor, RuntimeError> {
        let containers = self.list(None).await?;
        resolve_container(containers, id, reason)
    }

    async fn create(&self, options: CreateOptions) -> Result<ContainerDescriptor, RuntimeError> {
        self.create_container(&options, false).await
    }

    async fn start(&self, id: &str, options: Option<StartOptions>) -> Result<(), RuntimeError> {
        note_start_options(options.as_ref());
        self.docker(&strings(&["start", id])).await.map(|_| ())
    }

    async fn stop(&self, id: &str) -> Result<(), RuntimeError> {
        self.docker(&strings(&["stop", id])).await.map(|_| ())
    }

    async fn remove(&self, id: &str) -> Result<(), RuntimeError> {
        self.docker(&strings(&["rm", "-v", id])).await.map(|_| ())
    }

    async fn build(&self, image: &ImageSpec) -> Result<(), RuntimeError> {
        let mut args = strings(&["build", "-t", &image.name]);
        if let Some(file) = &image.dockerfile {
            args.extend(["-f".to_owned(), file.to_string_lossy().into_owned()]);
        }
        args.push(image.context.to_string_lossy().into_owned());
        self.docker(&args).await.map(|_| ())
    }

    async fn exec(&self, id: &str, cmd: &[String]) -> Result<OutputStream, RuntimeError> {
        let mut args = strings(&["exec", id]);
        args.extend(cmd.iter().cloned());
        debug!("running {}", self.describe(&args));

        let mut child = self
            .command(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RuntimeError::ExecFailed("exec stdout not captured".to_owned()))?;
        let reader = ExecReader {
            child,
            stdout,
            command: self.describe(&args),
        };

        let stream = futures::stream::unfold(Some(reader), |state| async move {
            let mut reader = state?;
            let mut buf = vec![0u8; READ_CHUNK];
            match reader.stdout.read(&mut buf).await {
                Ok(0) => match reader.child.wait().await {
                    Ok(status) if status.success() => None,
                    Ok(status) => Some((
                        Err(RuntimeError::CommandFailed {
                            command: reader.command,
                            status: status.to_string(),
                            stderr: String::new(),
                        }),
                        None,
                    )),
                    Err(e) => Some((Err(e.into()), None)),
                },
                Ok(n) => {
                    buf.truncate(n);
                    Some((Ok(buf), Some(reader)))
                }
                Err(e) => Some((Err(e.into()), None)),
            }
        });
        Ok(stream.boxed())
    }

    async fn exec_to(
        &self,
        id: &str,
        cmd: &[String],
        stdout: &mut (dyn AsyncWrite + Send + Unpin),
        stderr: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<(), RuntimeError> {
        let mut args = strings(&["exec", id]);
        args.extend(cmd.iter().cloned());
        debug!("running {}", self.describe(&args));

        let mut child = self
            .command(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;
        let mut child_out = child
            .stdout
            .take()
            .ok_or_else(|| RuntimeError::ExecFailed("exec stdout not captured".to_owned()))?;
        let mut child_err = child
            .stderr
            .take()
            .ok_or_else(|| RuntimeError::ExecFailed("exec stderr not captured".to_owned()))?;

        tokio::try_join!(
            tokio::io::copy(&mut child_out, &mut *stdout),
            tokio::io::copy(&mut child_err, &mut *stderr),
        )?;
        stdout.flush().await?;
        stderr.flush().await?;

        let status = child.wait().await?;
        if status.success() {
            Ok(())
        } else {
            Err(self.failed(&args, status, b""))
        }
    }

    async fn run(
        &self,
        image: &str,
        cmd: &[String],
        stdin: Option<InputSource>,
        mut stdout: OutputSink,
        create: CreateOptions,
        start: Option<StartOptions>,
    ) -> Result<ContainerDescriptor, RuntimeError> {
        note_start_options(start.as_ref());
        let options = CreateOptions {
            image: Some(image.to_owned()),
            cmd: Some(cmd.to_vec()),
            ..create
        };
        let interactive = stdin.is_some();
        let container = self.create_container(&options, interactive).await?;
        let (mut child, mut child_out, args) =
            self.attach_created(&container.id, interactive).await?;
        let child_in = child.stdin.take();
        let command = self.describe(&args);

        tokio::spawn(async move {
            let pump_in = async {
                if let (Some(mut src), Some(mut dst)) = (stdin, child_in) {
                    tokio::io::copy(&mut src, &mut dst).await?;
                    dst.shutdown().await?;
                }
                Ok::<_, std::io::Error>(())
            };
            let pump_out = async {
                tokio::io::copy(&mut child_out, &mut stdout).await?;
                stdout.flush().await
            };
            if let Err(e) = tokio::try_join!(pump_in, pump_out) {
                warn!("streaming for `{command}` failed: {e}");
            }
            match child.wait().await {
                Ok(status) if !status.success() => warn!("`{command}` exited with {status}"),
                Ok(_) => {}
                Err(e) => warn!("waiting for `{command}` failed: {e}"),
            }
        });

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
        start: Option<StartOptions>,
        mut output: OutputSink,
    ) -> Result<OnceRun, RuntimeError> {
        note_start_options(start.as_ref());
        let options = CreateOptions {
            image: Some(image.to_owned()),
            cmd: Some(cmd.to_vec()),
            ..create
        };
        let container = self.create_container(&options, false).await?;
        let (mut child, mut child_out, args) = self.attach_created(&container.id, false).await?;
        let command = self.describe(&args);

        let rm_args = strings(&["rm", "-f", "-v", &container.id]);
        let rm_command = self.describe(&rm_args);
        let mut rm = self.command(&rm_args);

        // The container is removed whatever happens to the stream; the first
        // error is reported after that.
        let done = async move {
            let streamed = async {
                tokio::io::copy(&mut child_out, &mut output).await?;
                output.flush().await
            }
            .await;
            drop(child_out);
            if streamed.is_err() {
                if let Err(e) = child.start_kill() {
                    debug!("cannot kill `{command}`: {e}");
                }
            }
            let status = child.wait().await;
            let removed = rm.stdin(Stdio::null()).output().await;

            streamed?;
            let status = status?;
            let removed = removed?;
            if !status.success() {
                return Err(RuntimeError::CommandFailed {
                    command,
                    status: status.to_string(),
                    stderr: String::new(),
                });
            }
            if !removed.status.success() {
                return Err(RuntimeError::CommandFailed {
                    command: rm_command,
                    status: removed.status.to_string(),
                    stderr: String::from_utf8_lossy(&removed.stderr).trim().to_owned(),
                });
            }
            Ok(())
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

    #[test]
    fn ps_line_parses_into_descriptor() {
        let line = r#"{"ID":"4f1c","Names":"shop_web_1","State":"running","Image":"nginx:1.25","Status":"Up 3 minutes","Labels":"io.berth.app=shop,tier=web"}"#;
        let c = parse_ps_line(line).unwrap();
        assert_eq!(c.id, "4f1c");
        assert_eq!(c.name, "shop_web_1");
        assert!(c.running);
        assert_eq!(c.extra["labels"][APP_LABEL], "shop");
        assert_eq!(c.extra["labels"]["tier"], "web");
    }

    #[test]
    fn ps_line_for_exited_container() {
        let line = r#"{"ID":"9a","Names":"tmp","State":"exited","Labels":""}"#;
        let c = parse_ps_line(line).unwrap();
        assert!(!c.running);
        assert!(c.extra["labels"].as_object().unwrap().is_empty());
    }

    #[test]
    fn inspect_document_maps_to_info() {
        let doc = serde_json::json!({
            "Id": "abc",
            "Name": "/shop_db_1",
            "Created": "2024-05-01T10:00:00Z",
            "State": {"Running": false, "Status": "exited"},
            "Config": {"Image": "postgres:16", "Labels": {"io.berth.app": "shop"}}
        });
        let info = info_from_inspect(&doc);
        assert_eq!(info.name, "shop_db_1");
        assert_eq!(info.image.as_deref(), Some("postgres:16"));
        assert_eq!(info.app.as_deref(), Some("shop"));
        assert!(!info.running);
        assert_eq!(info.extra["status"], "exited");
    }

    #[test]
    fn create_args_order() {
        let mut opts = CreateOptions::for_image("nginx").with_name("web").with_app("shop");
        opts.ports.push("8080:80".to_owned());
        opts.cmd = Some(vec!["nginx".to_owned(), "-g".to_owned(), "daemon off;".to_owned()]);
        let args = create_args(&opts, true).unwrap();
        assert_eq!(
            args,
            vec![
                "create", "-i", "--name", "web", "--label", "io.berth.app=shop", "-p",
                "8080:80", "nginx", "nginx", "-g", "daemon off;"
            ]
        );
    }

    fn listed(ids: &[(&str, &str)]) -> Vec<ContainerDescriptor> {
        ids.iter()
            .map(|(id, name)| ContainerDescriptor::new(*id, *name, true))
            .collect()
    }

    #[test]
    fn exact_name_beats_id_prefix() {
        let containers = listed(&[("web1234", "api"), ("9f00", "web")]);
        let c = resolve_container(containers, "web", "inspect").unwrap();
        assert_eq!(c.id, "9f00");
    }

    #[test]
    fn unique_id_prefix_resolves() {
        let containers = listed(&[("4f1c00", "web"), ("9a2b00", "db")]);
        let c = resolve_container(containers, "9a", "inspect").unwrap();
        assert_eq!(c.name, "db");
    }

    #[test]
    fn ambiguous_id_prefix_is_rejected() {
        let containers = listed(&[("4f1c00", "web"), ("4f2d00", "db")]);
        let err = resolve_container(containers, "4f", "inspect").unwrap_err();
        assert!(matches!(err, RuntimeError::AmbiguousId { matches: 2, .. }));
        assert_eq!(
            err.to_string(),
            "container id prefix '4f' matches 2 containers"
        );
    }

    #[test]
    fn unknown_id_reports_reason() {
        let err = resolve_container(listed(&[("4f1c", "web")]), "zz", "stop").unwrap_err();
        assert_eq!(err.to_string(), "container 'zz' not found (stop)");
    }

    #[cfg(unix)]
    struct BrokenSink;

    #[cfg(unix)]
    impl AsyncWrite for BrokenSink {
        fn poll_write(
            self: std::pin::Pin<&mut Self>,
            _: &mut std::task::Context<'_>,
            _: &[u8],
        ) -> std::task::Poll<std::io::Result<usize>> {
            std::task::Poll::Ready(Err(std::io::ErrorKind::BrokenPipe.into()))
        }

        fn poll_flush(
            self: std::pin::Pin<&mut Self>,
            _: &mut std::task::Context<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::task::Poll::Ready(Ok(()))
        }

        fn poll_shutdown(
            self: std::pin::Pin<&mut Self>,
            _: &mut std::task::Context<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::task::Poll::Ready(Ok(()))
        }
    }

    /// A stand-in `docker` that logs its arguments and prints output on `start`.
    #[cfg(unix)]
    fn fake_docker(dir: &std::path::Path) -> (std::path::PathBuf, std::path::PathBuf) {
        use std::os::unix::fs::PermissionsExt;

        let log = dir.join("calls.log");
        let bin = dir.join("docker");
        std::fs::write(
            &bin,
            format!(
                "#!/bin/sh\n\
                 echo \"$@\" >> '{}'\n\
                 case \"$1\" in\n\
                 create) echo c0ffee ;;\n\
                 start) i=0; while [ $i -lt 500 ]; do echo \"line $i\"; i=$((i+1)); done ;;\n\
                 esac\n",
                log.display()
            ),
        )
        .unwrap();
        std::fs::set_permissions(&bin, std::fs::Permissions::from_mode(0o755)).unwrap();
        (bin, log)
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn once_removes_container_when_output_fails() {
        let dir = tempfile::tempdir().unwrap();
        let (bin, log) = fake_docker(dir.path());
        let mut options = Map::new();
        options.insert(
            "docker_bin".to_owned(),
            Value::String(bin.to_string_lossy().into_owned()),
        );
        let engine = DockerEngine::new(Arc::new(crate::mock::MockProvider::new()), &options);

        let run = engine
            .once(
                "alpine",
                &["yes".to_owned()],
                CreateOptions::default(),
                None,
                Box::new(BrokenSink),
            )
            .await
            .unwrap();
        assert_eq!(run.container.id, "c0ffee");

        let err = run.done.await.unwrap_err();
        assert!(matches!(err, RuntimeError::Io(_)), "unexpected error: {err}");
        let calls = std::fs::read_to_string(&log).unwrap();
        assert!(calls.lines().any(|l| l == "rm -f -v c0ffee"), "calls: {calls}");
    }

    #[test]
    fn create_args_require_image() {
        let err = create_args(&CreateOptions::default(), false).unwrap_err();
        assert!(matches!(err, RuntimeError::InvalidOptions(_)));
    }
}
