//! Provider for an engine that runs directly on this host.
//!
//! There is no VM to boot: "installed" means the docker client answers,
//! "up" means the daemon answers. The daemon's lifecycle belongs to the
//! host's service manager, so `up` can only confirm and `down` is a no-op.

use crate::provider::ProviderAdapter;
use crate::types::EngineConfig;
use crate::RuntimeError;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

pub const DEFAULT_DOCKER_BIN: &str = "docker";

pub struct HostProvider {
    binary: String,
    host: Option<String>,
}

impl Default for HostProvider {
    fn default() -> Self {
        Self {
            binary: DEFAULT_DOCKER_BIN.to_owned(),
            host: std::env::var("DOCKER_HOST").ok(),
        }
    }
}

impl HostProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Honors `docker_bin` and `host` from backend options.
    pub fn from_options(options: &Map<String, Value>) -> Self {
        let defaults = Self::default();
        Self {
            binary: options
                .get("docker_bin")
                .and_then(Value::as_str)
                .map_or(defaults.binary, str::to_owned),
            host: options
                .get("host")
                .and_then(Value::as_str)
                .map(str::to_owned)
                .or(defaults.host),
        }
    }

    async fn probe(&self, args: &[&str]) -> Result<bool, RuntimeError> {
        let mut cmd = Command::new(&self.binary);
        cmd.args(args).stdout(Stdio::null()).stderr(Stdio::null());
        if let Some(host) = &self.host {
            cmd.env("DOCKER_HOST", host);
        }
        match cmd.status().await {
            Ok(status) => {
                debug!("{} {} -> {status}", self.binary, args.join(" "));
                Ok(status.success())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl ProviderAdapter for HostProvider {
    fn name(&self) -> &'static str {
        "docker-host"
    }

    async fn is_installed(&self) -> Result<bool, RuntimeError> {
        self.probe(&["--version"]).await
    }

    async fn is_up(&self) -> Result<bool, RuntimeError> {
        self.probe(&["info", "--format", "{{.ServerVersion}}"]).await
    }

    async fn engine_config(&self) -> Result<EngineConfig, RuntimeError> {
        let mut options = Map::new();
        options.insert(
            "docker_bin".to_owned(),
            Value::String(self.binary.clone()),
        );
        Ok(EngineConfig {
            host: self.host.clone(),
            options,
        })
    }

    async fn up(&self) -> Result<(), RuntimeError> {
        if self.is_up().await? {
            return Ok(());
        }
        Err(RuntimeError::ProviderControl(
            "the docker daemon on this host is not running; start it with your service manager \
             (e.g. `systemctl start docker`)"
                .to_owned(),
        ))
    }

    async fn down(&self) -> Result<(), RuntimeError> {
        info!("host provider does not manage the docker daemon; leaving it running");
        Ok(())
    }
}
