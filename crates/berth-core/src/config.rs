use crate::probe::{PollRunning, ReadinessProbe, SettleDelay};
use crate::CoreError;
use berth_runtime::BackendConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub const CONFIG_ENV: &str = "BERTH_CONFIG";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadinessStrategy {
    #[default]
    Delay,
    Poll,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessConfig {
    pub strategy: ReadinessStrategy,
    pub settle_delay_ms: u64,
    pub poll_interval_ms: u64,
    pub poll_timeout_ms: u64,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            strategy: ReadinessStrategy::Delay,
            settle_delay_ms: 2000,
            poll_interval_ms: 250,
            poll_timeout_ms: 30_000,
        }
    }
}

impl ReadinessConfig {
    pub fn probe(&self) -> Arc<dyn ReadinessProbe> {
        match self.strategy {
            ReadinessStrategy::Delay => {
                Arc::new(SettleDelay::new(Duration::from_millis(self.settle_delay_ms)))
            }
            ReadinessStrategy::Poll => Arc::new(PollRunning::new(
                Duration::from_millis(self.poll_interval_ms),
                Duration::from_millis(self.poll_timeout_ms),
            )),
        }
    }
}

/// Contents of `config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BerthConfig {
    pub up_attempts: u32,
    pub backend: BackendConfig,
    pub readiness: ReadinessConfig,
}

impl Default for BerthConfig {
    fn default() -> Self {
        Self {
            up_attempts: 3,
            backend: BackendConfig::default(),
            readiness: ReadinessConfig::default(),
        }
    }
}

impl BerthConfig {
    pub fn parse(input: &str) -> Result<Self, CoreError> {
        toml::from_str(input).map_err(|e| CoreError::Config(format!("invalid config: {e}")))
    }

    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Load from the first location in the lookup order, or defaults when
    /// nothing is there.
    pub fn load_default() -> Result<Self, CoreError> {
        match resolve_config_path(None) {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), CoreError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| CoreError::Config(format!("TOML serialization failed: {e}")))?;
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        std::io::Write::write_all(&mut tmp, content.as_bytes())?;
        tmp.persist(path).map_err(|e| CoreError::Io(e.error))?;
        Ok(())
    }
}

/// `~/.config/berth/config.toml`.
pub fn default_config_path() -> Result<PathBuf, CoreError> {
    let home = std::env::var("HOME").map_err(|_| CoreError::Config("HOME not set".to_owned()))?;
    Ok(PathBuf::from(home).join(".config/berth/config.toml"))
}

/// Explicit path, then `BERTH_CONFIG`, then the default location.
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(path));
    }
    default_config_path().ok()
}
