//! Data passed across the provider/engine boundary.
//!
//! Option structs are pass-through: the facade never interprets them beyond
//! their shape, and any field it does not know about is kept in `extra` and
//! forwarded to the backend untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Label that ties a container to the app it belongs to.
pub const APP_LABEL: &str = "io.berth.app";

/// Identifies the active provider. Fixed once a backend has been resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
    pub name: String,
}

/// A container as reported by the engine.
///
/// Only `id`, `name` and `running` carry meaning outside the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerDescriptor {
    pub id: String,
    pub name: String,
    pub running: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ContainerDescriptor {
    pub fn new(id: impl Into<String>, name: impl Into<String>, running: bool) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            running,
            extra: Map::new(),
        }
    }

    /// True if `ident` names this container by id or by name.
    pub fn matches(&self, ident: &str) -> bool {
        self.id == ident || self.name == ident
    }
}

/// Summary record returned by `info`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfoRecord {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub running: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The engine's full, unprocessed description of a container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InspectRecord(pub Value);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cmd: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CreateOptions {
    pub fn for_image(image: impl Into<String>) -> Self {
        Self {
            image: Some(image.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Tag the container as part of `app`.
    #[must_use]
    pub fn with_app(mut self, app: impl Into<String>) -> Self {
        self.labels.insert(APP_LABEL.to_owned(), app.into());
        self
    }

    pub fn app(&self) -> Option<&str> {
        self.labels.get(APP_LABEL).map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StartOptions {
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StartOptions {
    pub fn is_empty(&self) -> bool {
        self.extra.is_empty()
    }
}

/// What to build and what to call the result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSpec {
    pub name: String,
    pub context: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dockerfile: Option<PathBuf>,
}

/// Which plugins to resolve, and the options handed to both of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_engine")]
    pub engine: String,
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub options: Map<String, Value>,
}

fn default_engine() -> String {
    "docker".to_owned()
}

fn default_provider() -> String {
    "host".to_owned()
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            engine: default_engine(),
            provider: default_provider(),
            options: Map::new(),
        }
    }
}

impl BackendConfig {
    pub fn new(engine: &str, provider: &str) -> Self {
        Self {
            engine: engine.to_owned(),
            provider: provider.to_owned(),
            options: Map::new(),
        }
    }

    #[must_use]
    pub fn with_option(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.options.insert(key.to_owned(), value.into());
        self
    }

    pub fn option_str(&self, key: &str) -> Option<&str> {
        self.options.get(key).and_then(Value::as_str)
    }

    pub fn option_bool(&self, key: &str) -> Option<bool> {
        self.options.get(key).and_then(Value::as_bool)
    }
}

/// Connection parameters a provider hands to the engine's one-time `init`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default)]
    pub options: Map<String, Value>,
}
