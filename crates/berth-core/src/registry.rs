//! Named shared dependencies.
//!
//! The facade publishes what other collaborators need (the provider handle,
//! the hook pipeline) here instead of those collaborators importing it.

use berth_runtime::ProviderAdapter;
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// Key under which the resolved engine's provider is published.
pub const PROVIDER_MODULE_KEY: &str = "providerModule";

/// Key under which the facade's `HookPipeline` is published.
pub const EVENTS_KEY: &str = "events";

type Entry = Arc<dyn Any + Send + Sync>;

#[derive(Default)]
pub struct Registry {
    entries: RwLock<BTreeMap<String, Entry>>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("keys", &self.keys())
            .finish()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish `value` under `key`, replacing any previous entry.
    pub fn register<T: Any + Send + Sync>(&self, key: &str, value: Arc<T>) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_owned(), value);
    }

    /// The entry under `key`, if there is one and it has type `T`.
    pub fn lookup<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        let entry = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()?;
        entry.downcast::<T>().ok()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// The provider published under `providerModule` by `EngineFacade::init`.
    pub fn provider_module(&self) -> Option<Arc<dyn ProviderAdapter>> {
        self.lookup::<Arc<dyn ProviderAdapter>>(PROVIDER_MODULE_KEY)
            .map(|p| Arc::clone(&*p))
    }
}
