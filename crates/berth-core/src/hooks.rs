//! Ordered, vetoable hook points around mutating facade operations.

use crate::CoreError;
use async_trait::async_trait;
use berth_runtime::{ContainerDescriptor, CreateOptions, ImageSpec, StartOptions};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, warn};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HookEvent {
    PreEngineCreate,
    PostEngineCreate,
    PreEngineStart,
    PostEngineStart,
    PreEngineStop,
    PostEngineStop,
    PreEngineRemove,
    PostEngineRemove,
    PreEngineBuild,
    PostEngineBuild,
}

impl HookEvent {
    pub const ALL: [Self; 10] = [
        Self::PreEngineCreate,
        Self::PostEngineCreate,
        Self::PreEngineStart,
        Self::PostEngineStart,
        Self::PreEngineStop,
        Self::PostEngineStop,
        Self::PreEngineRemove,
        Self::PostEngineRemove,
        Self::PreEngineBuild,
        Self::PostEngineBuild,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::PreEngineCreate => "pre-engine-create",
            Self::PostEngineCreate => "post-engine-create",
            Self::PreEngineStart => "pre-engine-start",
            Self::PostEngineStart => "post-engine-start",
            Self::PreEngineStop => "pre-engine-stop",
            Self::PostEngineStop => "post-engine-stop",
            Self::PreEngineRemove => "pre-engine-remove",
            Self::PostEngineRemove => "post-engine-remove",
            Self::PreEngineBuild => "pre-engine-build",
            Self::PostEngineBuild => "post-engine-build",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.as_str() == name)
    }
}

impl fmt::Display for HookEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a hook sees. Create and start options are handed out mutably so a
/// pre-hook can adjust them before the engine does.
#[derive(Debug)]
pub enum HookPayload<'a> {
    Create(&'a mut CreateOptions),
    Created(&'a ContainerDescriptor),
    Start {
        id: &'a str,
        options: &'a mut Option<StartOptions>,
    },
    Container {
        id: &'a str,
    },
    Build(&'a ImageSpec),
}

#[async_trait]
pub trait Hook: Send + Sync {
    /// Returning an error vetoes the operation.
    async fn handle(&self, event: HookEvent, payload: &mut HookPayload<'_>)
        -> Result<(), BoxError>;
}

struct FnHook<F>(F);

#[async_trait]
impl<F> Hook for FnHook<F>
where
    F: Fn(HookEvent, &mut HookPayload<'_>) -> Result<(), BoxError> + Send + Sync,
{
    async fn handle(
        &self,
        event: HookEvent,
        payload: &mut HookPayload<'_>,
    ) -> Result<(), BoxError> {
        (self.0)(event, payload)
    }
}

type Handlers = Vec<(String, Arc<dyn Hook>)>;

#[derive(Default)]
pub struct HookPipeline {
    handlers: RwLock<BTreeMap<HookEvent, Handlers>>,
}

impl fmt::Debug for HookPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handlers = self.handlers.read().unwrap_or_else(PoisonError::into_inner);
        let mut map = f.debug_map();
        for (event, list) in handlers.iter() {
            let names: Vec<&str> = list.iter().map(|(n, _)| n.as_str()).collect();
            map.entry(&event.as_str(), &names);
        }
        map.finish()
    }
}

impl HookPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `hook` to the handlers for `event`. Handlers run in the order
    /// they were registered.
    pub fn register(&self, event: HookEvent, name: &str, hook: Arc<dyn Hook>) {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(event)
            .or_default()
            .push((name.to_owned(), hook));
    }

    pub fn register_fn<F>(&self, event: HookEvent, name: &str, f: F)
    where
        F: Fn(HookEvent, &mut HookPayload<'_>) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.register(event, name, Arc::new(FnHook(f)));
    }

    pub fn handler_count(&self, event: HookEvent) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&event)
            .map_or(0, Vec::len)
    }

    /// Run every handler for `event` in order. The first failure stops the
    /// rest and is returned as `HookRejected`.
    pub async fn emit(
        &self,
        event: HookEvent,
        payload: &mut HookPayload<'_>,
    ) -> Result<(), CoreError> {
        // Snapshot so handlers may register further hooks without deadlocking.
        let handlers: Handlers = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&event)
            .cloned()
            .unwrap_or_default();

        for (name, hook) in handlers {
            debug!("hook '{name}' handling {event}");
            if let Err(source) = hook.handle(event, payload).await {
                warn!("hook '{name}' rejected {event}: {source}");
                return Err(CoreError::HookRejected {
                    event,
                    hook: name,
                    source,
                });
            }
        }
        Ok(())
    }
}
