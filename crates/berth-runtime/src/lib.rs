//! Provider and engine backends for Berth.
//!
//! This crate defines the boundary the facade talks through: the
//! `ProviderAdapter` trait (the host that makes an engine available), the
//! `EngineAdapter` trait (container lifecycle on a concrete runtime), the
//! pass-through data model, and a name-keyed plugin registry. It ships a
//! docker CLI engine, a host provider, in-memory mock backends, and
//! prerequisite probing.

pub mod backend;
pub mod docker;
pub mod host;
pub mod mock;
pub mod prereq;
pub mod provider;
pub mod types;

pub use backend::{
    select_backend, BackendRegistry, EngineAdapter, InputSource, OnceRun, OutputSink,
    OutputStream,
};
pub use prereq::{check_docker_prereqs, format_missing, MissingPrereq};
pub use provider::{select_provider, ProviderAdapter};
pub use types::{
    BackendConfig, ContainerDescriptor, CreateOptions, EngineConfig, ImageSpec, InfoRecord,
    InspectRecord, ProviderDescriptor, StartOptions, APP_LABEL,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("runtime I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("backend '{0}' is not available on this system")]
    BackendUnavailable(String),
    #[error("container '{id}' not found ({reason})")]
    ContainerNotFound { id: String, reason: String },
    #[error("container id prefix '{id}' matches {matches} containers")]
    AmbiguousId { id: String, matches: usize },
    #[error("container '{0}' is not running")]
    NotRunning(String),
    #[error("container '{0}' is already running")]
    AlreadyRunning(String),
    #[error("`{command}` failed ({status}): {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },
    #[error("runtime execution failed: {0}")]
    ExecFailed(String),
    #[error("invalid options: {0}")]
    InvalidOptions(String),
    #[error("provider control failed: {0}")]
    ProviderControl(String),
    #[error("engine used before init")]
    NotInitialized,
    #[error("malformed engine output: {0}")]
    Parse(#[from] serde_json::Error),
}
