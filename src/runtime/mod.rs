//! Runtime abstraction.
//!
//! A [`Runtime`] knows where and how a service executes. The lifecycle
//! controller only ever talks to this trait:
//!
//! - [`LocalRuntime`]: runs the service as a child process owned by devloop
//! - [`DockerRuntime`]: runs the service in a detached container that
//!   outlives the command
//!
//! # Example
//!
//! ```ignore
//! use devloop::runtime::{CreateOptions, Runtime, Service};
//!
//! async fn deploy(runtime: &dyn Runtime, service: &Service) -> devloop::Result<()> {
//!     runtime.create(service, CreateOptions::default().retries(3)).await?;
//!     runtime.update(service).await
//! }
//! ```

mod docker;
mod launcher;
mod local;

pub use docker::{DockerRuntime, DockerSettings};
pub use launcher::{LaunchPlan, Launcher};
pub use local::{LocalRuntime, LocalSettings};

use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;

/// Kind reported by runtimes that execute services as local child processes.
pub const LOCAL_KIND: &str = "local";

/// Default create attempt budget.
pub const DEFAULT_RETRIES: u32 = 3;

/// Descriptor of the supervised service.
///
/// Built once per invocation and passed by reference into every runtime call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Service {
    pub name: String,
    /// Build source: an absolute directory or a `repo[/folder]` reference.
    pub source: String,
    /// Ref or tag being run.
    pub version: String,
    pub metadata: HashMap<String, String>,
    /// Runtime specific process type; empty means the runtime default.
    pub process_type: String,
    /// Entry command override.
    pub command: Option<String>,
    /// Entry argument override.
    pub args: Option<String>,
}

impl Service {
    pub fn new(
        name: impl Into<String>,
        source: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            version: version.into(),
            ..Default::default()
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

/// Where build and runtime output of the service goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputMode {
    /// Inherit devloop's stdout/stderr.
    #[default]
    Passthrough,
    /// Discard output.
    Quiet,
}

impl OutputMode {
    pub fn is_passthrough(&self) -> bool {
        matches!(self, OutputMode::Passthrough)
    }
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputMode::Passthrough => write!(f, "passthrough"),
            OutputMode::Quiet => write!(f, "quiet"),
        }
    }
}

/// Options for [`Runtime::create`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateOptions {
    pub output: OutputMode,
    /// Attempt budget; the runtime decides how attempts are spent. Zero still
    /// makes one attempt.
    pub retries: u32,
}

impl Default for CreateOptions {
    fn default() -> Self {
        Self {
            output: OutputMode::default(),
            retries: DEFAULT_RETRIES,
        }
    }
}

impl CreateOptions {
    pub fn output(mut self, output: OutputMode) -> Self {
        self.output = output;
        self
    }

    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Number of attempts a runtime should make.
    pub fn attempts(&self) -> u32 {
        self.retries.max(1)
    }
}

/// Where and how a service executes.
#[async_trait]
pub trait Runtime: Send + Sync {
    /// Build and start the service, making up to `options.attempts()` tries.
    async fn create(&self, service: &Service, options: CreateOptions) -> Result<()>;

    /// Redeploy a running service from its source.
    async fn update(&self, service: &Service) -> Result<()>;

    /// Stop and remove the service. Deleting an unknown service is not an error.
    async fn delete(&self, service: &Service) -> Result<()>;

    /// Short identifier of the runtime, e.g. `"local"` or `"docker"`.
    fn kind(&self) -> &str;
}

/// Runtime selection from CLI or config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeKind {
    #[default]
    Local,
    Docker,
}

impl fmt::Display for RuntimeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeKind::Local => write!(f, "local"),
            RuntimeKind::Docker => write!(f, "docker"),
        }
    }
}
