//! The dev loop: create the service, redeploy it on change, delete it on
//! interrupt.

mod interrupt;

pub use interrupt::{InterruptSender, Interrupts};

use crate::error::Result;
use crate::runtime::{CreateOptions, OutputMode, Runtime, Service, DEFAULT_RETRIES, LOCAL_KIND};
use crate::source::{self, Source};
use crate::watch::{IgnoreRules, OnChange, WatchAggregator, WatchHandle, DEFAULT_WINDOW};
use interrupt::InterruptCoordinator;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// What the operator asked to run.
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    /// Local path or remote reference.
    pub source: String,
    /// Directory relative sources are resolved against and the watched tree.
    pub work_dir: PathBuf,
    pub process_type: String,
    pub command: Option<String>,
    pub args: Option<String>,
    /// Platform the runtime will build for; `windows` escapes drive colons.
    pub target_os: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LifecycleSettings {
    pub retries: u32,
    pub output: OutputMode,
    /// Whether local sources are watched for changes.
    pub watch: bool,
    /// Coalescing window for bursts of changes.
    pub window: Duration,
    pub ignore: IgnoreRules,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            retries: DEFAULT_RETRIES,
            output: OutputMode::default(),
            watch: true,
            window: DEFAULT_WINDOW,
            ignore: IgnoreRules::default(),
        }
    }
}

/// Whether the service lives and dies with this command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    Local,
    Remote,
}

impl ExecutionMode {
    pub fn for_runtime(runtime: &dyn Runtime) -> Self {
        if runtime.kind() == LOCAL_KIND {
            ExecutionMode::Local
        } else {
            ExecutionMode::Remote
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Created,
    Running,
    Interrupted,
    Deleted,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Created => write!(f, "created"),
            RunState::Running => write!(f, "running"),
            RunState::Interrupted => write!(f, "interrupted"),
            RunState::Deleted => write!(f, "deleted"),
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Local mode: the service was deleted after an interrupt.
    Deleted,
    /// Remote mode: the service keeps running after the command returns.
    Detached,
}

pub struct LifecycleController {
    runtime: Arc<dyn Runtime>,
    settings: LifecycleSettings,
}

impl LifecycleController {
    pub fn new(runtime: Arc<dyn Runtime>, settings: LifecycleSettings) -> Self {
        Self { runtime, settings }
    }

    pub fn settings(&self) -> &LifecycleSettings {
        &self.settings
    }

    /// Build the descriptor for a resolved source.
    pub fn describe(source: &Source, request: &RunRequest) -> Service {
        let runtime_source = source::escape_for_os(
            &source.runtime_source(),
            request.target_os.as_deref(),
        );

        let mut service = Service::new(source.runtime_name(), runtime_source, &source.reference);
        service.process_type = request.process_type.trim().to_string();
        service.command = non_empty(request.command.as_deref());
        service.args = non_empty(request.args.as_deref());
        service
    }

    /// Run the full loop.
    ///
    /// Resolution and create failures are returned before anything else
    /// starts. In local mode this waits for an interrupt; in remote mode it
    /// returns as soon as the service is created.
    pub async fn run(&self, request: RunRequest, interrupts: Interrupts) -> Result<RunOutcome> {
        let source = source::resolve(&request.work_dir, &request.source)?;
        let service = Arc::new(Self::describe(&source, &request));

        let options = CreateOptions::default()
            .output(self.settings.output)
            .retries(self.settings.retries);

        tracing::info!(
            "Creating {} from {} on {} runtime",
            service,
            service.source,
            self.runtime.kind()
        );
        self.runtime.create(&service, options).await?;
        let mut state = RunState::Created;
        tracing::debug!("{} is {}", service, state);

        let mode = ExecutionMode::for_runtime(self.runtime.as_ref());
        if mode == ExecutionMode::Remote {
            tracing::info!("{} is running on the {} runtime", service, self.runtime.kind());
            return Ok(RunOutcome::Detached);
        }

        let watch = if source.local && self.settings.watch {
            self.start_watch(&request, &service)
        } else {
            None
        };

        // The coordinator owns the watch so it can stop it before deleting.
        let done = InterruptCoordinator::new(Arc::clone(&self.runtime), Arc::clone(&service))
            .watch(watch)
            .spawn(interrupts);

        state = RunState::Running;
        tracing::debug!("{} is {}", service, state);

        if done.await.is_err() {
            tracing::warn!("Interrupt coordinator exited before deleting {}", service);
        }
        state = RunState::Interrupted;
        tracing::debug!("{} is {}", service, state);

        state = RunState::Deleted;
        tracing::info!("{} {}", service, state);
        Ok(RunOutcome::Deleted)
    }

    fn start_watch(&self, request: &RunRequest, service: &Arc<Service>) -> Option<WatchHandle> {
        let runtime = Arc::clone(&self.runtime);
        let service = Arc::clone(service);

        let on_change: OnChange = Box::new(move || {
            let runtime = Arc::clone(&runtime);
            let service = Arc::clone(&service);
            Box::pin(async move {
                tracing::info!("Updating {}", service);
                if let Err(e) = runtime.update(&service).await {
                    tracing::error!("Failed to update {}: {}", service, e);
                }
            })
        });

        let aggregator = WatchAggregator::new(&request.work_dir)
            .ignore(self.settings.ignore.clone())
            .window(self.settings.window);

        match aggregator.start(on_change) {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::warn!("Live reload disabled: {}", e);
                None
            }
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
