use crate::cli::RunArgs;
use crate::output::UserOutput;
use devloop::config::ProjectConfig;
use devloop::lifecycle::{Interrupts, LifecycleController, LifecycleSettings, RunOutcome, RunRequest};
use devloop::runtime::{
    DockerRuntime, DockerSettings, LocalRuntime, LocalSettings, Runtime, RuntimeKind,
    DEFAULT_RETRIES,
};
use devloop::watch::{IgnoreRules, DEFAULT_WINDOW};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Everything needed for one `run`, after merging flags, environment and
/// `devloop.yaml`.
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub runtime: RuntimeKind,
    pub request: RunRequest,
    pub lifecycle: LifecycleSettings,
    pub local: LocalSettings,
    pub docker: DockerSettings,
}

impl RunPlan {
    /// Flags (and their environment variables) win over the config file,
    /// which wins over defaults.
    pub fn new(
        source: String,
        work_dir: PathBuf,
        runtime: Option<RuntimeKind>,
        args: RunArgs,
        config: ProjectConfig,
    ) -> Self {
        let request = RunRequest {
            source,
            work_dir,
            process_type: args.process_type.or(config.process_type).unwrap_or_default(),
            command: args.command.or(config.command),
            args: args.args.or(config.args),
            target_os: args.target_os,
        };

        let lifecycle = LifecycleSettings {
            retries: args.retries.or(config.retries).unwrap_or(DEFAULT_RETRIES),
            output: args.output.unwrap_or_default(),
            watch: !args.no_watch,
            window: args.debounce.or(config.debounce).unwrap_or(DEFAULT_WINDOW),
            ignore: IgnoreRules::with_extra(config.ignore),
        };

        let mut local = LocalSettings::default();
        if let Some(window) = config.startup_window {
            local.startup_window = window;
        }
        if let Some(grace) = config.grace_period {
            local.grace_period = grace;
        }

        let mut docker = DockerSettings::default();
        if let Some(image) = args.image.or(config.docker.image) {
            docker.image = image;
        }
        if let Some(window) = config.startup_window {
            docker.startup_window = window;
        }

        Self {
            runtime: runtime.or(config.runtime).unwrap_or_default(),
            request,
            lifecycle,
            local,
            docker,
        }
    }

    fn build_runtime(&self) -> Arc<dyn Runtime> {
        match self.runtime {
            RuntimeKind::Local => Arc::new(LocalRuntime::new(self.local)),
            RuntimeKind::Docker => Arc::new(DockerRuntime::new(self.docker.clone())),
        }
    }
}

pub async fn run_service(
    source: String,
    work_dir: &Path,
    config_path: Option<&Path>,
    runtime: Option<RuntimeKind>,
    args: RunArgs,
    out: &dyn UserOutput,
) -> anyhow::Result<()> {
    let (config, loaded_from) = ProjectConfig::discover(work_dir, config_path)?;
    if let Some(path) = &loaded_from {
        out.status(&format!("Using {}", path.display()));
    }

    let plan = RunPlan::new(source, work_dir.to_path_buf(), runtime, args, config);
    if plan.runtime == RuntimeKind::Local && plan.docker.image != DockerSettings::default().image {
        out.warning("Ignoring docker image: the local runtime runs services directly");
    }

    let runtime = plan.build_runtime();
    let controller = LifecycleController::new(Arc::clone(&runtime), plan.lifecycle.clone());

    out.status(&format!(
        "Running {} on the {} runtime",
        plan.request.source, plan.runtime
    ));

    let interrupts = Interrupts::from_signals()?;
    match controller.run(plan.request, interrupts).await? {
        RunOutcome::Deleted => out.success("Service stopped"),
        RunOutcome::Detached => out.success(&format!(
            "Service started on the {} runtime and keeps running after devloop exits",
            runtime.kind()
        )),
    }

    Ok(())
}
