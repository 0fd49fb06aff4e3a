//! Local process runtime.
//!
//! Each service runs as a child process in its own process group, started in
//! the service's source directory. Stopping sends SIGTERM to the whole group,
//! waits for the grace period, then escalates to SIGKILL.

use super::{CreateOptions, LaunchPlan, OutputMode, Runtime, Service, LOCAL_KIND};
use crate::error::{Error, Result};
use async_trait::async_trait;
use nix::sys::signal::{self, killpg, Signal};
use nix::unistd::Pid;
use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;

/// Tunables for [`LocalRuntime`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalSettings {
    /// A process that exits with a failure status inside this window counts
    /// as a failed attempt.
    pub startup_window: Duration,
    /// Time between SIGTERM and SIGKILL.
    pub grace_period: Duration,
    /// Base delay between create attempts; attempt `n` waits `n * retry_backoff`.
    pub retry_backoff: Duration,
}

impl Default for LocalSettings {
    fn default() -> Self {
        Self {
            startup_window: Duration::from_secs(1),
            grace_period: Duration::from_secs(5),
            retry_backoff: Duration::from_millis(500),
        }
    }
}

struct ManagedProcess {
    child: Child,
    output: OutputMode,
}

/// Runs services as child processes of devloop.
pub struct LocalRuntime {
    settings: LocalSettings,
    /// Serializes create/update/delete; held across awaits.
    processes: Mutex<HashMap<String, ManagedProcess>>,
}

impl LocalRuntime {
    pub fn new(settings: LocalSettings) -> Self {
        Self {
            settings,
            processes: Mutex::new(HashMap::new()),
        }
    }

    /// Whether a process is currently recorded for `name` and still alive.
    pub async fn is_running(&self, name: &str) -> bool {
        let mut processes = self.processes.lock().await;
        match processes.get_mut(name) {
            Some(managed) => matches!(managed.child.try_wait(), Ok(None)),
            None => false,
        }
    }

    /// PID of the process recorded for `name`.
    pub async fn pid(&self, name: &str) -> Option<u32> {
        let processes = self.processes.lock().await;
        processes.get(name).and_then(|m| m.child.id())
    }

    #[tracing::instrument(skip(self, plan), fields(command = %plan.display()))]
    async fn start(&self, plan: &LaunchPlan, output: OutputMode) -> Result<ManagedProcess> {
        let mut cmd = Command::new(&plan.program);
        cmd.args(&plan.args)
            .current_dir(&plan.dir)
            .envs(&plan.env)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .process_group(0);

        if output.is_passthrough() {
            cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        } else {
            cmd.stdout(Stdio::null()).stderr(Stdio::null());
        }

        let mut child = cmd.spawn().map_err(|e| {
            Error::Process(format!("failed to spawn '{}': {}", plan.display(), e))
        })?;

        match tokio::time::timeout(self.settings.startup_window, child.wait()).await {
            Ok(Ok(status)) if !status.success() => Err(Error::Process(format!(
                "'{}' exited during startup with {}",
                plan.display(),
                status
            ))),
            Ok(Ok(status)) => {
                tracing::info!("'{}' finished during startup with {}", plan.display(), status);
                Ok(ManagedProcess { child, output })
            }
            Ok(Err(e)) => Err(Error::Process(format!(
                "failed to wait for '{}': {}",
                plan.display(),
                e
            ))),
            Err(_) => {
                tracing::debug!(pid = ?child.id(), "process survived startup window");
                Ok(ManagedProcess { child, output })
            }
        }
    }

    async fn stop(&self, name: &str, mut managed: ManagedProcess) -> Result<()> {
        let raw_pid = match managed.child.id() {
            Some(pid) => pid,
            // Already reaped
            None => return Ok(()),
        };
        if let Ok(Some(status)) = managed.child.try_wait() {
            tracing::debug!("'{}' had already exited with {}", name, status);
            return Ok(());
        }

        let pid = to_pid(raw_pid, name)?;
        let signal_result =
            killpg(pid, Signal::SIGTERM).or_else(|_| signal::kill(pid, Signal::SIGTERM));
        if let Err(e) = signal_result {
            tracing::warn!("Failed to send SIGTERM to '{}' (PID {}): {}", name, raw_pid, e);
        }

        match tokio::time::timeout(self.settings.grace_period, managed.child.wait()).await {
            Ok(Ok(status)) => {
                tracing::debug!("'{}' exited gracefully with {}", name, status);
            }
            Ok(Err(e)) => {
                tracing::warn!("Error waiting for '{}': {}", name, e);
                force_kill(pid, &mut managed.child).await;
            }
            Err(_) => {
                tracing::warn!(
                    "'{}' did not exit after SIGTERM (grace period: {:?}), sending SIGKILL",
                    name,
                    self.settings.grace_period
                );
                force_kill(pid, &mut managed.child).await;
            }
        }
        Ok(())
    }
}

impl Default for LocalRuntime {
    fn default() -> Self {
        Self::new(LocalSettings::default())
    }
}

async fn force_kill(pid: Pid, child: &mut Child) {
    let _ = killpg(pid, Signal::SIGKILL).or_else(|_| signal::kill(pid, Signal::SIGKILL));
    let _ = tokio::time::timeout(Duration::from_secs(2), child.wait()).await;
}

/// Convert a child PID for signal delivery. Rejects 0 (our own process
/// group), 1 (init) and values that do not fit in `pid_t`.
fn to_pid(pid: u32, service_name: &str) -> Result<Pid> {
    if pid <= 1 || pid > i32::MAX as u32 {
        return Err(Error::Process(format!(
            "refusing to signal PID {} for service '{}'",
            pid, service_name
        )));
    }
    Ok(Pid::from_raw(pid as i32))
}

#[async_trait]
impl Runtime for LocalRuntime {
    #[tracing::instrument(skip(self, service, options), fields(service.name = %service.name))]
    async fn create(&self, service: &Service, options: CreateOptions) -> Result<()> {
        let mut processes = self.processes.lock().await;
        if let Some(previous) = processes.remove(&service.name) {
            tracing::debug!("Replacing existing process for '{}'", service.name);
            self.stop(&service.name, previous).await?;
        }

        let plan = LaunchPlan::for_service(service)?;
        let attempts = options.attempts();
        let mut last_error = None;

        for attempt in 1..=attempts {
            tracing::info!(
                "Starting {} (attempt {}/{}): {}",
                service,
                attempt,
                attempts,
                plan.display()
            );
            match self.start(&plan, options.output).await {
                Ok(managed) => {
                    processes.insert(service.name.clone(), managed);
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!("Attempt {}/{} for {} failed: {}", attempt, attempts, service, e);
                    last_error = Some(e);
                    if attempt < attempts {
                        tokio::time::sleep(self.settings.retry_backoff * attempt).await;
                    }
                }
            }
        }

        Err(Error::CreateFailed {
            name: service.name.clone(),
            attempts,
            reason: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no attempt was made".to_string()),
        })
    }

    #[tracing::instrument(skip(self, service), fields(service.name = %service.name))]
    async fn update(&self, service: &Service) -> Result<()> {
        let mut processes = self.processes.lock().await;
        let output = match processes.remove(&service.name) {
            Some(previous) => {
                let output = previous.output;
                self.stop(&service.name, previous).await?;
                output
            }
            None => OutputMode::default(),
        };

        let plan = LaunchPlan::for_service(service)?;
        tracing::info!("Restarting {}: {}", service, plan.display());
        let managed = self.start(&plan, output).await?;
        processes.insert(service.name.clone(), managed);
        Ok(())
    }

    #[tracing::instrument(skip(self, service), fields(service.name = %service.name))]
    async fn delete(&self, service: &Service) -> Result<()> {
        let mut processes = self.processes.lock().await;
        match processes.remove(&service.name) {
            Some(managed) => {
                tracing::info!("Stopping {}", service);
                self.stop(&service.name, managed).await
            }
            None => Ok(()),
        }
    }

    fn kind(&self) -> &str {
        LOCAL_KIND
    }
}
