//! Docker runtime.
//!
//! Runs the service in a detached container named `devloop-<name>`. When the
//! source is a local directory it is mounted at `/app` and used as the working
//! directory; otherwise the source reference is exported as `SERVICE_SOURCE`.
//! Containers are not owned by the devloop process and keep running after it
//! exits.

use super::{CreateOptions, Runtime, Service};
use crate::docker::{container_name, DockerClient};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

/// Directory inside the container where a local source is mounted.
const MOUNT_POINT: &str = "/app";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockerSettings {
    /// Image the service runs in.
    pub image: String,
    /// Timeout applied to each docker CLI call.
    pub timeout: Duration,
    /// How long a fresh container must stay up to count as started.
    pub startup_window: Duration,
}

impl Default for DockerSettings {
    fn default() -> Self {
        Self {
            image: "alpine:3".to_string(),
            timeout: Duration::from_secs(120),
            startup_window: Duration::from_secs(1),
        }
    }
}

pub struct DockerRuntime {
    client: DockerClient,
    settings: DockerSettings,
}

impl DockerRuntime {
    pub fn new(settings: DockerSettings) -> Self {
        Self::with_client(DockerClient::new(), settings)
    }

    pub fn with_client(client: DockerClient, settings: DockerSettings) -> Self {
        Self { client, settings }
    }

    /// Arguments following `docker run -d`.
    pub fn run_args(&self, service: &Service) -> Vec<String> {
        let mut args = vec![
            "--name".to_string(),
            container_name(&service.name),
            "--label".to_string(),
            format!("devloop.service={}", service.name),
            "--label".to_string(),
            format!("devloop.version={}", service.version),
            "-e".to_string(),
            format!("SERVICE_NAME={}", service.name),
            "-e".to_string(),
            format!("SERVICE_VERSION={}", service.version),
        ];

        if !service.process_type.is_empty() {
            args.push("--label".to_string());
            args.push(format!("devloop.type={}", service.process_type));
        }
        for (key, value) in &service.metadata {
            args.push("--label".to_string());
            args.push(format!("devloop.meta.{}={}", key, value));
        }

        if Path::new(&service.source).is_dir() {
            args.push("-v".to_string());
            args.push(format!("{}:{}", service.source, MOUNT_POINT));
            args.push("-w".to_string());
            args.push(MOUNT_POINT.to_string());
        } else {
            args.push("-e".to_string());
            args.push(format!("SERVICE_SOURCE={}", service.source));
        }

        args.push(self.settings.image.clone());

        if let Some(command) = service.command.as_deref() {
            let script = match service.args.as_deref() {
                Some(extra) => format!("{} {}", command, extra),
                None => command.to_string(),
            };
            args.push("sh".to_string());
            args.push("-c".to_string());
            args.push(script);
        } else if let Some(extra) = service.args.as_deref() {
            args.extend(extra.split_whitespace().map(str::to_string));
        }

        args
    }

    async fn start_once(&self, service: &Service) -> Result<()> {
        let name = container_name(&service.name);
        // Leftovers from an earlier run would make `docker run --name` fail.
        self.client.rm_force(&name, self.settings.timeout).await?;

        let id = self
            .client
            .run_detached(&self.run_args(service), self.settings.timeout)
            .await?;
        tracing::debug!(container = %name, %id, "container started");

        tokio::time::sleep(self.settings.startup_window).await;
        if !self.client.is_running(&name, self.settings.timeout).await {
            return Err(Error::Runtime(format!(
                "container {} exited during startup (see `docker logs {}`)",
                name, name
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Runtime for DockerRuntime {
    #[tracing::instrument(skip(self, service, options), fields(service.name = %service.name))]
    async fn create(&self, service: &Service, options: CreateOptions) -> Result<()> {
        let attempts = options.attempts();
        let mut last_error = None;

        for attempt in 1..=attempts {
            tracing::info!("Starting container for {} (attempt {}/{})", service, attempt, attempts);
            match self.start_once(service).await {
                Ok(()) => return Ok(()),
                Err(Error::Docker(e)) if e.is_exec_failure() => return Err(Error::Docker(e)),
                Err(e) => {
                    tracing::warn!("Attempt {}/{} for {} failed: {}", attempt, attempts, service, e);
                    last_error = Some(e);
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

    async fn update(&self, service: &Service) -> Result<()> {
        let name = container_name(&service.name);
        tracing::info!("Restarting container {}", name);
        self.client.restart(&name, self.settings.timeout).await?;
        Ok(())
    }

    async fn delete(&self, service: &Service) -> Result<()> {
        let name = container_name(&service.name);
        tracing::info!("Removing container {}", name);
        self.client.rm_force(&name, self.settings.timeout).await?;
        Ok(())
    }

    fn kind(&self) -> &str {
        "docker"
    }
}
