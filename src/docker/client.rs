//! Centralized Docker CLI client.
//!
//! All Docker CLI interactions go through `DockerClient`, which provides
//! consistent timeout handling, error mapping to [`DockerError`], and a single
//! point where `Command::new("docker")` is constructed.

use super::DockerError;
use std::process::Output;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct DockerClient {
    binary: String,
}

impl Default for DockerClient {
    fn default() -> Self {
        Self::new()
    }
}

impl DockerClient {
    pub fn new() -> Self {
        Self::with_binary("docker")
    }

    /// Use a different CLI binary with a docker-compatible interface (e.g. `podman`).
    pub fn with_binary(binary: impl Into<String>) -> Self {
        DockerClient {
            binary: binary.into(),
        }
    }

    fn command_string(&self, args: &[&str]) -> String {
        format!("{} {}", self.binary, args.join(" "))
    }

    /// Run a docker command with a timeout, returning raw Output.
    async fn run(&self, args: &[&str], timeout: Duration) -> Result<Output, DockerError> {
        let result = tokio::time::timeout(
            timeout,
            tokio::process::Command::new(&self.binary)
                .args(args)
                .output(),
        )
        .await;

        let cmd_str = self.command_string(args);

        match result {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(DockerError::exec_failed(cmd_str, e)),
            Err(_) => Err(DockerError::timeout(cmd_str, timeout)),
        }
    }

    /// Run a docker command with a timeout, returning Output only if exit 0.
    async fn run_success(&self, args: &[&str], timeout: Duration) -> Result<Output, DockerError> {
        let output = self.run(args, timeout).await?;
        if output.status.success() {
            Ok(output)
        } else {
            Err(DockerError::failed(self.command_string(args), &output))
        }
    }

    /// Run a container in detached mode. Returns the container ID on success.
    ///
    /// `args` is everything after `docker run -d`.
    pub async fn run_detached(
        &self,
        args: &[String],
        timeout: Duration,
    ) -> Result<String, DockerError> {
        let mut full: Vec<&str> = vec!["run", "-d"];
        full.extend(args.iter().map(String::as_str));
        let output = self.run_success(&full, timeout).await?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Restart a container.
    pub async fn restart(&self, container: &str, timeout: Duration) -> Result<(), DockerError> {
        let output = self.run(&["restart", container], timeout).await?;
        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("No such container") {
            return Err(DockerError::ContainerNotFound(container.to_string()));
        }
        Err(DockerError::failed(self.command_string(&["restart", container]), &output))
    }

    /// Force-remove a container. Returns `Ok(())` if container doesn't exist.
    pub async fn rm_force(&self, container: &str, timeout: Duration) -> Result<(), DockerError> {
        let output = self.run(&["rm", "-f", container], timeout).await?;
        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("No such container") {
            return Ok(());
        }
        Err(DockerError::failed(self.command_string(&["rm", "-f", container]), &output))
    }

    /// Check if a container is running.
    pub async fn is_running(&self, container: &str, timeout: Duration) -> bool {
        let output = self
            .run(&["inspect", "-f", "{{.State.Running}}", container], timeout)
            .await;
        match output {
            Ok(o) if o.status.success() => String::from_utf8_lossy(&o.stdout).trim() == "true",
            _ => false,
        }
    }
}
