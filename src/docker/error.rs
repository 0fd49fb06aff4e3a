use std::process::Output;
use std::time::Duration;
use thiserror::Error;

/// Failure of one `docker` CLI invocation.
#[derive(Error, Debug)]
pub enum DockerError {
    #[error("'{command}' did not finish within {}s", .limit.as_secs())]
    Timeout { command: String, limit: Duration },

    #[error("'{command}' exited with {}: {stderr}", exit_label(.code))]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    /// The docker binary could not be started at all.
    #[error("cannot run '{command}': {source}")]
    ExecFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("container {0} does not exist")]
    ContainerNotFound(String),
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "a signal".to_string(),
    }
}

impl DockerError {
    pub(crate) fn timeout(command: String, limit: Duration) -> Self {
        DockerError::Timeout { command, limit }
    }

    pub(crate) fn failed(command: String, output: &Output) -> Self {
        DockerError::CommandFailed {
            command,
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
    }

    pub(crate) fn exec_failed(command: String, source: std::io::Error) -> Self {
        DockerError::ExecFailed { command, source }
    }

    /// Retrying cannot help when the binary itself is missing.
    pub fn is_exec_failure(&self) -> bool {
        matches!(self, DockerError::ExecFailed { .. })
    }
}
