// Allow unused_assignments at module level because thiserror's generated code
// for struct variants triggers false positive warnings - the fields ARE used
// in the Display impl but rustc's lint pass doesn't see this.
#![allow(unused_assignments)]

use crate::docker::DockerError;
use miette::Diagnostic;
use std::io;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    #[error("Cannot resolve source '{reference}': {reason}")]
    #[diagnostic(
        code(devloop::source::unresolved),
        help("Pass a local directory (e.g. ./svc) or a remote reference such as github.com/vendor/name[@ref]")
    )]
    Resolution { reference: String, reason: String },

    #[error("Service '{name}' failed to start after {attempts} attempt(s): {reason}")]
    #[diagnostic(
        code(devloop::runtime::create_failed),
        help("Fix the error above and run again, or raise the attempt budget with --retries")
    )]
    CreateFailed {
        name: String,
        attempts: u32,
        reason: String,
    },

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("Process error: {0}")]
    #[diagnostic(
        code(devloop::process::error),
        help("Check that the command exists and is executable")
    )]
    Process(String),

    #[error("Docker error: {0}")]
    #[diagnostic(
        code(devloop::docker::error),
        help("Check that Docker is running with `docker ps`")
    )]
    Docker(#[from] DockerError),

    #[error("Watch error: {0}")]
    #[diagnostic(code(devloop::watch::error))]
    Watch(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn resolution(reference: &str, reason: impl Into<String>) -> Self {
        Error::Resolution {
            reference: reference.to_string(),
            reason: reason.into(),
        }
    }

    /// Returns a helpful suggestion for resolving this error, if available.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Error::Resolution { .. } => Some(
                "Run from the project directory and pass its path, e.g. `devloop run .`"
                    .to_string(),
            ),
            Error::CreateFailed { attempts, .. } => Some(format!(
                "The service did not stay up in {} attempt(s). Inspect its output above, or retry with --retries <n>.",
                attempts
            )),
            Error::Process(msg) if msg.contains("not found on PATH") => Some(
                "Install the missing tool or pass an explicit entry point with --command".to_string(),
            ),
            Error::Process(_) => Some("Check that the command exists and is executable".to_string()),
            Error::Docker(_) => Some("Check that Docker is running: docker ps".to_string()),
            Error::Config(_) | Error::Yaml(_) => {
                Some("Check the syntax of devloop.yaml in your project".to_string())
            }
            _ => None,
        }
    }

    /// Formats the error with its suggestion (if any) for user-friendly display.
    pub fn with_suggestion(&self) -> String {
        match self.suggestion() {
            Some(suggestion) => format!("{}\n\nHint: {}", self, suggestion),
            None => self.to_string(),
        }
    }
}
