//! How the local runtime turns a [`Service`] into a command line.

use super::Service;
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Toolchain used to build and run a source directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Launcher {
    /// `cargo run --quiet -- <args>`
    Cargo,
    /// `go run . <args>`
    Go,
    /// `npm start -- <args>`
    Node,
    /// `/bin/sh -c "<command> <args>"`
    Shell,
}

impl Launcher {
    /// Parse a `--type` value. An empty type means "detect".
    pub fn from_type(process_type: &str) -> Result<Option<Self>> {
        match process_type.trim().to_ascii_lowercase().as_str() {
            "" => Ok(None),
            "cargo" | "rust" => Ok(Some(Launcher::Cargo)),
            "go" => Ok(Some(Launcher::Go)),
            "node" | "npm" => Ok(Some(Launcher::Node)),
            "shell" | "sh" => Ok(Some(Launcher::Shell)),
            other => Err(Error::Runtime(format!(
                "unknown process type '{}' for the local runtime (expected cargo, go, node or shell)",
                other
            ))),
        }
    }

    /// Pick a launcher from the manifest files present in `dir`.
    pub fn detect(dir: &Path) -> Option<Self> {
        if dir.join("Cargo.toml").is_file() {
            Some(Launcher::Cargo)
        } else if dir.join("go.mod").is_file() {
            Some(Launcher::Go)
        } else if dir.join("package.json").is_file() {
            Some(Launcher::Node)
        } else {
            None
        }
    }

    fn program(&self) -> &'static str {
        match self {
            Launcher::Cargo => "cargo",
            Launcher::Go => "go",
            Launcher::Node => "npm",
            Launcher::Shell => "/bin/sh",
        }
    }
}

impl fmt::Display for Launcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Launcher::Cargo => write!(f, "cargo"),
            Launcher::Go => write!(f, "go"),
            Launcher::Node => write!(f, "node"),
            Launcher::Shell => write!(f, "shell"),
        }
    }
}

/// Fully resolved command for one start of a service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    pub launcher: Launcher,
    pub program: String,
    pub args: Vec<String>,
    pub dir: PathBuf,
    pub env: HashMap<String, String>,
}

impl LaunchPlan {
    pub fn for_service(service: &Service) -> Result<Self> {
        let dir = PathBuf::from(&service.source);
        if !dir.is_dir() {
            return Err(Error::Runtime(format!(
                "the local runtime needs a local source directory, got '{}'",
                service.source
            )));
        }

        let extra: Vec<String> = service
            .args
            .as_deref()
            .map(|a| a.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();

        let (launcher, args) = if let Some(command) = service.command.as_deref() {
            let script = if extra.is_empty() {
                command.to_string()
            } else {
                format!("{} {}", command, extra.join(" "))
            };
            (Launcher::Shell, vec!["-c".to_string(), script])
        } else {
            let launcher = match Launcher::from_type(&service.process_type)? {
                Some(launcher) => launcher,
                None => Launcher::detect(&dir).ok_or_else(|| {
                    Error::Runtime(format!(
                        "cannot tell how to run {} (no Cargo.toml, go.mod or package.json); pass --command",
                        dir.display()
                    ))
                })?,
            };
            let mut args: Vec<String> = match launcher {
                Launcher::Cargo => vec!["run".into(), "--quiet".into()],
                Launcher::Go => vec!["run".into(), ".".into()],
                Launcher::Node => vec!["start".into()],
                Launcher::Shell => {
                    return Err(Error::Runtime(
                        "process type 'shell' requires --command".to_string(),
                    ))
                }
            };
            if !extra.is_empty() {
                if launcher != Launcher::Go {
                    args.push("--".into());
                }
                args.extend(extra);
            }
            (launcher, args)
        };

        let program = launcher.program().to_string();
        if launcher != Launcher::Shell && which::which(&program).is_err() {
            return Err(Error::Process(format!(
                "'{}' not found on PATH (needed to run {} sources)",
                program, launcher
            )));
        }

        let mut env = load_dotenv(&dir)?;
        env.insert("SERVICE_NAME".to_string(), service.name.clone());
        env.insert("SERVICE_VERSION".to_string(), service.version.clone());

        Ok(LaunchPlan {
            launcher,
            program,
            args,
            dir,
            env,
        })
    }

    /// Command line for log messages.
    pub fn display(&self) -> String {
        format!("{} {}", self.program, self.args.join(" "))
    }
}

/// Variables from `<dir>/.env`, if the file exists.
fn load_dotenv(dir: &Path) -> Result<HashMap<String, String>> {
    let path = dir.join(".env");
    let mut env_vars = HashMap::new();
    if !path.is_file() {
        return Ok(env_vars);
    }

    let iter = dotenvy::from_path_iter(&path).map_err(|e| {
        Error::Config(format!("Failed to read environment file {}: {}", path.display(), e))
    })?;
    for item in iter {
        let (key, value) = item.map_err(|e| {
            Error::Config(format!("Failed to parse environment file {}: {}", path.display(), e))
        })?;
        env_vars.insert(key, value);
    }
    tracing::debug!("Loaded {} variable(s) from {}", env_vars.len(), path.display());
    Ok(env_vars)
}
