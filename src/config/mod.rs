//! Optional per-project settings in `devloop.yaml`.
//!
//! ```yaml
//! runtime: local
//! type: cargo
//! args: --port 8080
//! retries: 5
//! debounce: 300ms
//! ignore:
//!   - fixtures
//!   - "*.tmp"
//! startup_window: 2s
//! grace_period: 10s
//! docker:
//!   image: rust:1-slim
//! ```
//!
//! Command-line flags and environment variables take precedence over the
//! file; the file takes precedence over built-in defaults.

mod duration;

pub use duration::parse_duration;

use crate::error::{Error, Result};
use crate::runtime::RuntimeKind;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File names searched for, in order, in each directory.
pub const CONFIG_FILE_NAMES: &[&str] = &["devloop.yaml", "devloop.yml"];

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
    pub runtime: Option<RuntimeKind>,
    pub command: Option<String>,
    pub args: Option<String>,
    #[serde(rename = "type")]
    pub process_type: Option<String>,
    pub retries: Option<u32>,
    #[serde(deserialize_with = "duration::deserialize_opt")]
    pub debounce: Option<Duration>,
    /// Extra ignore patterns on top of the built-in list.
    pub ignore: Vec<String>,
    #[serde(deserialize_with = "duration::deserialize_opt")]
    pub startup_window: Option<Duration>,
    #[serde(deserialize_with = "duration::deserialize_opt")]
    pub grace_period: Option<Duration>,
    pub docker: DockerConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DockerConfig {
    pub image: Option<String>,
}

impl ProjectConfig {
    /// Load the explicitly given file, or the nearest `devloop.yaml` at or
    /// above `work_dir`. No file found is not an error.
    pub fn discover(work_dir: &Path, explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        let path = match explicit {
            Some(path) => {
                let path = if path.is_absolute() {
                    path.to_path_buf()
                } else {
                    work_dir.join(path)
                };
                if !path.is_file() {
                    return Err(Error::Config(format!(
                        "Config file '{}' does not exist",
                        path.display()
                    )));
                }
                Some(path)
            }
            None => find_config_in_dir(work_dir),
        };

        match path {
            Some(path) => {
                let config = load_config(&path)?;
                tracing::debug!("Loaded config from {}", path.display());
                Ok((config, Some(path)))
            }
            None => Ok((Self::default(), None)),
        }
    }
}

/// Search `dir` and its ancestors for a config file.
pub fn find_config_in_dir(dir: &Path) -> Option<PathBuf> {
    dir.ancestors()
        .flat_map(|d| CONFIG_FILE_NAMES.iter().map(move |name| d.join(name)))
        .find(|candidate| candidate.is_file())
}

pub fn load_config(path: &Path) -> Result<ProjectConfig> {
    let content = fs::read_to_string(path).map_err(|e| {
        Error::Config(format!(
            "Failed to read config file '{}': {}",
            path.display(),
            e
        ))
    })?;

    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<ProjectConfig> {
    if content.trim().is_empty() {
        return Ok(ProjectConfig::default());
    }
    Ok(serde_yaml::from_str(content)?)
}
