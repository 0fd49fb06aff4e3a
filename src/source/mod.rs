//! Source resolution.
//!
//! Turns the positional argument of `devloop run` into a canonical service
//! identity: a name, a build source, a version and whether the source lives
//! on this machine.
//!
//! ```text
//! ./svc                      -> local,  name "svc",  source "/abs/path/svc"
//! github.com/acme/svc        -> remote, name "svc",  source "github.com/acme/svc"
//! github.com/acme/mono/api@v2 -> remote, name "api", source "github.com/acme/mono/api"
//! ```

mod local;
mod remote;

pub use local::{is_local, repo_version};
pub use remote::parse_remote;

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Version used when nothing more specific is known.
pub const DEFAULT_REF: &str = "latest";

/// A resolved service source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    /// Version: a git ref, tag or `latest`.
    pub reference: String,
    /// Whether this is a directory on the current machine.
    pub local: bool,
    kind: SourceKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SourceKind {
    Local {
        path: PathBuf,
    },
    Remote {
        repo: String,
        folder: Option<String>,
    },
}

impl Source {
    pub(crate) fn local(path: PathBuf, reference: String) -> Self {
        Source {
            reference,
            local: true,
            kind: SourceKind::Local { path },
        }
    }

    pub(crate) fn remote(repo: String, folder: Option<String>, reference: String) -> Self {
        Source {
            reference,
            local: false,
            kind: SourceKind::Remote { repo, folder },
        }
    }

    /// Name the runtime knows the service by.
    pub fn runtime_name(&self) -> String {
        match &self.kind {
            SourceKind::Local { path } => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.to_string_lossy().into_owned()),
            SourceKind::Remote { repo, folder } => {
                let tail = folder.as_deref().unwrap_or(repo);
                tail.rsplit('/').next().unwrap_or(tail).to_string()
            }
        }
    }

    /// Source handed to the runtime: an absolute directory for local sources,
    /// `repo[/folder]` for remote ones.
    pub fn runtime_source(&self) -> String {
        match &self.kind {
            SourceKind::Local { path } => path.to_string_lossy().into_owned(),
            SourceKind::Remote { repo, folder: None } => repo.clone(),
            SourceKind::Remote {
                repo,
                folder: Some(folder),
            } => format!("{}/{}", repo, folder),
        }
    }
}

/// Resolve a CLI source reference relative to `work_dir`.
pub fn resolve(work_dir: &Path, reference: &str) -> Result<Source> {
    let reference = reference.trim();
    if reference.is_empty() {
        return Err(Error::resolution(reference, "source reference is empty"));
    }

    if let Some(path) = is_local(work_dir, reference) {
        let path = path.canonicalize().map_err(|e| {
            Error::resolution(reference, format!("cannot canonicalize {}: {}", path.display(), e))
        })?;
        if !path.is_dir() {
            return Err(Error::resolution(
                reference,
                format!("{} is not a directory", path.display()),
            ));
        }
        let version = repo_version(&path);
        tracing::debug!(path = %path.display(), %version, "resolved local source");
        return Ok(Source::local(path, version));
    }

    parse_remote(reference)
}

/// Make a runtime source safe for the target operating system.
///
/// On Windows the drive-letter colon is dropped (`C:\svc` -> `C\svc`) so the
/// source can be used as a path segment by runtimes that mount it.
pub fn escape_for_os(source: &str, target_os: Option<&str>) -> String {
    match target_os {
        Some(os) if os.eq_ignore_ascii_case("windows") => source.replacen(':', "", 1),
        _ => source.to_string(),
    }
}
