use super::{Source, DEFAULT_REF};
use crate::error::{Error, Result};

/// Number of leading path segments that make up a repository
/// (`host/vendor/name`).
const REPO_SEGMENTS: usize = 3;

/// Parse a remote reference: `repo[/folder...][@ref]`.
///
/// `vendor/name` and `host/vendor/name` both name a repository; anything past
/// the third segment is a folder inside it.
pub fn parse_remote(reference: &str) -> Result<Source> {
    let (path, version) = match reference.split_once('@') {
        Some((path, version)) => {
            if version.is_empty() {
                return Err(Error::resolution(reference, "empty ref after '@'"));
            }
            if version.contains('@') {
                return Err(Error::resolution(reference, "more than one '@'"));
            }
            (path, version)
        }
        None => (reference, DEFAULT_REF),
    };

    let path = path.trim_end_matches('/');
    let parts: Vec<&str> = path.split('/').collect();
    if parts.iter().any(|p| p.is_empty()) {
        return Err(Error::resolution(reference, "empty path segment"));
    }
    if parts.iter().any(|p| *p == "." || *p == "..") {
        return Err(Error::resolution(
            reference,
            "looks like a relative path but no such directory exists",
        ));
    }

    let split = parts.len().min(REPO_SEGMENTS);
    let repo = parts[..split].join("/");
    let folder = if parts.len() > REPO_SEGMENTS {
        Some(parts[REPO_SEGMENTS..].join("/"))
    } else {
        None
    };

    Ok(Source::remote(repo, folder, version.to_string()))
}
