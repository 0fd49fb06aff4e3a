use super::IgnoreRules;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Every directory under `root` (including `root`) that is not ignored.
///
/// Symlinks are not followed. Any walk error aborts the enumeration.
pub fn enumerate_dirs(root: &Path, ignore: &IgnoreRules) -> Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || !ignore.matches(entry.path().strip_prefix(root).unwrap_or(entry.path()))
        });

    for entry in walker {
        let entry = entry.map_err(|e| {
            Error::Watch(format!("failed to enumerate {}: {}", root.display(), e))
        })?;
        if entry.file_type().is_dir() {
            dirs.push(entry.into_path());
        }
    }

    Ok(dirs)
}
