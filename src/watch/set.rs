use super::{changes_from_event, enumerate_dirs, Change, ChangeOp, IgnoreRules};
use crate::error::{Error, Result};
use notify_debouncer_full::notify::{self, Event, RecommendedWatcher, RecursiveMode, Watcher};
use notify_debouncer_full::{Debouncer, FileIdMap};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Events delivered together, or the watcher errors that replaced them.
pub type EventBatch = std::result::Result<Vec<Event>, Vec<notify::Error>>;

/// The OS-level watch primitive the set registers paths with.
pub trait WatchTarget: Send {
    fn add(&mut self, path: &Path) -> Result<()>;
    fn remove(&mut self, path: &Path) -> Result<()>;
}

impl WatchTarget for RecommendedWatcher {
    fn add(&mut self, path: &Path) -> Result<()> {
        self.watch(path, RecursiveMode::NonRecursive)
            .map_err(|e| Error::Watch(format!("failed to watch {}: {}", path.display(), e)))
    }

    fn remove(&mut self, path: &Path) -> Result<()> {
        self.unwatch(path)
            .map_err(|e| Error::Watch(format!("failed to unwatch {}: {}", path.display(), e)))
    }
}

impl WatchTarget for Debouncer<RecommendedWatcher, FileIdMap> {
    fn add(&mut self, path: &Path) -> Result<()> {
        WatchTarget::add(self.watcher(), path)?;
        self.cache().add_root(path, RecursiveMode::NonRecursive);
        Ok(())
    }

    fn remove(&mut self, path: &Path) -> Result<()> {
        self.cache().remove_root(path);
        WatchTarget::remove(self.watcher(), path)
    }
}

/// Directories under observation for one project.
///
/// A file is observed through its parent directory. Observed files removed
/// since they were last created are tombstoned so stale writes for them do
/// not count; removing a directory clears every tombstone beneath it.
pub struct WatchSet<T: WatchTarget> {
    target: T,
    root: PathBuf,
    ignore: IgnoreRules,
    dirs: HashSet<PathBuf>,
    removed: HashSet<PathBuf>,
    fold_creates: bool,
}

impl<T: WatchTarget> WatchSet<T> {
    pub fn new(target: T, root: impl Into<PathBuf>, ignore: IgnoreRules) -> Self {
        Self {
            target,
            root: root.into(),
            ignore,
            dirs: HashSet::new(),
            removed: HashSet::new(),
            fold_creates: false,
        }
    }

    /// Treat the creation of a regular file as a write to it.
    ///
    /// Needed behind the debouncer, which drops writes that follow a create
    /// within the same window.
    pub fn fold_creates(mut self) -> Self {
        self.fold_creates = true;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Register every directory under the root. Fails on the first
    /// enumeration or registration error.
    pub fn seed(&mut self) -> Result<usize> {
        let dirs = enumerate_dirs(&self.root, &self.ignore)?;
        for dir in dirs {
            self.target.add(&dir)?;
            self.dirs.insert(dir);
        }
        Ok(self.dirs.len())
    }

    pub fn len(&self) -> usize {
        self.dirs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.dirs.contains(path)
    }

    /// Whether events for `path` are currently of interest.
    pub fn is_observed(&self, path: &Path) -> bool {
        if self.dirs.contains(path) {
            return true;
        }
        if self.removed.contains(path) {
            return false;
        }
        path.parent().is_some_and(|parent| self.dirs.contains(parent))
    }

    fn is_ignored(&self, path: &Path) -> bool {
        match path.strip_prefix(&self.root) {
            Ok(relative) => self.ignore.matches(relative),
            Err(_) => self.ignore.matches(path),
        }
    }

    /// Apply one change. Returns true when it should trigger a redeploy.
    ///
    /// Each flag is handled on its own: create registers, write qualifies,
    /// remove deregisters, in that order.
    pub fn apply(&mut self, change: &Change) -> bool {
        if self.is_ignored(&change.path) {
            return false;
        }

        if change.op.contains(ChangeOp::CREATE) {
            self.register(&change.path);
        }

        let written = change.op.contains(ChangeOp::WRITE)
            || (self.fold_creates && change.op.contains(ChangeOp::CREATE) && change.path.is_file());
        let qualifies = written && self.is_observed(&change.path);

        if change.op.contains(ChangeOp::REMOVE) {
            self.deregister(&change.path);
        }

        qualifies
    }

    /// Apply every change carried by a batch of events. Watcher errors are
    /// logged and never qualify.
    pub fn handle(&mut self, batch: EventBatch) -> bool {
        let events = match batch {
            Ok(events) => events,
            Err(errors) => {
                for e in errors {
                    tracing::warn!("File watcher error: {}", e);
                }
                return false;
            }
        };

        let mut qualifies = false;
        for event in &events {
            for change in changes_from_event(event) {
                qualifies |= self.apply(&change);
            }
        }
        qualifies
    }

    fn register(&mut self, path: &Path) {
        self.removed.remove(path);
        if !path.is_dir() {
            return;
        }

        // The directory may already have children by the time we see it.
        let dirs = match enumerate_dirs(path, &self.ignore) {
            Ok(dirs) => dirs,
            Err(e) => {
                tracing::warn!("Cannot watch new directory {}: {}", path.display(), e);
                return;
            }
        };
        for dir in dirs {
            if self.dirs.contains(&dir) {
                continue;
            }
            match self.target.add(&dir) {
                Ok(()) => {
                    tracing::debug!("Watching {}", dir.display());
                    self.dirs.insert(dir);
                }
                Err(e) => tracing::warn!("{}", e),
            }
        }
    }

    fn deregister(&mut self, path: &Path) {
        let was_observed = self.is_observed(path);
        let gone: Vec<PathBuf> = self
            .dirs
            .iter()
            .filter(|d| d.starts_with(path))
            .cloned()
            .collect();

        for dir in gone {
            self.dirs.remove(&dir);
            // The kernel drops watches on deleted directories itself, so a
            // failure here is expected.
            if let Err(e) = self.target.remove(&dir) {
                tracing::debug!("{}", e);
            }
        }
        self.removed.retain(|p| !p.starts_with(path));
        if was_observed {
            self.removed.insert(path.to_path_buf());
        }
    }

    #[cfg(test)]
    fn tombstones(&self) -> usize {
        self.removed.len()
    }
}
