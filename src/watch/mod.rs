//! Live reload for a single project directory.
//!
//! Every directory under the project root is watched non-recursively. With a
//! non-zero window raw events go through `notify-debouncer-full` first, so a
//! burst of saves reaches the loop as one batch. Each event is split into
//! independent [`ChangeOp`] flags: creates extend the watch set, removes
//! shrink it, and writes to observed paths trigger the change callback.
//!
//! ```ignore
//! let handle = WatchAggregator::new(&root)
//!     .ignore(IgnoreRules::default())
//!     .window(Duration::from_millis(200))
//!     .start(Box::new(move || Box::pin(async move { redeploy().await })))?;
//! // ...
//! handle.stop().await;
//! ```

mod enumerate;
mod ignore;
mod ops;
mod set;

pub use enumerate::enumerate_dirs;
pub use ignore::{IgnoreRules, DEFAULT_IGNORE};
pub use ops::{changes_from_event, Change, ChangeOp};
pub use set::{EventBatch, WatchSet, WatchTarget};

use crate::error::{Error, Result};
use futures::future::BoxFuture;
use notify_debouncer_full::notify::{self, Event};
use notify_debouncer_full::{new_debouncer, DebounceEventResult};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Default coalescing window for bursts of writes (editors often save twice).
pub const DEFAULT_WINDOW: Duration = Duration::from_millis(200);

/// Callback invoked once per qualifying change (or burst of changes).
pub type OnChange = Box<dyn FnMut() -> BoxFuture<'static, ()> + Send>;

pub struct WatchAggregator {
    root: PathBuf,
    ignore: IgnoreRules,
    window: Duration,
}

impl WatchAggregator {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            ignore: IgnoreRules::default(),
            window: DEFAULT_WINDOW,
        }
    }

    pub fn ignore(mut self, ignore: IgnoreRules) -> Self {
        self.ignore = ignore;
        self
    }

    /// Zero disables coalescing: every qualifying write gets its own callback.
    pub fn window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Seed the watch set and spawn the event loop.
    ///
    /// Must be called from within a tokio runtime. Fails if the root cannot be
    /// enumerated or any directory cannot be registered.
    pub fn start(self, on_change: OnChange) -> Result<WatchHandle> {
        let root = self.root.canonicalize().map_err(|e| {
            Error::Watch(format!("cannot watch {}: {}", self.root.display(), e))
        })?;

        let (tx, rx) = mpsc::unbounded_channel::<EventBatch>();

        if self.window.is_zero() {
            let watcher = notify::recommended_watcher(move |event: notify::Result<Event>| {
                // Receiver gone means the loop stopped; nothing left to do.
                let _ = tx.send(event.map(|e| vec![e]).map_err(|e| vec![e]));
            })
            .map_err(|e| Error::Watch(format!("failed to create file watcher: {}", e)))?;

            let set = WatchSet::new(watcher, &root, self.ignore);
            launch(set, rx, on_change, false)
        } else {
            let debouncer = new_debouncer(self.window, None, move |result: DebounceEventResult| {
                let batch = result.map(|events| events.into_iter().map(|e| e.event).collect());
                let _ = tx.send(batch);
            })
            .map_err(|e| Error::Watch(format!("failed to create file watcher: {}", e)))?;

            // A debounced create swallows the writes that follow it.
            let set = WatchSet::new(debouncer, &root, self.ignore).fold_creates();
            launch(set, rx, on_change, true)
        }
    }
}

fn launch<T: WatchTarget + 'static>(
    mut set: WatchSet<T>,
    rx: mpsc::UnboundedReceiver<EventBatch>,
    on_change: OnChange,
    coalesce: bool,
) -> Result<WatchHandle> {
    let watched = set.seed()?;
    tracing::info!("Watching {} directories under {}", watched, set.root().display());

    let cancel = CancellationToken::new();
    let task = tokio::spawn(run_loop(set, rx, on_change, coalesce, cancel.clone()));

    Ok(WatchHandle {
        watched,
        cancel,
        task,
    })
}

/// Running watch loop. Dropping the handle without calling [`stop`] leaves
/// the loop running until its event stream closes.
///
/// [`stop`]: WatchHandle::stop
pub struct WatchHandle {
    watched: usize,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl WatchHandle {
    /// Number of directories registered at start-up.
    pub fn watched_dirs(&self) -> usize {
        self.watched
    }

    /// Stop the loop and wait for it to finish. An update already in
    /// progress runs to completion first; no new one starts afterwards.
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            tracing::warn!("Watch task ended abnormally: {}", e);
        }
    }
}

async fn run_loop<T: WatchTarget>(
    mut set: WatchSet<T>,
    mut batches: mpsc::UnboundedReceiver<EventBatch>,
    mut on_change: OnChange,
    coalesce: bool,
    cancel: CancellationToken,
) {
    let mut pending = false;

    loop {
        if !pending {
            let batch = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                batch = batches.recv() => match batch {
                    Some(batch) => batch,
                    None => break,
                },
            };
            if !set.handle(batch) {
                continue;
            }
        }

        // Batches already queued belong to the same burst.
        if coalesce {
            while let Ok(batch) = batches.try_recv() {
                set.handle(batch);
            }
        }

        if cancel.is_cancelled() {
            break;
        }

        tracing::debug!("Change detected, redeploying");
        on_change().await;
        pending = false;

        // Anything that arrived during the update collapses into one more.
        if coalesce {
            while let Ok(batch) = batches.try_recv() {
                pending |= set.handle(batch);
            }
        }
    }

    tracing::debug!("Watch loop stopped ({} directories watched)", set.len());
}
