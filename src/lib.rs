//! # devloop
//!
//! Keeps one service live while you edit it: the service is created through a
//! pluggable [`Runtime`](runtime::Runtime), its project directory is watched,
//! every qualifying change triggers a redeploy, and an operator interrupt
//! deletes it again.
//!
//! ## Quick Start
//!
//! ```no_run
//! use devloop::lifecycle::{Interrupts, LifecycleController, LifecycleSettings, RunRequest};
//! use devloop::runtime::{LocalRuntime, LocalSettings};
//! use std::sync::Arc;
//!
//! # async fn example() -> devloop::Result<()> {
//! let runtime = Arc::new(LocalRuntime::new(LocalSettings::default()));
//! let controller = LifecycleController::new(runtime, LifecycleSettings::default());
//!
//! let request = RunRequest {
//!     source: "./helloworld".to_string(),
//!     work_dir: std::env::current_dir()?,
//!     ..Default::default()
//! };
//! controller.run(request, Interrupts::from_signals()?).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Concurrency Model
//!
//! The controller runs on the calling task. Two helper tasks run beside it:
//! the watch loop, which calls `update`, and the interrupt coordinator, which
//! calls `delete`. Both share the service descriptor read-only through `Arc`.
//! Updates are issued one at a time from the watch loop.

pub mod config;
pub mod docker;
pub mod error;
pub mod lifecycle;
pub mod runtime;
pub mod source;
pub mod watch;

pub use error::{Error, Result};
pub use lifecycle::{LifecycleController, RunOutcome, RunRequest};
pub use runtime::{CreateOptions, Runtime, Service};
pub use source::Source;
