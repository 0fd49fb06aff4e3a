use crate::error::Result;
use crate::runtime::{Runtime, Service};
use crate::watch::WatchHandle;
use std::sync::Arc;
use tokio::signal::unix::{signal, Signal, SignalKind};
use tokio::sync::{mpsc, oneshot};

/// Operator interrupts, delivered through a single-slot channel.
///
/// Interrupts that arrive while one is already pending are dropped.
pub struct Interrupts {
    rx: mpsc::Receiver<()>,
}

/// Sending half of [`Interrupts`].
#[derive(Clone)]
pub struct InterruptSender {
    tx: mpsc::Sender<()>,
}

impl InterruptSender {
    /// Deliver an interrupt. Returns false if one is already pending or
    /// nobody is listening any more.
    pub fn interrupt(&self) -> bool {
        self.tx.try_send(()).is_ok()
    }
}

impl Interrupts {
    pub fn channel() -> (InterruptSender, Interrupts) {
        let (tx, rx) = mpsc::channel(1);
        (InterruptSender { tx }, Interrupts { rx })
    }

    /// Forward SIGINT and SIGTERM into a new interrupt channel.
    ///
    /// Both handlers are installed before this returns, so a signal sent
    /// right afterwards is already an interrupt. Must be called from within a
    /// tokio runtime.
    pub fn from_signals() -> Result<Interrupts> {
        let mut sigint = Some(signal(SignalKind::interrupt())?);
        let mut sigterm = Some(signal(SignalKind::terminate())?);
        let (sender, interrupts) = Self::channel();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    Some(()) = recv(&mut sigint) => {}
                    Some(()) = recv(&mut sigterm) => {}
                    else => break,
                }
                if sender.tx.is_closed() {
                    break;
                }
                if !sender.interrupt() {
                    tracing::debug!("Interrupt already pending, ignoring");
                }
            }
        });

        Ok(interrupts)
    }

    /// Wait for the next interrupt. `false` means the channel closed.
    async fn next(&mut self) -> bool {
        self.rx.recv().await.is_some()
    }
}

// A stream that ended is parked so the other one keeps being served.
async fn recv(signal: &mut Option<Signal>) -> Option<()> {
    let received = match signal {
        Some(s) => s.recv().await,
        None => std::future::pending().await,
    };
    if received.is_none() {
        *signal = None;
    }
    received
}

/// Turns the first operator interrupt into exactly one `delete`.
///
/// The watch loop, if any, is stopped before the delete starts so no update
/// can race it.
pub(crate) struct InterruptCoordinator {
    runtime: Arc<dyn Runtime>,
    service: Arc<Service>,
    watch: Option<WatchHandle>,
}

impl InterruptCoordinator {
    pub(crate) fn new(runtime: Arc<dyn Runtime>, service: Arc<Service>) -> Self {
        Self {
            runtime,
            service,
            watch: None,
        }
    }

    pub(crate) fn watch(mut self, watch: Option<WatchHandle>) -> Self {
        self.watch = watch;
        self
    }

    /// Spawn the coordinator. The returned receiver fires once the service has
    /// been deleted (successfully or not).
    ///
    /// A closed interrupt channel counts as the final interrupt.
    pub(crate) fn spawn(self, mut interrupts: Interrupts) -> oneshot::Receiver<()> {
        let (done_tx, done_rx) = oneshot::channel();

        tokio::spawn(async move {
            if !interrupts.next().await {
                tracing::debug!("Interrupt source closed, shutting down");
            }
            // Dropping the receiver here discards any further interrupts.
            drop(interrupts);

            if let Some(watch) = self.watch {
                watch.stop().await;
            }

            tracing::info!("Stopping {}", self.service);
            if let Err(e) = self.runtime.delete(&self.service).await {
                tracing::error!("Failed to delete {}: {}", self.service, e);
            }
            let _ = done_tx.send(());
        });

        done_rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::CreateOptions;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct CountingRuntime {
        deletes: AtomicUsize,
    }

    #[async_trait]
    impl Runtime for CountingRuntime {
        async fn create(&self, _: &Service, _: CreateOptions) -> crate::Result<()> {
            Ok(())
        }

        async fn update(&self, _: &Service) -> crate::Result<()> {
            Ok(())
        }

        async fn delete(&self, _: &Service) -> crate::Result<()> {
            tokio::time::sleep(Duration::from_millis(50)).await;
            self.deletes.fetch_add(1, Ordering::SeqCst);
            Err(crate::Error::Runtime("already gone".to_string()))
        }

        fn kind(&self) -> &str {
            "local"
        }
    }

    #[test]
    fn single_slot_drops_extra_interrupts() {
        let (sender, _interrupts) = Interrupts::channel();
        assert!(sender.interrupt());
        assert!(!sender.interrupt());
    }

    #[tokio::test]
    async fn first_interrupt_deletes_once_and_signals_done() {
        let runtime = Arc::new(CountingRuntime::default());
        let service = Arc::new(Service::new("svc", "/tmp/svc", "latest"));
        let (sender, interrupts) = Interrupts::channel();

        let done = InterruptCoordinator::new(runtime.clone(), service).spawn(interrupts);
        sender.interrupt();
        tokio::time::sleep(Duration::from_millis(10)).await;
        sender.interrupt();

        done.await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(runtime.deletes.load(Ordering::SeqCst), 1);
        assert!(!sender.interrupt());
    }

    #[tokio::test]
    async fn signal_right_after_setup_is_an_interrupt() {
        let mut interrupts = Interrupts::from_signals().unwrap();

        nix::sys::signal::raise(nix::sys::signal::Signal::SIGINT).unwrap();

        let received = tokio::time::timeout(Duration::from_secs(5), interrupts.next()).await;
        assert_eq!(received.ok(), Some(true));
    }

    #[tokio::test]
    async fn closed_interrupt_source_still_deletes() {
        let runtime = Arc::new(CountingRuntime::default());
        let service = Arc::new(Service::new("svc", "/tmp/svc", "latest"));
        let (sender, interrupts) = Interrupts::channel();

        let done = InterruptCoordinator::new(runtime.clone(), service).spawn(interrupts);
        drop(sender);

        done.await.unwrap();
        assert_eq!(runtime.deletes.load(Ordering::SeqCst), 1);
    }
}
