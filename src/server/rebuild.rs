//! Debounced stat tree rebuilds.
//!
//! Watchers and configuration handlers send [`RebuildSignal`]s; a single
//! worker task owns the rebuild. File changes arriving within the debounce
//! window collapse into one rebuild.

use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildSignal {
    /// A file or directory under an alias was created or deleted.
    FilesChanged,
    /// Configuration changed; rebuild without waiting.
    Immediate,
    Shutdown,
}

#[derive(Clone)]
pub struct RebuildScheduler {
    sender: mpsc::UnboundedSender<RebuildSignal>,
}

impl RebuildScheduler {
    /// Spawn the worker. `rebuild` runs once per collapsed batch of signals.
    pub fn spawn<F, Fut>(debounce: Duration, rebuild: F) -> (Self, JoinHandle<()>)
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (sender, receiver) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_worker(receiver, debounce, rebuild));
        (Self { sender }, handle)
    }

    pub fn notify_change(&self) {
        self.send(RebuildSignal::FilesChanged);
    }

    pub fn rebuild_now(&self) {
        self.send(RebuildSignal::Immediate);
    }

    pub fn shutdown(&self) {
        self.send(RebuildSignal::Shutdown);
    }

    fn send(&self, signal: RebuildSignal) {
        if self.sender.send(signal).is_err() {
            debug!("Rebuild worker gone, dropping {:?}", signal);
        }
    }
}

async fn run_worker<F, Fut>(
    mut receiver: mpsc::UnboundedReceiver<RebuildSignal>,
    debounce: Duration,
    rebuild: F,
) where
    F: Fn() -> Fut,
    Fut: Future<Output = ()>,
{
    while let Some(signal) = receiver.recv().await {
        match signal {
            RebuildSignal::Shutdown => break,
            RebuildSignal::Immediate => rebuild().await,
            RebuildSignal::FilesChanged => {
                let window = tokio::time::sleep(debounce);
                tokio::pin!(window);
                let mut collapsed = 0usize;
                loop {
                    tokio::select! {
                        _ = &mut window => break,
                        next = receiver.recv() => match next {
                            Some(RebuildSignal::FilesChanged) => collapsed += 1,
                            // An immediate request ends the wait early.
                            Some(RebuildSignal::Immediate) => break,
                            Some(RebuildSignal::Shutdown) | None => return,
                        },
                    }
                }
                debug!("Rebuilding after {} collapsed change signals", collapsed + 1);
                rebuild().await;
            }
        }
    }
    debug!("Rebuild worker stopped");
}
