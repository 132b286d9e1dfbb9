//! Periodic task scheduling.
//!
//! One `Scheduler` drives one task at a fixed period with explicit start/stop
//! lifecycle. A tick awaits the task to completion before sleeping again, so
//! a cycle that overruns its period delays the next tick instead of
//! overlapping it. There is no cancellation of a running cycle; the
//! per-request HTTP timeouts inside a task are the only cancellation
//! mechanism.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// A unit of recurring work.
#[async_trait]
pub trait PeriodicTask: Send + Sync + 'static {
    /// Task name for logging.
    fn name(&self) -> &str;

    /// Run one cycle. Errors are logged and do not stop the schedule.
    async fn run(&self) -> anyhow::Result<()>;
}

/// Drives a `PeriodicTask` at a fixed interval.
pub struct Scheduler {
    interval: Duration,
    running: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Scheduler {
    pub fn new(interval: Duration) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            interval,
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Start ticking. A second start while running is a no-op.
    pub fn start(&self, task: Arc<dyn PeriodicTask>) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!(task = task.name(), "Scheduler already running");
            return;
        }

        let running = Arc::clone(&self.running);
        let interval = self.interval;
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            info!(task = task.name(), interval_secs = interval.as_secs(), "Scheduler started");
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                    _ = tokio::time::sleep(interval) => {
                        if !running.load(Ordering::Relaxed) {
                            break;
                        }
                        if let Err(e) = task.run().await {
                            warn!(task = task.name(), error = %e, "Task cycle failed");
                        }
                    }
                }
            }
            info!(task = task.name(), "Scheduler stopped");
        });
    }

    /// Stop ticking. The in-flight cycle, if any, runs to completion.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        let _ = self.shutdown_tx.send(());
    }
}
