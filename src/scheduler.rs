//! Periodic driver for the service checker

use crate::checker::ServiceChecker;
use crate::errors::{CheckerError, Result};

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

/// Runs `ServiceChecker::run_all` on a fixed interval until stopped.
///
/// Runs never overlap: a run that outlasts the interval makes the driver
/// skip the ticks it missed.
pub struct PeriodicChecker {
    checker: Arc<ServiceChecker>,
    interval: Duration,
    completed_runs: Arc<AtomicU64>,
    shutdown: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<()>>,
}

impl PeriodicChecker {
    pub fn new(checker: Arc<ServiceChecker>, interval: Duration) -> Self {
        Self {
            checker,
            interval,
            completed_runs: Arc::new(AtomicU64::new(0)),
            shutdown: None,
            task: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Number of runs finished since construction
    pub fn completed_runs(&self) -> u64 {
        self.completed_runs.load(Ordering::Relaxed)
    }

    /// Spawn the check loop on the current tokio runtime.
    ///
    /// The first run starts immediately.
    pub fn start(&mut self) -> Result<()> {
        if self.is_running() {
            return Err(CheckerError::Scheduler("periodic checks already running".to_string()));
        }

        if self.interval.is_zero() {
            return Err(CheckerError::Scheduler("check interval must be greater than 0".to_string()));
        }

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let checker = Arc::clone(&self.checker);
        let completed_runs = Arc::clone(&self.completed_runs);
        let period = self.interval;

        let task = tokio::spawn(async move {
            info!("Starting periodic checks every {}ms", period.as_millis());

            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = shutdown_rx.changed() => break,
                }

                tokio::select! {
                    batch = checker.run_all() => {
                        completed_runs.fetch_add(1, Ordering::Relaxed);
                        info!(
                            "Periodic check completed - {}/{} services up",
                            batch.up_count(),
                            checker.services().len()
                        );
                    }
                    _ = shutdown_rx.changed() => {
                        debug!("Shutdown requested during a check, abandoning it");
                        break;
                    }
                }
            }

            info!("Periodic checks stopped");
        });

        self.shutdown = Some(shutdown_tx);
        self.task = Some(task);
        Ok(())
    }

    /// Signal the loop to stop and wait for it to exit.
    ///
    /// Stopping a driver that is not running is a no-op.
    pub async fn stop(&mut self) -> Result<()> {
        if let Some(shutdown) = self.shutdown.take() {
            // The loop may already have exited; nothing to signal then.
            let _ = shutdown.send(true);
        }

        match self.task.take() {
            Some(task) => task.await.map_err(|e| {
                warn!("Periodic check task ended abnormally: {}", e);
                CheckerError::Scheduler(e.to_string())
            }),
            None => Ok(()),
        }
    }
}

impl Drop for PeriodicChecker {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
