//! Periodic reconciliation, started once per process.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::reconcile::Reconciler;

pub const DEFAULT_MONITOR_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_TRUST_INTERVAL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleConfig {
    /// Pending transaction sweep period.
    pub monitor_interval: Duration,
    /// Trust update sweep period.
    pub trust_interval: Duration,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            monitor_interval: DEFAULT_MONITOR_INTERVAL,
            trust_interval: DEFAULT_TRUST_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Sweep {
    PendingTransactions,
    TrustUpdates,
}

/// Owns the two background sweep loops.
#[derive(Debug)]
pub struct Scheduler {
    reconciler: Reconciler,
    config: ScheduleConfig,
    started: AtomicBool,
    stop: watch::Sender<bool>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new(reconciler: Reconciler, config: ScheduleConfig) -> Self {
        let (stop, _) = watch::channel(false);
        Self {
            reconciler,
            config,
            started: AtomicBool::new(false),
            stop,
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Spawn the sweep loops. Returns `false` without spawning anything if
    /// they were already started.
    pub fn start(&self) -> bool {
        if self.started.swap(true, Ordering::SeqCst) {
            tracing::debug!("scheduler already started");
            return false;
        }
        let mut handles = self.handles.lock();
        for (sweep, period) in [
            (Sweep::PendingTransactions, self.config.monitor_interval),
            (Sweep::TrustUpdates, self.config.trust_interval),
        ] {
            handles.push(tokio::spawn(run_sweep(
                sweep,
                period,
                self.reconciler.clone(),
                self.stop.subscribe(),
            )));
        }
        tracing::info!(
            monitor_interval = ?self.config.monitor_interval,
            trust_interval = ?self.config.trust_interval,
            "scheduler started"
        );
        true
    }

    pub fn is_running(&self) -> bool {
        self.started.load(Ordering::SeqCst) && !*self.stop.borrow()
    }

    /// Stop both loops and wait for them. A sweep in progress finishes first.
    pub async fn shutdown(&self) {
        let _ = self.stop.send(true);
        let handles: Vec<_> = std::mem::take(&mut *self.handles.lock());
        for handle in handles {
            let _ = handle.await;
        }
        tracing::info!("scheduler stopped");
    }
}

async fn run_sweep(sweep: Sweep, period: Duration, reconciler: Reconciler, mut stop: watch::Receiver<bool>) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = interval.tick() => {
                match sweep {
                    Sweep::PendingTransactions => {
                        reconciler.sweep_pending_transactions().await;
                    }
                    Sweep::TrustUpdates => {
                        reconciler.sweep_trust_updates().await;
                    }
                }
            }
            _ = stop.changed() => break,
        }
    }
}
