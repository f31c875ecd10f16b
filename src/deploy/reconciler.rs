// ABOUTME: Background poller that closes deployment records once their build has finished.
// ABOUTME: Sweeps never overlap; a sweep that finds another in progress is skipped.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};

use super::{DeployError, LockManager};
use crate::cluster::ClusterOps;
use crate::model::{BuildState, DeploymentRecord, DeploymentStatus};
use crate::probe::Prober;
use crate::store::EntityStore;

/// Default pause between sweeps.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Outcome of one sweep over the open records.
#[derive(Debug, Default)]
pub struct SweepReport {
    /// Open records looked at.
    pub examined: usize,
    /// Records skipped because their build was never submitted.
    pub untriggered: usize,
    /// Records closed by this sweep.
    pub finalized: Vec<DeploymentRecord>,
    /// Records whose application could not be probed or updated.
    pub errors: usize,
}

pub struct Reconciler {
    store: Arc<dyn EntityStore>,
    locks: LockManager,
    prober: Prober,
    interval: Duration,
    running: Mutex<()>,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn EntityStore>,
        cluster: Arc<dyn ClusterOps>,
        interval: Duration,
    ) -> Self {
        Self {
            locks: LockManager::new(store.clone()),
            prober: Prober::new(cluster),
            store,
            interval,
            running: Mutex::new(()),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run one sweep. Returns `None` if another sweep was already in progress.
    pub async fn sweep(&self) -> Option<SweepReport> {
        let Ok(_guard) = self.running.try_lock() else {
            debug!("previous sweep still running, skipping");
            return None;
        };

        let mut report = SweepReport::default();
        let open = match self.store.open_records().await {
            Ok(open) => open,
            Err(e) => {
                warn!(error = %e, "failed to list open deployments");
                report.errors += 1;
                return Some(report);
            }
        };

        for record in open {
            report.examined += 1;
            if !record.build_triggered {
                report.untriggered += 1;
                continue;
            }
            match self.reconcile(&record).await {
                Ok(Some(closed)) => report.finalized.push(closed),
                Ok(None) => {}
                Err(e) => {
                    warn!(app = %record.application, record = %record.id, error = %e, "failed to reconcile deployment");
                    report.errors += 1;
                }
            }
        }

        if !report.finalized.is_empty() {
            info!(finalized = report.finalized.len(), "reconciled deployments");
        }
        Some(report)
    }

    async fn reconcile(
        &self,
        record: &DeploymentRecord,
    ) -> Result<Option<DeploymentRecord>, DeployError> {
        let state = self.prober.build_state(&record.application).await?;
        let status = match state {
            BuildState::Completed => DeploymentStatus::Completed,
            BuildState::Failed => DeploymentStatus::Failed,
            BuildState::Running | BuildState::NotRunning => return Ok(None),
        };
        self.locks.finalize(&record.id, status).await
    }

    /// Sweep on every tick until `shutdown` flips to true.
    #[instrument(skip(self, shutdown), fields(interval = ?self.interval))]
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!("starting deployment reconciler");

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("deployment reconciler shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// Run the loop on a background task.
    pub fn spawn(self: Arc<Self>, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(shutdown).await })
    }
}
