//! Fixed-interval tick loop.
//!
//! Every tick persists the table first and only then dispatches one probe
//! per check. Probes are not awaited, so probes from one tick may still be
//! in flight when the next tick starts; for the same check the last commit
//! wins.

use crate::executor::ProbeExecutor;
use crate::metrics::MetricsRegistry;
use crate::types::SchedulerState;
use checks::CheckStore;
use common::Result;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info};

/// Drives probes for every check on a fixed interval
pub struct Scheduler {
    store: Arc<CheckStore>,
    executor: Arc<ProbeExecutor>,
    snapshot_path: PathBuf,
    interval: Duration,
    state_tx: watch::Sender<SchedulerState>,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl Scheduler {
    /// Create a new scheduler in the `Idle` state
    pub fn new(
        store: Arc<CheckStore>,
        executor: Arc<ProbeExecutor>,
        snapshot_path: impl Into<PathBuf>,
        interval: Duration,
        metrics: Option<Arc<MetricsRegistry>>,
    ) -> Self {
        let (state_tx, _) = watch::channel(SchedulerState::Idle);
        Self {
            store,
            executor,
            snapshot_path: snapshot_path.into(),
            interval,
            state_tx,
            metrics,
        }
    }

    /// Current state
    pub fn state(&self) -> SchedulerState {
        *self.state_tx.borrow()
    }

    /// Watch state transitions
    pub fn subscribe(&self) -> watch::Receiver<SchedulerState> {
        self.state_tx.subscribe()
    }

    /// Begin ticking in the background; the first tick runs immediately.
    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }

    /// Tick until a snapshot fails.
    pub async fn run(&self) {
        info!(interval_ms = self.interval.as_millis() as u64, "Scheduler started");

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            // The first tick of a tokio interval completes immediately.
            ticker.tick().await;
            if let Err(e) = self.tick().await {
                error!(error = %e, "Scheduler stopped, restart required");
                break;
            }
        }
    }

    /// Run one tick: persist, copy, dispatch.
    ///
    /// Returns the number of probes dispatched. On a failed snapshot nothing
    /// is dispatched and the scheduler enters `Stopped` for good.
    pub async fn tick(&self) -> Result<usize> {
        if self.state() == SchedulerState::Stopped {
            return Ok(0);
        }
        self.state_tx.send_replace(SchedulerState::Ticking);

        if let Err(e) = self.store.snapshot(&self.snapshot_path).await {
            if let Some(ref m) = self.metrics {
                m.record_snapshot_failure();
            }
            self.state_tx.send_replace(SchedulerState::Stopped);
            return Err(e);
        }

        let checks = self.store.list();
        let dispatched = checks.len();
        if let Some(ref m) = self.metrics {
            m.record_tick(dispatched);
        }

        for (id, check) in checks {
            let executor = self.executor.clone();
            tokio::spawn(async move {
                executor.run(id, check).await;
            });
        }

        debug!(dispatched, "Tick dispatched probes");
        self.state_tx.send_replace(SchedulerState::Idle);
        Ok(dispatched)
    }
}
