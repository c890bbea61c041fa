//! Probe executor: runs one probe and commits exactly one outcome.

use crate::journal::Journal;
use crate::metrics::{MetricsRegistry, ProbeOutcome};
use checks::{
    Check, CheckId, CheckStore, ProbeEvent, ProbeRequest, ProbeRun, Transport, now_millis,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// Runs probes against the shared store
pub struct ProbeExecutor {
    store: Arc<CheckStore>,
    transport: Arc<dyn Transport>,
    journal: Option<Arc<dyn Journal>>,
    timeout: Duration,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl ProbeExecutor {
    /// Create a new probe executor
    pub fn new(
        store: Arc<CheckStore>,
        transport: Arc<dyn Transport>,
        journal: Option<Arc<dyn Journal>>,
        timeout: Duration,
        metrics: Option<Arc<MetricsRegistry>>,
    ) -> Self {
        Self {
            store,
            transport,
            journal,
            timeout,
            metrics,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Probe `check` once and commit the outcome.
    ///
    /// `check` is the copy taken at the start of the tick. Returns the
    /// committed record, or `None` when nothing was committed (unusable URL,
    /// or the check was deleted while the probe was in flight).
    pub async fn run(&self, id: CheckId, check: Check) -> Option<Check> {
        let request = match ProbeRequest::from_check(&check) {
            Ok(request) => request,
            Err(e) => {
                error!(id = %id, url = %check.url, error = %e, "Skipping probe, was the snapshot edited by hand?");
                return None;
            }
        };

        let started = Instant::now();
        let run = ProbeRun::start(check, self.timeout, now_millis());
        debug!(id = %id, url = %request.url, method = %request.method, "Dispatching probe");

        // Dropping the in-flight request on timeout aborts its connection.
        let settled = tokio::select! {
            result = self.transport.send(request) => match result {
                Ok(response) => {
                    let status_code = response.status_code;
                    let settled = run.settle(ProbeEvent::Response { status_code, at: now_millis() });
                    if tokio::time::timeout(self.timeout, response.drain()).await.is_err() {
                        debug!(id = %id, "Response body not drained in time, dropping connection");
                    }
                    settled
                }
                Err(error) => {
                    warn!(id = %id, err_code = error.err_code(), error = %error, "Probe failed");
                    run.settle(ProbeEvent::Error { error, at: now_millis() })
                }
            },
            _ = tokio::time::sleep(self.timeout) => {
                warn!(id = %id, timeout_ms = self.timeout.as_millis() as u64, "Probe timed out");
                run.settle(ProbeEvent::Timeout)
            }
        };

        let outcome = settled?;
        self.commit(&id, outcome, started.elapsed()).await
    }

    /// Write the outcome back to the store, then journal it.
    async fn commit(&self, id: &CheckId, outcome: Check, elapsed: Duration) -> Option<Check> {
        if let Err(e) = self.store.update(id, outcome.clone()) {
            debug!(id = %id, error = %e, "Discarding probe outcome");
            if let Some(ref m) = self.metrics {
                m.record_discarded_outcome();
            }
            return None;
        }

        debug!(
            id = %id,
            status = ?outcome.status_code,
            err_code = ?outcome.err_code,
            "Probe outcome committed"
        );

        if let Some(ref m) = self.metrics {
            m.record_probe(classify(&outcome), elapsed);
        }

        if let Some(ref journal) = self.journal {
            if let Err(e) = journal.append(id, &outcome).await {
                warn!(id = %id, error = %e, "Failed to append outcome to journal");
                if let Some(ref m) = self.metrics {
                    m.record_journal_failure();
                }
            }
        }

        Some(outcome)
    }
}

fn classify(outcome: &Check) -> ProbeOutcome {
    match outcome.err_code.as_deref() {
        None => ProbeOutcome::Success,
        Some(common::TIMEOUT_CODE) => ProbeOutcome::Timeout,
        Some(_) => ProbeOutcome::Error,
    }
}
