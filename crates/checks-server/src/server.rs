//! Check server: wires the store, scheduler, journal, API and shell together.

use crate::api::{ApiServer, ApiState};
use crate::executor::ProbeExecutor;
use crate::journal::{FileJournal, Journal};
use crate::metrics::MetricsRegistry;
use crate::scheduler::Scheduler;
use crate::shell::Shell;
use crate::types::ServerConfig;
use checks::{CheckStore, HttpTransport};
use common::{Error, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{error, info, warn};

/// Check server
pub struct CheckServer {
    config: ServerConfig,
}

impl CheckServer {
    /// Create a new check server
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Load the table and prove the snapshot destination is writable.
    ///
    /// Any failure here is fatal: the service must not run with a table it
    /// cannot persist.
    pub async fn setup(&self) -> Result<Arc<CheckStore>> {
        let store = Arc::new(CheckStore::with_capacity(self.config.max_checks));

        let report = store.load(&self.config.snapshot_path).await?;
        info!(
            path = %self.config.snapshot_path.display(),
            loaded = report.loaded,
            skipped = report.skipped,
            "Check table loaded"
        );

        store.snapshot(&self.config.snapshot_path).await?;
        Ok(store)
    }

    /// Run the server until SIGINT or SIGTERM, then write a final snapshot.
    pub async fn run(self) -> Result<()> {
        info!("Starting check server");

        let store = self.setup().await?;

        let metrics = if self.config.metrics_enabled {
            info!("Metrics enabled on {}/metrics", self.config.listen_addr);
            Some(Arc::new(MetricsRegistry::new()))
        } else {
            info!("Metrics disabled");
            None
        };

        let journal = match self.config.journal_dir {
            Some(ref dir) => {
                let journal = Arc::new(FileJournal::new(dir));
                journal.setup_dir().await?;
                Some(journal)
            }
            None => {
                info!("Journal disabled");
                None
            }
        };

        let transport = HttpTransport::new()
            .map_err(|e| Error::other(format!("Failed to build HTTP client: {}", e)))?;

        let executor = Arc::new(ProbeExecutor::new(
            store.clone(),
            Arc::new(transport),
            journal.clone().map(|j| j as Arc<dyn Journal>),
            self.config.probe_timeout,
            metrics.clone(),
        ));

        let scheduler = Arc::new(Scheduler::new(
            store.clone(),
            executor,
            self.config.snapshot_path.clone(),
            self.config.tick_interval,
            metrics.clone(),
        ));
        let _scheduler_handle = scheduler.start();

        let _rotation_handle = journal
            .map(|journal| spawn_rotation(journal, self.config.journal_rotate_interval));

        let api = ApiServer::new(
            ApiState {
                store: store.clone(),
                metrics,
                resolve_hosts: self.config.resolve_hosts,
            },
            self.config.listen_addr.clone(),
        );
        let api_handle = tokio::spawn(async move {
            if let Err(e) = api.run().await {
                error!(error = %e, "API server error");
            }
        });

        if self.config.shell_enabled {
            let shell = Shell::new(store.clone());
            tokio::spawn(async move {
                if let Err(e) = shell.run_stdio().await {
                    warn!(error = %e, "Shell error");
                }
            });
        }

        info!("All tasks spawned, server running");

        tokio::select! {
            _ = shutdown_signal() => {
                info!("Shutdown signal received");
            }
            _ = api_handle => {
                warn!("API server completed");
            }
        }

        let result = store.snapshot(&self.config.snapshot_path).await;
        match result {
            Ok(()) => info!(checks = store.len(), "Final snapshot written"),
            Err(ref e) => error!(error = %e, "Final snapshot failed"),
        }

        info!("Check server stopped");
        result
    }
}

fn spawn_rotation(journal: Arc<FileJournal>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // Skip the immediate first tick.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match journal.rotate().await {
                Ok(rotated) => info!(rotated, "Journal rotated"),
                Err(e) => warn!(error = %e, dir = %journal.dir().display(), "Journal rotation failed"),
            }
        }
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
