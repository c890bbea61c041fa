//! Types shared by the check server components.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Where the check table is persisted
    pub snapshot_path: PathBuf,

    /// Maximum number of checks
    pub max_checks: usize,

    /// Interval between scheduler ticks
    pub tick_interval: Duration,

    /// Time a probe may take before it is recorded as timed out
    pub probe_timeout: Duration,

    /// Journal directory, `None` when the journal is disabled
    pub journal_dir: Option<PathBuf>,

    /// Interval between journal rotations
    pub journal_rotate_interval: Duration,

    /// API listen address
    pub listen_addr: String,

    /// Resolve target hosts while validating checks
    pub resolve_hosts: bool,

    /// Read inspection commands from stdin
    pub shell_enabled: bool,

    /// Serve `/metrics`
    pub metrics_enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            snapshot_path: PathBuf::from(".data/checks.json"),
            max_checks: checks::MAX_CHECKS,
            tick_interval: Duration::from_millis(5000),
            probe_timeout: checks::DEFAULT_PROBE_TIMEOUT,
            journal_dir: Some(PathBuf::from(".logs")),
            journal_rotate_interval: Duration::from_secs(24 * 60 * 60),
            listen_addr: "127.0.0.1:8000".to_string(),
            resolve_hosts: true,
            shell_enabled: true,
            metrics_enabled: true,
        }
    }
}

/// Scheduler lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerState {
    /// Waiting for the next tick
    Idle,
    /// Persisting the table and dispatching probes
    Ticking,
    /// Halted after a failed snapshot; needs an external restart
    Stopped,
}

/// Check submitted through the API, before validation
#[derive(Debug, Clone, Deserialize)]
pub struct CheckInput {
    pub url: Option<String>,
    pub method: Option<String>,
    #[serde(default)]
    pub payload: Option<checks::Payload>,
}

/// Body of a successful mutation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationResponse {
    pub id: String,
    pub message: String,
}

/// Body of a failed request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
