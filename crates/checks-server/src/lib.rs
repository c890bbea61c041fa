//! Check server
//!
//! Periodically probes a set of HTTP/HTTPS endpoints and records the outcome
//! of every probe back into the check table.
//!
//! # Components
//!
//! - **Scheduler**: persists the table and dispatches one probe per check on
//!   every tick
//! - **ProbeExecutor**: runs one probe and commits exactly one outcome
//! - **Journal**: appends committed outcomes to per-check log files
//! - **API**: JSON CRUD over the table plus `/metrics`
//! - **Shell**: read-only inspection commands on stdin

pub mod api;
pub mod config;
pub mod executor;
pub mod journal;
pub mod metrics;
pub mod scheduler;
pub mod server;
pub mod shell;
pub mod types;
pub mod validation;

pub use api::{ApiServer, ApiState, router};
pub use config::{Config, ConfigError};
pub use executor::ProbeExecutor;
pub use journal::{FileJournal, Journal};
pub use metrics::MetricsRegistry;
pub use scheduler::Scheduler;
pub use server::CheckServer;
pub use shell::{Shell, ShellCommand};
pub use types::{SchedulerState, ServerConfig};
